pub mod push;
pub mod schedule;
