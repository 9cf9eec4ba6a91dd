pub mod config;

mod adapters;
mod app;
mod crypto;
mod ports;
mod push;
mod schedule;
mod state;
mod store;
mod types;

use std::net::SocketAddr;

pub use app::app;
pub use push::vapid::{VapidCredentials, generate_vapid_credentials};

pub async fn serve(addr: SocketAddr, config: config::AppConfig) {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app(config)).await.expect("server error");
}
