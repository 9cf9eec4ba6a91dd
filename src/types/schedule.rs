use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Multiple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderWindow {
    Morning,
    Midday,
    Afternoon,
    Evening,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderDefinition {
    pub id: String,
    pub frequency: Frequency,
    #[serde(default)]
    pub times: Vec<String>,
    #[serde(default)]
    pub day_of_week: Option<u8>,
    #[serde(default)]
    pub times_per_day: Option<u32>,
    #[serde(default)]
    pub reminder_windows: Vec<ReminderWindow>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_sent: Option<OffsetDateTime>,
}
