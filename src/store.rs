use crate::types::push::UserSubscriptionRecord;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub(crate) type SharedStore = Arc<Mutex<ReminderStore>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub subscriptions: HashMap<String, UserSubscriptionRecord>,
    #[serde(default)]
    pub schedules: HashMap<String, Vec<JsonValue>>,
}

#[derive(Debug)]
pub struct ReminderStore {
    path: Option<PathBuf>,
    data: StoreData,
}

impl ReminderStore {
    pub(crate) fn in_memory() -> Self {
        Self {
            path: None,
            data: StoreData::default(),
        }
    }

    pub(crate) fn open(path: Option<PathBuf>) -> std::io::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::in_memory());
        };
        let data = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(std::io::Error::other)?,
            Err(err) if err.kind() == ErrorKind::NotFound => StoreData::default(),
            Err(err) => return Err(err),
        };
        Ok(Self {
            path: Some(path),
            data,
        })
    }

    pub(crate) fn save(&self) -> std::io::Result<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        let contents = serde_json::to_string_pretty(&self.data).map_err(std::io::Error::other)?;
        atomic_write(path, &contents)
    }

    pub(crate) fn upsert_subscription(&mut self, record: UserSubscriptionRecord) {
        self.data
            .subscriptions
            .insert(record.user_id.clone(), record);
    }

    pub(crate) fn remove_user(&mut self, user_id: &str) {
        self.data.subscriptions.remove(user_id);
        self.data.schedules.remove(user_id);
    }

    pub(crate) fn set_schedules(&mut self, user_id: &str, schedules: Vec<JsonValue>) {
        self.data.schedules.insert(user_id.to_string(), schedules);
    }

    pub(crate) fn replace_reminder(
        &mut self,
        user_id: &str,
        reminder_id: &str,
        updated: JsonValue,
    ) {
        let Some(schedules) = self.data.schedules.get_mut(user_id) else {
            return;
        };
        let matching = schedules
            .iter_mut()
            .find(|entry| entry.get("id").and_then(JsonValue::as_str) == Some(reminder_id));
        if let Some(entry) = matching {
            *entry = updated;
        }
    }

    pub(crate) fn snapshot(&self) -> StoreData {
        self.data.clone()
    }
}

fn atomic_write(path: &Path, contents: &str) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::other("missing parent directory"))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("store.json");
    let pid = std::process::id();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    for attempt in 0..10u32 {
        let temp_name = format!(".{}.tmp-{}-{}-{}", file_name, pid, nanos, attempt);
        let temp_path = parent.join(temp_name);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
        {
            Ok(mut file) => {
                file.write_all(contents.as_bytes())?;
                file.flush()?;
                std::fs::rename(&temp_path, path)?;
                return Ok(());
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to create temp file",
    ))
}
