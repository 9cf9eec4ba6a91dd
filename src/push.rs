use crate::adapters::{TokioTimeProvider, WebPushSender};
use crate::config;
use crate::store::SharedStore;

pub(crate) mod encrypt;
mod sweep;
pub(crate) mod vapid;

use sweep::ReminderSweep;
use tokio::task::JoinHandle;

pub(crate) use vapid::{VapidConfigStatus, load_vapid_config};

/// Starts the background delivery sweep when a full VAPID configuration is
/// present. Without one the server still runs; it just never pushes.
pub fn maybe_start_sweep(config: &config::AppConfig, store: SharedStore) -> Option<JoinHandle<()>> {
    let vapid = match load_vapid_config(config) {
        VapidConfigStatus::Ready(vapid) => vapid,
        VapidConfigStatus::Incomplete => {
            eprintln!("push notifications disabled: incomplete VAPID configuration");
            return None;
        }
        VapidConfigStatus::Missing => {
            return None;
        }
    };

    let sender = match WebPushSender::new(vapid) {
        Ok(sender) => sender,
        Err(err) => {
            eprintln!("push notifications disabled: unusable VAPID keys ({err})");
            return None;
        }
    };

    Some(ReminderSweep::new(TokioTimeProvider, sender).spawn(store))
}
