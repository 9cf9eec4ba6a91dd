use crate::ports;
use crate::schedule;
use crate::store::SharedStore;
use crate::types::schedule::ReminderDefinition;

use std::time::Duration;
use serde_json::Value as JsonValue;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::task::JoinHandle;

const SWEEP_INTERVAL_MINUTES: u8 = 15;

/// Periodically walks every stored schedule and pushes the reminders that
/// have come due. One dispatch per user per pass, carrying all of their
/// due reminder ids at once.
#[derive(Debug, Clone)]
pub(crate) struct ReminderSweep<T, S> {
    time: T,
    sender: S,
}

impl<T, S> ReminderSweep<T, S>
where
    T: ports::TimeProvider,
    S: ports::PushSender,
{
    pub(crate) fn new(time: T, sender: S) -> Self {
        Self { time, sender }
    }

    pub(crate) fn spawn(self, store: SharedStore) -> JoinHandle<()> {
        tokio::spawn(run_sweep_loop(self.time, self.sender, store))
    }
}

pub(crate) async fn run_sweep_loop<T, S>(time: T, sender: S, store: SharedStore)
where
    T: ports::TimeProvider,
    S: ports::PushSender,
{
    loop {
        let delay = delay_until_next_quarter_hour(time.now());
        time.sleep(delay).await;

        let now = time.now();
        // Timers can fire a hair early; only a true boundary starts a pass.
        if now.minute() % SWEEP_INTERVAL_MINUTES != 0 {
            continue;
        }
        sweep_once(&sender, &store, now).await;
    }
}

/// Time left until the next quarter-hour boundary, strictly positive: at an
/// exact boundary the full interval is scheduled.
pub(crate) fn delay_until_next_quarter_hour(now: OffsetDateTime) -> Duration {
    let into_interval =
        u64::from(now.minute() % SWEEP_INTERVAL_MINUTES) * 60 + u64::from(now.second());
    let whole_seconds = u64::from(SWEEP_INTERVAL_MINUTES) * 60 - into_interval;
    Duration::from_secs(whole_seconds) - Duration::from_nanos(u64::from(now.nanosecond()))
}

/// A single pass over the store. The store lock is taken twice, once to
/// snapshot and once to record deliveries; it is never held across a send.
pub(crate) async fn sweep_once<S: ports::PushSender>(
    sender: &S,
    store: &SharedStore,
    now: OffsetDateTime,
) {
    let snapshot = {
        let guard = store.lock().expect("store lock");
        guard.snapshot()
    };

    for (user_id, reminders) in &snapshot.schedules {
        let Some(record) = snapshot.subscriptions.get(user_id) else {
            eprintln!(
                "push delivery warning: no subscription for '{}', skipping schedule",
                user_id
            );
            continue;
        };

        let mut due: Vec<(String, JsonValue)> = Vec::new();
        for raw in reminders {
            let reminder: ReminderDefinition = match serde_json::from_value(raw.clone()) {
                Ok(reminder) => reminder,
                Err(err) => {
                    eprintln!(
                        "push delivery warning: unreadable reminder for '{}': {}",
                        user_id, err
                    );
                    continue;
                }
            };
            if schedule::is_due(&reminder, &record.timezone, now) {
                due.push((reminder.id, raw.clone()));
            }
        }

        if due.is_empty() {
            continue;
        }

        let ids: Vec<&str> = due.iter().map(|(id, _)| id.as_str()).collect();
        let payload = due_payload(&ids, now);

        if let Err(err) = sender.send(&record.subscription, &payload).await {
            eprintln!("push delivery error: {} (user {})", err, user_id);
            continue;
        }

        mark_delivered(store, user_id, due, now);
    }
}

fn due_payload(ids: &[&str], now: OffsetDateTime) -> String {
    serde_json::json!({ "due": ids, "ts": now.unix_timestamp() }).to_string()
}

/// Stamps `lastSent` on the delivered entries without disturbing any other
/// fields clients may keep on them.
fn mark_delivered(
    store: &SharedStore,
    user_id: &str,
    due: Vec<(String, JsonValue)>,
    now: OffsetDateTime,
) {
    let stamp = match now.format(&Rfc3339) {
        Ok(stamp) => stamp,
        Err(err) => {
            eprintln!(
                "push delivery warning: could not format delivery time: {}",
                err
            );
            return;
        }
    };

    let mut guard = store.lock().expect("store lock");
    for (id, mut raw) in due {
        if let Some(object) = raw.as_object_mut() {
            object.insert("lastSent".to_string(), JsonValue::String(stamp.clone()));
        }
        guard.replace_reminder(user_id, &id, raw);
    }
    if let Err(err) = guard.save() {
        eprintln!(
            "store error: could not persist delivery times for '{}': {}",
            user_id, err
        );
    }
}
