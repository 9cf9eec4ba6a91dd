use crate::adapters::WebPushSender;
use crate::ports::PushSender;
use crate::push as push_service;
use crate::schedule;
use crate::state;
use crate::store::StoreData;
use crate::types::push::{PushSubscription, SubscriptionKeys, UserSubscriptionRecord};
use crate::types::schedule::{Frequency, ReminderDefinition};

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as JsonValue;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub(crate) async fn subscribe(
    State(state): State<state::AppState>,
    Json(body): Json<JsonValue>,
) -> Result<&'static str, (StatusCode, &'static str)> {
    let user_id = match body.get("userId").and_then(JsonValue::as_str) {
        Some(user_id) if !user_id.trim().is_empty() => user_id.to_string(),
        _ => return Err((StatusCode::BAD_REQUEST, "userId is required.")),
    };
    let subscription: PushSubscription = match body.get("subscription") {
        Some(raw) => match serde_json::from_value(raw.clone()) {
            Ok(subscription) => subscription,
            Err(_) => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    "subscription must carry an endpoint and keys.",
                ));
            }
        },
        None => return Err((StatusCode::BAD_REQUEST, "subscription is required.")),
    };
    let timezone = body
        .get("timezone")
        .and_then(JsonValue::as_str)
        .unwrap_or("UTC")
        .to_string();

    let saved = {
        let mut store = state.store.lock().expect("store lock");
        store.upsert_subscription(UserSubscriptionRecord {
            user_id,
            subscription,
            timezone,
        });
        store.save()
    };
    if let Err(err) = saved {
        eprintln!("store error: could not save subscription: {err}");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not persist the subscription.",
        ));
    }

    Ok("Subscription saved")
}

pub(crate) async fn unsubscribe(
    State(state): State<state::AppState>,
    Json(body): Json<JsonValue>,
) -> Result<&'static str, (StatusCode, &'static str)> {
    let user_id = match body.get("userId").and_then(JsonValue::as_str) {
        Some(user_id) if !user_id.trim().is_empty() => user_id,
        _ => return Err((StatusCode::BAD_REQUEST, "userId is required.")),
    };

    let saved = {
        let mut store = state.store.lock().expect("store lock");
        store.remove_user(user_id);
        store.save()
    };
    if let Err(err) = saved {
        eprintln!("store error: could not remove subscription: {err}");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not persist the removal.",
        ));
    }

    Ok("Unsubscribed")
}

pub(crate) async fn update_schedule(
    State(state): State<state::AppState>,
    Json(body): Json<JsonValue>,
) -> Result<&'static str, (StatusCode, &'static str)> {
    let user_id = match body.get("userId").and_then(JsonValue::as_str) {
        Some(user_id) if !user_id.trim().is_empty() => user_id,
        _ => return Err((StatusCode::BAD_REQUEST, "userId is required.")),
    };
    let entries = match body.get("schedules").and_then(JsonValue::as_array) {
        Some(entries) => entries.clone(),
        None => return Err((StatusCode::BAD_REQUEST, "schedules must be an array.")),
    };

    let mut schedules = Vec::with_capacity(entries.len());
    for mut raw in entries {
        let reminder: ReminderDefinition = match serde_json::from_value(raw.clone()) {
            Ok(reminder) => reminder,
            Err(_) => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    "schedules contains a malformed reminder.",
                ));
            }
        };
        // Clients normally compute `times` when the reminder is edited; fill
        // them in only when an eligible entry arrives without any.
        if reminder.times.is_empty()
            && matches!(reminder.frequency, Frequency::Daily | Frequency::Multiple)
        {
            let times = schedule::generate_times(
                reminder.frequency,
                &reminder.reminder_windows,
                reminder.times_per_day.unwrap_or(1),
            );
            if let Some(object) = raw.as_object_mut() {
                object.insert("times".to_string(), serde_json::json!(times));
            }
        }
        schedules.push(raw);
    }

    let saved = {
        let mut store = state.store.lock().expect("store lock");
        store.set_schedules(user_id, schedules);
        store.save()
    };
    if let Err(err) = saved {
        eprintln!("store error: could not save schedules: {err}");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not persist the schedule.",
        ));
    }

    Ok("Schedule updated")
}

#[derive(Serialize)]
pub(crate) struct DebugSnapshot {
    #[serde(flatten)]
    pub(crate) store: StoreData,
    #[serde(rename = "serverTime")]
    pub(crate) server_time: String,
}

pub(crate) async fn store_debug(State(state): State<state::AppState>) -> Json<DebugSnapshot> {
    let store = state.store.lock().expect("store lock").snapshot();
    let server_time = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(DebugSnapshot { store, server_time })
}

#[derive(Serialize)]
pub(crate) struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub(crate) public_key: String,
}

pub(crate) async fn vapid_public_key(
    State(state): State<state::AppState>,
) -> Result<Json<PublicKeyResponse>, (StatusCode, &'static str)> {
    let vapid = match push_service::load_vapid_config(&state.config) {
        push_service::VapidConfigStatus::Ready(vapid) => vapid,
        push_service::VapidConfigStatus::Incomplete | push_service::VapidConfigStatus::Missing => {
            return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                "Push notifications are not configured.",
            ));
        }
    };

    Ok(Json(PublicKeyResponse {
        public_key: vapid.public_key,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct TestPushRequest {
    pub(crate) endpoint: String,
    pub(crate) p256dh: String,
    pub(crate) auth: String,
    pub(crate) message: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct TestPushResponse {
    pub(crate) status: &'static str,
}

pub(crate) async fn test_push(
    State(state): State<state::AppState>,
    Json(request): Json<TestPushRequest>,
) -> Result<Json<TestPushResponse>, (StatusCode, &'static str)> {
    let vapid = match push_service::load_vapid_config(&state.config) {
        push_service::VapidConfigStatus::Ready(vapid) => vapid,
        push_service::VapidConfigStatus::Incomplete | push_service::VapidConfigStatus::Missing => {
            return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                "Push notifications are not configured.",
            ));
        }
    };

    if request.endpoint.trim().is_empty()
        || request.p256dh.trim().is_empty()
        || request.auth.trim().is_empty()
    {
        return Err((
            StatusCode::BAD_REQUEST,
            "endpoint, p256dh, and auth are required.",
        ));
    }

    let message = request
        .message
        .as_deref()
        .unwrap_or("Test notification from Stillbell")
        .trim();
    if message.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "message must not be empty."));
    }

    let sender = WebPushSender::new(vapid).map_err(|err| {
        eprintln!("push test error: unusable VAPID keys ({err})");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to initialize push sender.",
        )
    })?;

    let subscription = PushSubscription {
        endpoint: request.endpoint,
        keys: SubscriptionKeys {
            p256dh: request.p256dh,
            auth: request.auth,
        },
    };

    if let Err(err) = sender.send(&subscription, message).await {
        eprintln!("push test error: {err}");
        return Err((
            StatusCode::BAD_GATEWAY,
            "Failed to send test notification.",
        ));
    }

    Ok(Json(TestPushResponse { status: "sent" }))
}
