use crate::config;
use crate::push as push_service;
use crate::state;
use crate::store;

use axum::Router;
use axum::routing::get;
use axum::routing::post;

mod push;

pub fn app(config: config::AppConfig) -> Router {
    let store = store::ReminderStore::open(config.store_path.clone())
        .unwrap_or_else(|err| panic!("could not open reminder store: {err}"));
    let store = std::sync::Arc::new(std::sync::Mutex::new(store));
    let state = state::AppState {
        config,
        store: std::sync::Arc::clone(&store),
    };
    let _sweep = push_service::maybe_start_sweep(&state.config, store);
    Router::new()
        .route("/subscribe", post(push::subscribe))
        .route("/unsubscribe", post(push::unsubscribe))
        .route("/schedule", post(push::update_schedule))
        .route("/vapid-public-key", get(push::vapid_public_key))
        .route("/test-push", post(push::test_push))
        .route("/debug", get(push::store_debug))
        .route("/health", get(health))
        .with_state(state)
}

pub(crate) async fn health() -> &'static str {
    "OK"
}
