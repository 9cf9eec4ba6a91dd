use crate::config::AppConfig;
use crate::store::SharedStore;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: SharedStore,
}
