use std::sync::Arc;

use crate::config::AppConfig;

/// Shared, read-only request state. The database pool lives in `db`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}
