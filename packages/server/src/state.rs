use std::sync::Arc;

use common::storage::KeyedBlobStore;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KeyedBlobStore>,
    pub config: AppConfig,
}
