// Application state module
// Shares immutable configuration and the dispatch pipeline across connections

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::types::Config;
use crate::api::Dispatcher;
use crate::store::Store;

/// Application state
pub struct AppState {
    pub config: Config,
    pub dispatcher: Dispatcher,
    pub store: Arc<Store>,

    // Cached config value for fast access on the request path
    pub cached_access_log: AtomicBool,
}

impl AppState {
    pub fn new(config: Config, dispatcher: Dispatcher, store: Arc<Store>) -> Self {
        let cached_access_log = AtomicBool::new(config.logging.access_log);

        Self {
            config,
            dispatcher,
            store,
            cached_access_log,
        }
    }
}
