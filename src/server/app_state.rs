use std::sync::Arc;

use crate::broadcast::FlumeBroadcaster;
use crate::config::Config;
use crate::playback::NoopPlayback;
use crate::server::session_manager::SessionManager;

/// Top-level application state shared across handlers.
pub struct AppState {
    pub manager: SessionManager,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let manager = SessionManager::new(
            config.clone(),
            Arc::new(FlumeBroadcaster::new()),
            Arc::new(NoopPlayback),
        );
        Self { manager, config }
    }
}
