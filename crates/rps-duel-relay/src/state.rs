//! Application state management.

use crate::config::RelayConfig;
use crate::rooms::RoomRegistry;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    rooms: RoomRegistry,
    config: Arc<RelayConfig>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            rooms: RoomRegistry::new(),
            config: Arc::new(config),
        }
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}
