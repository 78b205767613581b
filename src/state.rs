// FILE: src/state.rs

use std::sync::Arc;

use crate::config::Config;
use crate::storage::FileIndex;

/// Everything a long-running Woxel process shares between its workers.
pub struct GlobalState {
    pub config: Config,

    /// The persisted file index. Cheap to clone; every call opens its own
    /// connection.
    pub index: FileIndex,
}

/// Shared state wrapper for easy cloning and sharing
pub type SharedState = Arc<GlobalState>;

impl GlobalState {
    pub fn new(config: Config) -> Self {
        let index = FileIndex::new(config.db_path.clone());
        Self { config, index }
    }

    pub fn shared(config: Config) -> SharedState {
        Arc::new(Self::new(config))
    }
}
