// Application state shared by the HTTP handlers

use std::sync::Arc;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::engine::WagerEngine;
use crate::error::WagerResult;
use crate::store::MemoryStore;

/// No outer lock: the engine serializes per bet and per user on its own.
pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub engine: WagerEngine,
    pub store: Arc<MemoryStore>,
    pub config: EngineConfig,
}

impl AppState {
    /// Restore from `config.state_file` if it exists, otherwise start empty.
    pub fn new(config: EngineConfig) -> Self {
        info!("🚀 Initializing Fire Back wager engine...");

        let store = match MemoryStore::load_from_file(&config.state_file) {
            Ok(store) => {
                info!("✅ Loaded persisted state from {}", config.state_file);
                store
            }
            Err(e) => {
                info!("ℹ️  No persisted state ({}), starting fresh", e);
                MemoryStore::new()
            }
        };
        Self::with_store(Arc::new(store), Arc::new(SystemClock), config)
    }

    pub fn with_store(store: Arc<MemoryStore>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        let engine = WagerEngine::with_memory_store(store.clone(), clock, &config);
        info!(
            "🎲 House edge {} | odds floor {} | unbacked odds {}",
            config.odds.house_edge, config.odds.floor, config.odds.unbacked
        );
        Self { engine, store, config }
    }

    pub fn save_to_disk(&self) -> WagerResult<()> {
        if let Err(e) = self.store.save_to_file(&self.config.state_file) {
            warn!("❌ Failed to save state: {}", e);
            return Err(e);
        }
        info!("💾 State saved to {}", self.config.state_file);
        Ok(())
    }
}
