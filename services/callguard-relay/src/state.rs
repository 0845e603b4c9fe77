use std::sync::Arc;

use callguard_core::LockStore;
use callguard_dispatch::{CallPlacer, DispatchResult, TwilioCallPlacer};
use tracing::info;

use crate::config::Config;

pub struct AppState {
    pub from_number: String,
    pub api_key: String,
    pub locks: Arc<LockStore>,
    pub placer: Arc<dyn CallPlacer>,
}

impl AppState {
    pub fn new(config: &Config) -> DispatchResult<Self> {
        let locks = LockStore::load(&config.lock_file);
        if config.prune_locks_on_load {
            let removed = locks.prune_expired(locks.now_ms());
            info!(removed, remaining = locks.len(), "Pruned expired call locks");
        }

        let placer = TwilioCallPlacer::new(config.twilio.clone())?;

        Ok(Self::from_parts(
            config.from_number.clone(),
            config.api_key.clone(),
            Arc::new(locks),
            Arc::new(placer),
        ))
    }

    pub fn from_parts(
        from_number: String,
        api_key: String,
        locks: Arc<LockStore>,
        placer: Arc<dyn CallPlacer>,
    ) -> Self {
        AppState {
            from_number,
            api_key,
            locks,
            placer,
        }
    }
}
