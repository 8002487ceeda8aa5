// Application state module
// Shared collaborators and cached settings for request handlers

use std::sync::Arc;
use tokio::sync::Notify;

use super::types::Config;
use crate::block::{BlockBinder, RuntimeBinder};
use crate::courseware::CoursewareContext;
use crate::store::{ModuleStore, SharedPositionStore};

/// Application state
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ModuleStore>,
    pub binder: Arc<dyn BlockBinder>,
    pub positions: SharedPositionStore,

    /// Fired once when the process should stop accepting connections
    pub shutdown: Arc<Notify>,

    /// Whether requests are written to the access log
    pub access_log: bool,
}

impl AppState {
    /// Create `AppState` over a loaded store and position state
    pub fn new(config: &Config, store: Arc<dyn ModuleStore>, positions: SharedPositionStore) -> Self {
        let binder = Arc::new(RuntimeBinder::new(
            config.courseware.positioned_block_types.iter().cloned(),
            Arc::clone(&positions),
        ));

        Self {
            config: config.clone(),
            store,
            binder,
            positions,
            shutdown: Arc::new(Notify::new()),
            access_log: config.logging.access_log,
        }
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.access_log
    }

    /// Courseware collaborators borrowed from this state
    pub fn courseware_context(&self) -> CoursewareContext<'_> {
        CoursewareContext {
            store: self.store.as_ref(),
            mfe_base_url: &self.config.courseware.mfe_base_url,
            content_depth: self.config.courseware.content_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{demo_state, demo_store, memory_positions};

    #[test]
    fn test_courseware_context_uses_config() {
        let state = demo_state();
        let ctx = state.courseware_context();
        assert_eq!(ctx.mfe_base_url, "http://mfe.test");
        assert_eq!(ctx.content_depth, 2);
        assert!(!state.access_log_enabled());
    }

    #[test]
    fn test_access_log_follows_config() {
        let mut config = demo_state().config.clone();
        config.logging.access_log = true;
        let state = AppState::new(&config, Arc::new(demo_store()), Arc::new(memory_positions()));
        assert!(state.access_log_enabled());
    }
}
