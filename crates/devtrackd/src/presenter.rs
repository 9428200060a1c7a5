use std::collections::HashMap;

use devtrack_protocol::{AppState, ViewType};
use devtrack_server::{PresenterBackend, PresenterError};
use tracing::debug;

/// Minimal in-memory backend presenter wired into the daemon binary.
/// Project/build/process/git integrations are out of scope (§6.3); this
/// exists so `devtrackd` is runnable end to end rather than a headless
/// protocol shell.
pub struct DemoPresenter {
    state: parking_lot::Mutex<AppState>,
}

impl DemoPresenter {
    pub fn new() -> Self {
        let mut views = HashMap::new();
        views.insert(ViewType::Projects, serde_json::json!([]));
        views.insert(ViewType::Builds, serde_json::json!([]));
        views.insert(ViewType::Processes, serde_json::json!([]));
        views.insert(ViewType::Git, serde_json::json!({ "branch": null }));
        views.insert(ViewType::Config, serde_json::json!({}));
        Self {
            state: parking_lot::Mutex::new(AppState { views, initializing: false, ..Default::default() }),
        }
    }
}

impl Default for DemoPresenter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PresenterBackend for DemoPresenter {
    async fn get_state(&self) -> Option<AppState> {
        Some(self.state.lock().clone())
    }

    async fn refresh(&self) -> Result<(), PresenterError> {
        Ok(())
    }

    async fn handle_event(&self, event: serde_json::Value) -> Result<(), PresenterError> {
        debug!(?event, "demo presenter received event");
        Ok(())
    }
}
