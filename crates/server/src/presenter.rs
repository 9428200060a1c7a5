use devtrack_protocol::AppState;

use crate::error::PresenterError;

/// The narrow capability set the server core consumes from the
/// presenter backend (§6.3). The concrete backend — project service,
/// build runner, git integration — is out of scope here.
#[async_trait::async_trait]
pub trait PresenterBackend: Send + Sync {
    /// Current snapshot, if one is available yet. Must be cheap and
    /// thread-safe: this is called on every `get_state`/`subscribe` and
    /// on every attach.
    async fn get_state(&self) -> Option<AppState>;

    /// Force a recomputation of the snapshot returned by `get_state`.
    async fn refresh(&self) -> Result<(), PresenterError>;

    /// Accept one inbound UI event.
    async fn handle_event(&self, event: serde_json::Value) -> Result<(), PresenterError>;
}
