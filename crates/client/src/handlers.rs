use std::sync::Arc;

use devtrack_protocol::{AppState, LogLine, Notification, TuiState};

/// Handler slots are reference-counted closures rather than boxed ones
/// so a caller can take a cheap clone while holding the client's mutex
/// and invoke it afterward without holding the lock (§5: no re-entrancy
/// into the client while a handler runs).
pub type StateHandler = Arc<dyn Fn(AppState) + Send + Sync>;
pub type LogHandler = Arc<dyn Fn(LogLine) + Send + Sync>;
pub type NotifyHandler = Arc<dyn Fn(Notification) + Send + Sync>;
pub type DisconnectHandler = Arc<dyn Fn() + Send + Sync>;
pub type TuiStateHandler = Arc<dyn Fn(TuiState) + Send + Sync>;

/// Invoked with `(server_version, server_build_hash)` on a handshake
/// compatibility mismatch (§4.5).
pub type VersionMismatchHandler = Arc<dyn Fn(String, String) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Handlers {
    pub state: Option<StateHandler>,
    pub log: Option<LogHandler>,
    pub notify: Option<NotifyHandler>,
    pub disconnect: Option<DisconnectHandler>,
    pub tui_state: Option<TuiStateHandler>,
    pub version_mismatch: Option<VersionMismatchHandler>,
}
