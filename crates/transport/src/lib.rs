//! Platform-appropriate local transport for the attach/detach daemon core
//! (§4.1): bind/listen/dial, filesystem path derivation, permission
//! enforcement, and the short-deadline read polling discipline shared by
//! the server and client read loops.

mod endpoint;
mod error;

#[cfg(unix)]
#[path = "unix.rs"]
mod platform;

#[cfg(not(unix))]
#[path = "tcp.rs"]
mod platform;

use std::future::Future;
use tokio::time::Duration;

pub use endpoint::{base_dir, Endpoint};
pub use error::TransportError;
pub use platform::{dial, listen, Connection, Listener};

/// Env var override for `liveness_dial_timeout()`, mirroring the
/// teacher's `OJ_IPC_TIMEOUT_MS` ambient config knob.
const IPC_TIMEOUT_MS_ENV: &str = "CSD_DEVTRACK_IPC_TIMEOUT_MS";

/// Read-deadline used by the server and client read loops (§4.1, §9):
/// short enough that a cancellation signal is noticed promptly, long
/// enough not to spin the CPU.
pub const READ_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default bounded timeout for `IsRunning`'s socket-connectable probe
/// (§4.3), overridable via `CSD_DEVTRACK_IPC_TIMEOUT_MS`.
pub const LIVENESS_DIAL_TIMEOUT: Duration = Duration::from_millis(500);

/// Resolve the liveness dial timeout, honoring `CSD_DEVTRACK_IPC_TIMEOUT_MS`
/// if set to a valid millisecond count.
pub fn liveness_dial_timeout() -> Duration {
    std::env::var(IPC_TIMEOUT_MS_ENV)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(LIVENESS_DIAL_TIMEOUT)
}

/// Race `fut` against `READ_POLL_INTERVAL`. `None` means the deadline
/// elapsed — callers must treat that as "continue", not as an error
/// (§4.1, §4.4, §4.5).
pub async fn poll_with_deadline<F: Future>(fut: F) -> Option<F::Output> {
    tokio::time::timeout(READ_POLL_INTERVAL, fut).await.ok()
}
