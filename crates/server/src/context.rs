use std::sync::Arc;

use devtrack_protocol::{self as protocol, AppState, LogLine, Notification, TuiState};
use devtrack_transport::Endpoint;
use tokio::io::WriteHalf;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::presenter::PresenterBackend;
use crate::ring_buffer::LogRingBuffer;

pub(crate) type Writer = WriteHalf<devtrack_transport::Connection>;
pub(crate) type SharedWriter = Arc<AsyncMutex<Writer>>;

/// Everything tracked about the single active client connection (§3).
/// `cancel` signals the per-client handler loop to stop at its next
/// poll tick; `join` is the per-client "completion signal" the accept
/// loop waits on before starting a new handler (§4.4, §9).
pub(crate) struct ClientSlot {
    pub writer: SharedWriter,
    pub cancel: CancellationToken,
    pub join: JoinHandle<()>,
}

/// Shared server state (§3, §5): the client mutex must be an async mutex
/// because the accept loop holds it across the `.await` that joins the
/// outgoing handler (§4.4 step 2) — a sync mutex guard cannot be held
/// across an await point safely. `tui_state` and `log_buffer` are never
/// held across an await, so they stay `parking_lot::Mutex` as in the
/// rest of this workspace.
pub struct ServerContext {
    pub(crate) client: AsyncMutex<Option<ClientSlot>>,
    pub(crate) tui_state: parking_lot::Mutex<Option<TuiState>>,
    pub(crate) log_buffer: parking_lot::Mutex<LogRingBuffer>,
    pub(crate) presenter: Arc<dyn PresenterBackend>,
    pub(crate) build_hash: String,
    pub(crate) version: String,
}

impl ServerContext {
    pub fn new(
        presenter: Arc<dyn PresenterBackend>,
        build_hash: impl Into<String>,
        version: impl Into<String>,
        log_capacity: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            client: AsyncMutex::new(None),
            tui_state: parking_lot::Mutex::new(None),
            log_buffer: parking_lot::Mutex::new(LogRingBuffer::new(log_capacity)),
            presenter,
            build_hash: build_hash.into(),
            version: version.into(),
        })
    }

    /// `BroadcastState` (§4.4): writes to the current client if any.
    pub async fn broadcast_state(&self, state: AppState) {
        match protocol::Message::state(state) {
            Ok(msg) => self.write_to_current_client(&msg).await,
            Err(e) => warn!(error = %e, "failed to encode broadcast state"),
        }
    }

    /// `BroadcastLog` (§4.4): always appends to the ring buffer first,
    /// regardless of whether a client is attached, then writes to the
    /// current client if any.
    pub async fn broadcast_log(&self, line: LogLine) {
        self.log_buffer.lock().push(line.clone());
        match protocol::Message::log(line) {
            Ok(msg) => self.write_to_current_client(&msg).await,
            Err(e) => warn!(error = %e, "failed to encode broadcast log line"),
        }
    }

    /// `BroadcastNotification` (§4.4): writes to the current client if
    /// any. Not buffered.
    pub async fn broadcast_notification(&self, notification: Notification) {
        match protocol::Message::notify(notification) {
            Ok(msg) => self.write_to_current_client(&msg).await,
            Err(e) => warn!(error = %e, "failed to encode broadcast notification"),
        }
    }

    pub(crate) async fn write_to_current_client(&self, msg: &protocol::Message) {
        let guard = self.client.lock().await;
        if let Some(slot) = guard.as_ref() {
            let mut writer = slot.writer.lock().await;
            if let Err(e) = protocol::write_message(&mut *writer, msg).await {
                warn!(error = %e, "broadcast write to current client failed");
            }
        }
    }

    /// Graceful stop (§4.4): evict the current client, join its
    /// handler, then remove the socket and PID artifacts this server
    /// owns (unconditional — they are always ours at this point).
    pub async fn shutdown(&self, endpoint: &Endpoint) {
        let mut guard = self.client.lock().await;
        if let Some(slot) = guard.take() {
            slot.cancel.cancel();
            let _ = slot.join.await;
        }
        drop(guard);
        let _ = std::fs::remove_file(&endpoint.socket_path);
        let _ = std::fs::remove_file(&endpoint.pid_path);
    }
}
