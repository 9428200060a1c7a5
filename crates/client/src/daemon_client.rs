use std::collections::VecDeque;
use std::sync::Arc;

use devtrack_protocol::{
    self as protocol, AppState, ErrorPayload, Handshake, HandshakeResponse, LogLine, Message,
    MessageType, Notification, ReadOutcome, TuiState,
};
use devtrack_transport::{self as transport, Endpoint};
use tokio::io::{AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::handlers::{
    DisconnectHandler, Handlers, LogHandler, NotifyHandler, StateHandler, TuiStateHandler,
    VersionMismatchHandler,
};

#[derive(Default)]
struct Pending {
    state: Option<AppState>,
    logs: VecDeque<LogLine>,
}

#[derive(Default)]
struct Inner {
    connected: bool,
    handlers: Handlers,
    pending: Pending,
    server_version: Option<String>,
    server_hash: Option<String>,
}

type Writer = WriteHalf<transport::Connection>;

/// Connection to a running daemon (§3 client state, §4.5). Owns one
/// outgoing connection and its receive loop. A single mutex (`inner`)
/// protects connectedness, handler slots, pending buffers, and the
/// server-version fields, matching §5's mutual-exclusion model; the
/// writer gets its own async mutex because writes are async I/O that a
/// `parking_lot::Mutex` guard cannot be held across.
pub struct DaemonClient {
    writer: Arc<AsyncMutex<Option<Writer>>>,
    inner: Arc<parking_lot::Mutex<Inner>>,
    receive_cancel: CancellationToken,
    receive_join: parking_lot::Mutex<Option<JoinHandle<()>>>,
    build_hash: String,
    version: String,
}

impl DaemonClient {
    /// Dial the endpoint, install the reader, spawn the receive loop,
    /// then send a `handshake`. A handshake-send failure is logged and
    /// non-fatal — the connection is left open (§4.5 Connect).
    pub async fn connect(
        endpoint: &Endpoint,
        dial_timeout: Duration,
        build_hash: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let conn = transport::dial(endpoint, dial_timeout).await?;
        let (read_half, write_half) = tokio::io::split(conn);
        let reader = BufReader::new(read_half);

        let writer = Arc::new(AsyncMutex::new(Some(write_half)));
        let inner = Arc::new(parking_lot::Mutex::new(Inner { connected: true, ..Inner::default() }));
        let cancel = CancellationToken::new();

        let loop_inner = inner.clone();
        let loop_cancel = cancel.clone();
        let join = tokio::spawn(run_receive_loop(reader, loop_inner, loop_cancel));

        let client = Self {
            writer,
            inner,
            receive_cancel: cancel,
            receive_join: parking_lot::Mutex::new(Some(join)),
            build_hash: build_hash.into(),
            version: version.into(),
        };

        if let Err(e) = client.send_handshake().await {
            warn!(error = %e, "handshake send failed; connection remains open");
        }

        Ok(client)
    }

    async fn send_handshake(&self) -> Result<(), ClientError> {
        let msg = Message::handshake(Handshake {
            build_hash: self.build_hash.clone(),
            version: self.version.clone(),
        })?;
        self.send_frame(msg).await
    }

    /// `SendEvent` (§4.5).
    pub async fn send_event(&self, event: serde_json::Value) -> Result<(), ClientError> {
        self.send_frame(Message::event(event)?).await
    }

    /// `RequestState` (§4.5): sends `get_state`.
    pub async fn request_state(&self) -> Result<(), ClientError> {
        self.send_frame(Message::get_state()).await
    }

    /// `Ping` (§4.5).
    pub async fn ping(&self) -> Result<(), ClientError> {
        self.send_frame(Message::ping()).await
    }

    /// `SaveTUIState` (§4.5): hand off custody to the server on detach.
    pub async fn save_tui_state(&self, tui_state: TuiState) -> Result<(), ClientError> {
        self.send_frame(Message::save_tui_state(tui_state)?).await
    }

    async fn send_frame(&self, msg: Message) -> Result<(), ClientError> {
        {
            let guard = self.inner.lock();
            if !guard.connected {
                return Err(ClientError::NotConnected);
            }
        }
        let bytes = protocol::encode(&msg)?;
        let mut writer = self.writer.lock().await;
        match writer.as_mut() {
            Some(w) => {
                w.write_all(&bytes).await?;
                w.flush().await?;
                Ok(())
            }
            None => Err(ClientError::NotConnected),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().connected
    }

    pub fn server_version(&self) -> Option<String> {
        self.inner.lock().server_version.clone()
    }

    pub fn server_hash(&self) -> Option<String> {
        self.inner.lock().server_hash.clone()
    }

    /// Installing the state handler atomically takes and drains
    /// `pendingState` (most-recent-wins) through it outside the lock
    /// (§4.5 Handler installation).
    pub fn on_state(&self, handler: StateHandler) {
        let pending = {
            let mut guard = self.inner.lock();
            guard.handlers.state = Some(handler.clone());
            guard.pending.state.take()
        };
        if let Some(state) = pending {
            handler(state);
        }
    }

    /// Installing the log handler atomically takes and drains the full
    /// `pendingLogs` queue, in order, outside the lock.
    pub fn on_log(&self, handler: LogHandler) {
        let pending = {
            let mut guard = self.inner.lock();
            guard.handlers.log = Some(handler.clone());
            std::mem::take(&mut guard.pending.logs)
        };
        for line in pending {
            handler(line);
        }
    }

    pub fn on_notify(&self, handler: NotifyHandler) {
        self.inner.lock().handlers.notify = Some(handler);
    }

    pub fn on_disconnect(&self, handler: DisconnectHandler) {
        self.inner.lock().handlers.disconnect = Some(handler);
    }

    pub fn on_tui_state(&self, handler: TuiStateHandler) {
        self.inner.lock().handlers.tui_state = Some(handler);
    }

    pub fn on_version_mismatch(&self, handler: VersionMismatchHandler) {
        self.inner.lock().handlers.version_mismatch = Some(handler);
    }

    /// Disconnect is idempotent: signal `done`, close the connection,
    /// join the receive loop (§4.5).
    pub async fn disconnect(&self) {
        self.receive_cancel.cancel();
        if let Some(mut w) = self.writer.lock().await.take() {
            let _ = w.shutdown().await;
        }
        let join = self.receive_join.lock().take();
        if let Some(join) = join {
            let _ = join.await;
        }
    }
}

async fn run_receive_loop(
    mut reader: BufReader<ReadHalf<transport::Connection>>,
    inner: Arc<parking_lot::Mutex<Inner>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            outcome = transport::poll_with_deadline(protocol::read_message(&mut reader)) => {
                match outcome {
                    None => continue,
                    Some(Err(e)) => {
                        warn!(error = %e, "client receive loop I/O error");
                        break;
                    }
                    Some(Ok(ReadOutcome::Eof)) => break,
                    Some(Ok(ReadOutcome::Skipped)) => continue,
                    Some(Ok(ReadOutcome::Message(msg))) => dispatch(&inner, msg),
                }
            }
        }
    }
    mark_disconnected(&inner);
}

/// The receive-loop dispatch table (§4.5).
fn dispatch(inner: &Arc<parking_lot::Mutex<Inner>>, msg: Message) {
    match msg.message_type {
        MessageType::State => {
            let payload: Result<StatePayloadShim, _> = msg.payload_as();
            let Ok(payload) = payload else { return };
            let handler = {
                let mut guard = inner.lock();
                match &guard.handlers.state {
                    Some(h) => Some(h.clone()),
                    None => {
                        guard.pending.state = Some(payload.state.clone());
                        None
                    }
                }
            };
            if let Some(h) = handler {
                h(payload.state);
            }
        }
        MessageType::Log => {
            let payload: Result<LogPayloadShim, _> = msg.payload_as();
            let Ok(payload) = payload else { return };
            let handler = {
                let mut guard = inner.lock();
                match &guard.handlers.log {
                    Some(h) => Some(h.clone()),
                    None => {
                        guard.pending.logs.push_back(payload.line.clone());
                        None
                    }
                }
            };
            if let Some(h) = handler {
                h(payload.line);
            }
        }
        MessageType::Notify => {
            let payload: Result<NotifyPayloadShim, _> = msg.payload_as();
            let Ok(payload) = payload else { return };
            let handler = inner.lock().handlers.notify.clone();
            if let Some(h) = handler {
                h(payload.notification);
            }
        }
        MessageType::TuiState => {
            let payload: Result<TuiStatePayloadShim, _> = msg.payload_as();
            let Ok(payload) = payload else { return };
            let handler = inner.lock().handlers.tui_state.clone();
            if let Some(h) = handler {
                h(payload.tui_state);
            }
        }
        MessageType::Pong => {}
        MessageType::Error => {
            if let Ok(err) = msg.payload_as::<ErrorPayload>() {
                debug!(message = %err.message, code = ?err.code, "daemon reported an error");
            }
        }
        MessageType::HandshakeResp => {
            let Ok(resp) = msg.payload_as::<HandshakeResponse>() else { return };
            let handler = {
                let mut guard = inner.lock();
                guard.server_version = Some(resp.version.clone());
                guard.server_hash = Some(resp.build_hash.clone());
                if resp.compatible {
                    None
                } else {
                    guard.handlers.version_mismatch.clone()
                }
            };
            if let Some(h) = handler {
                h(resp.version, resp.build_hash);
            }
        }
        other => {
            debug!(?other, "ignoring frame not handled by the client dispatch table");
        }
    }
}

fn mark_disconnected(inner: &Arc<parking_lot::Mutex<Inner>>) {
    let handler = {
        let mut guard = inner.lock();
        if !guard.connected {
            return;
        }
        guard.connected = false;
        guard.handlers.disconnect.clone()
    };
    if let Some(h) = handler {
        h();
    }
}

#[derive(serde::Deserialize)]
struct StatePayloadShim {
    state: AppState,
}

#[derive(serde::Deserialize)]
struct LogPayloadShim {
    line: LogLine,
}

#[derive(serde::Deserialize)]
struct NotifyPayloadShim {
    notification: Notification,
}

#[derive(serde::Deserialize)]
struct TuiStatePayloadShim {
    tui_state: TuiState,
}
