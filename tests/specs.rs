//! Workspace-level integration tests for invariants and scenarios not
//! already exercised by a single crate's own test suite (§8): single-
//! client eviction (property 1, S2), client-side pre-handler buffering
//! (property 6), and graceful-stop escalation to SIGKILL (S6).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use devtrack_protocol::{AppState, Handshake, LogLine, Message, MessageType, ReadOutcome};
use devtrack_server::{PresenterBackend, PresenterError, ServerContext};
use devtrack_transport::{self as transport, Endpoint};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

struct FakePresenter {
    state: parking_lot::Mutex<Option<AppState>>,
}

impl FakePresenter {
    fn new() -> Arc<Self> {
        Arc::new(Self { state: parking_lot::Mutex::new(Some(AppState::default())) })
    }
}

#[async_trait]
impl PresenterBackend for FakePresenter {
    async fn get_state(&self) -> Option<AppState> {
        self.state.lock().clone()
    }

    async fn refresh(&self) -> Result<(), PresenterError> {
        Ok(())
    }

    async fn handle_event(&self, _event: serde_json::Value) -> Result<(), PresenterError> {
        Ok(())
    }
}

async fn start_test_server(
    dir: &tempfile::TempDir,
) -> (Endpoint, Arc<ServerContext>, CancellationToken) {
    let endpoint = Endpoint::from_base_dir("", dir.path().to_path_buf());
    let listener = transport::listen(&endpoint).await.expect("listen");
    let ctx = ServerContext::new(FakePresenter::new(), "abcdef", "0.1.0", 1000);
    let shutdown = CancellationToken::new();

    let run_ctx = ctx.clone();
    let run_shutdown = shutdown.clone();
    tokio::spawn(async move {
        devtrack_server::run(run_ctx, listener, run_shutdown).await;
    });

    (endpoint, ctx, shutdown)
}

async fn connect_halves(
    endpoint: &Endpoint,
) -> (
    BufReader<tokio::io::ReadHalf<transport::Connection>>,
    tokio::io::WriteHalf<transport::Connection>,
) {
    let conn = transport::dial(endpoint, Duration::from_secs(1)).await.expect("dial");
    let (read_half, write_half) = tokio::io::split(conn);
    (BufReader::new(read_half), write_half)
}

async fn send(writer: &mut tokio::io::WriteHalf<transport::Connection>, msg: &Message) {
    let bytes = devtrack_protocol::encode(msg).expect("encode");
    writer.write_all(&bytes).await.expect("write");
    writer.flush().await.expect("flush");
}

async fn recv(reader: &mut BufReader<tokio::io::ReadHalf<transport::Connection>>) -> Message {
    loop {
        match devtrack_protocol::read_message(reader).await.expect("read") {
            ReadOutcome::Message(msg) => return msg,
            ReadOutcome::Skipped => continue,
            ReadOutcome::Eof => panic!("unexpected eof while waiting for a message"),
        }
    }
}

async fn recv_timeout(
    reader: &mut BufReader<tokio::io::ReadHalf<transport::Connection>>,
    dur: Duration,
) -> Option<Message> {
    tokio::time::timeout(dur, recv(reader)).await.ok()
}

fn handshake(build_hash: &str) -> Message {
    Message::handshake(Handshake { build_hash: build_hash.into(), version: "0.1.0".into() })
        .expect("encode handshake")
}

/// Property 1 + S2: a second connection evicts the first, whose
/// handler is fully joined before the new one starts; the new client
/// still receives its own initial state.
#[tokio::test]
async fn single_client_eviction_closes_prior_connection_and_serves_next() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (endpoint, _ctx, _shutdown) = start_test_server(&dir).await;

    let (mut a_reader, mut a_writer) = connect_halves(&endpoint).await;
    send(&mut a_writer, &handshake("abcdef")).await;
    assert_eq!(recv(&mut a_reader).await.message_type, MessageType::HandshakeResp);
    assert_eq!(recv(&mut a_reader).await.message_type, MessageType::State);

    let (mut b_reader, mut b_writer) = connect_halves(&endpoint).await;
    send(&mut b_writer, &handshake("abcdef")).await;
    assert_eq!(recv(&mut b_reader).await.message_type, MessageType::HandshakeResp);
    assert_eq!(recv(&mut b_reader).await.message_type, MessageType::State);

    // A's connection was evicted: its socket now reads EOF.
    let outcome = devtrack_protocol::read_message(&mut a_reader).await.expect("read");
    assert!(matches!(outcome, ReadOutcome::Eof));
    drop(a_writer);
}

/// Property 6: `state` and `log` messages that arrive before their
/// client-core handler is registered are buffered (most-recent-wins for
/// state, all-in-order for logs) and delivered once the handler is
/// installed, draining the pending buffer.
#[tokio::test]
async fn client_core_buffers_state_and_logs_before_handlers_are_installed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (endpoint, ctx, _shutdown) = start_test_server(&dir).await;

    let client = devtrack_client::DaemonClient::connect(
        &endpoint,
        Duration::from_secs(1),
        "abcdef",
        "0.1.0",
    )
    .await
    .expect("connect");

    // Let the handshake_resp + initial (empty) state settle with no
    // handler installed yet, then push buffered-worthy traffic.
    tokio::time::sleep(Duration::from_millis(150)).await;

    for i in 0..3 {
        ctx.broadcast_log(LogLine {
            timestamp: chrono::Utc::now(),
            level: "info".into(),
            source: None,
            text: format!("buffered-{i}"),
        })
        .await;
    }
    let mut state = AppState::default();
    state.initializing = false;
    ctx.broadcast_state(state).await;

    tokio::time::sleep(Duration::from_millis(150)).await;

    let received_logs = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let received_logs_cb = received_logs.clone();
    client.on_log(Arc::new(move |line| received_logs_cb.lock().push(line.text)));

    let received_states = Arc::new(parking_lot::Mutex::new(0usize));
    let received_states_cb = received_states.clone();
    client.on_state(Arc::new(move |_| *received_states_cb.lock() += 1));

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(*received_logs.lock(), vec!["buffered-0", "buffered-1", "buffered-2"]);
    // Most-recent-wins: only the broadcasted state fans out, not the
    // earlier empty initial-attach state too.
    assert_eq!(*received_states.lock(), 1);

    client.disconnect().await;
}

/// S6: a daemon whose accept loop ignores SIGTERM is escalated to
/// SIGKILL after the graceful-stop timeout.
#[cfg(unix)]
#[tokio::test]
async fn stop_escalates_to_sigkill_when_process_ignores_sigterm() {
    let dir = tempfile::tempdir().expect("tempdir");
    let endpoint = Endpoint::from_base_dir("", dir.path().to_path_buf());
    tokio::fs::create_dir_all(&endpoint.base_dir).await.unwrap();

    let mut child = std::process::Command::new("sh")
        .args(["-c", "trap '' TERM; sleep 30"])
        .spawn()
        .expect("spawn stubborn child");

    tokio::fs::write(&endpoint.pid_path, child.id().to_string()).await.unwrap();

    // Reap on a blocking thread as soon as the kernel marks the process
    // dead, so `process_exists`'s `kill(pid, 0)` probe does not keep
    // observing a not-yet-reaped zombie past the kill grace period.
    let reaper = tokio::task::spawn_blocking(move || {
        let _ = child.wait();
    });

    let stopped = devtrack_supervisor::stop(&endpoint).await.expect("stop");
    assert!(stopped);
    assert!(!devtrack_supervisor::is_running(&endpoint).await);

    reaper.await.expect("reaper task should have joined");
}
