//! End-to-end tests against a real listening socket, covering the
//! attach/detach/reattach and log-replay scenarios from spec §8 (S1, S4).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use devtrack_protocol::{
    AppState, FocusArea, Handshake, LogLine, Message, MessageType, ReadOutcome, TuiState,
};
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

async fn start_test_server(dir: &tempfile::TempDir) -> (Endpoint, Arc<ServerContext>, CancellationToken) {
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

async fn send(
    writer: &mut tokio::io::WriteHalf<transport::Connection>,
    msg: &Message,
) {
    let bytes = devtrack_protocol::encode(msg).expect("encode");
    writer.write_all(&bytes).await.expect("write");
    writer.flush().await.expect("flush");
}

async fn recv(
    reader: &mut BufReader<tokio::io::ReadHalf<transport::Connection>>,
) -> Message {
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

#[tokio::test]
async fn attach_detach_reattach_hands_off_tui_state_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (endpoint, _ctx, _shutdown) = start_test_server(&dir).await;

    // Client A: handshake, read handshake_resp + state, save tui state, disconnect.
    let (mut a_reader, mut a_writer) = connect_halves(&endpoint).await;
    send(&mut a_writer, &handshake("abcdef")).await;
    let resp = recv(&mut a_reader).await;
    assert_eq!(resp.message_type, MessageType::HandshakeResp);
    let state_msg = recv(&mut a_reader).await;
    assert_eq!(state_msg.message_type, MessageType::State);

    let saved_tui = TuiState {
        current_view: "logs".into(),
        focus_area: FocusArea::Main,
        sidebar_selection: 0,
        main_selection: 0,
        detail_selection: 0,
        main_scroll: 0,
        detail_scroll: 0,
        config_mode: devtrack_protocol::ConfigMode::Projects,
        browser_path: None,
        log_level_filter: None,
        log_source_filter: None,
        log_type_filter: None,
        log_search_filter: None,
        log_scroll_offset: 0,
        log_auto_scroll: true,
        git_show_diff: false,
        active_build_profile: None,
    };
    send(&mut a_writer, &Message::save_tui_state(saved_tui.clone()).unwrap()).await;
    drop(a_writer);
    drop(a_reader);

    // Give the server a moment to notice the disconnect before the next attach.
    tokio::time::sleep(Duration::from_millis(150)).await;

    // Client B: handshakes, should receive the handed-off tui_state exactly once.
    let (mut b_reader, mut b_writer) = connect_halves(&endpoint).await;
    send(&mut b_writer, &handshake("abcdef")).await;
    assert_eq!(recv(&mut b_reader).await.message_type, MessageType::HandshakeResp);
    assert_eq!(recv(&mut b_reader).await.message_type, MessageType::State);

    let mut got_tui_state = None;
    loop {
        match recv_timeout(&mut b_reader, Duration::from_millis(300)).await {
            Some(msg) if msg.message_type == MessageType::Log => continue,
            Some(msg) if msg.message_type == MessageType::TuiState => {
                got_tui_state = Some(msg);
                break;
            }
            Some(other) => panic!("unexpected message before tui_state: {:?}", other.message_type),
            None => break,
        }
    }
    let tui_msg = got_tui_state.expect("client B should receive the handed-off tui state");
    let roundtripped: devtrack_protocol::TuiState =
        tui_msg.payload_as::<TuiStatePayloadShim>().unwrap().tui_state;
    assert_eq!(roundtripped, saved_tui);
    drop(b_writer);
    drop(b_reader);

    tokio::time::sleep(Duration::from_millis(150)).await;

    // Client C: a fresh attach with no intervening save receives no tui_state.
    let (mut c_reader, mut c_writer) = connect_halves(&endpoint).await;
    send(&mut c_writer, &handshake("abcdef")).await;
    assert_eq!(recv(&mut c_reader).await.message_type, MessageType::HandshakeResp);
    assert_eq!(recv(&mut c_reader).await.message_type, MessageType::State);
    assert!(recv_timeout(&mut c_reader, Duration::from_millis(300)).await.is_none());
}

#[derive(serde::Deserialize)]
struct TuiStatePayloadShim {
    tui_state: devtrack_protocol::TuiState,
}

#[tokio::test]
async fn log_overflow_replays_most_recent_1000_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (endpoint, ctx, _shutdown) = start_test_server(&dir).await;

    for i in 0..1500 {
        ctx.broadcast_log(LogLine {
            timestamp: chrono::Utc::now(),
            level: "info".into(),
            source: None,
            text: format!("L{i}"),
        })
        .await;
    }

    let (mut reader, mut writer) = connect_halves(&endpoint).await;
    send(&mut writer, &handshake("abcdef")).await;
    assert_eq!(recv(&mut reader).await.message_type, MessageType::HandshakeResp);
    assert_eq!(recv(&mut reader).await.message_type, MessageType::State);

    let mut lines = Vec::new();
    loop {
        match recv_timeout(&mut reader, Duration::from_millis(300)).await {
            Some(msg) if msg.message_type == MessageType::Log => {
                let payload: LogPayloadShim = msg.payload_as().unwrap();
                lines.push(payload.line.text);
            }
            Some(msg) if msg.message_type == MessageType::TuiState => break,
            Some(other) => panic!("unexpected message: {:?}", other.message_type),
            None => break,
        }
    }

    assert_eq!(lines.len(), 1000);
    assert_eq!(lines.first().unwrap(), "L500");
    assert_eq!(lines.last().unwrap(), "L1499");
}

#[derive(serde::Deserialize)]
struct LogPayloadShim {
    line: LogLine,
}

#[tokio::test]
async fn bare_connect_without_handshake_produces_no_state() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (endpoint, _ctx, _shutdown) = start_test_server(&dir).await;

    let (mut reader, writer) = connect_halves(&endpoint).await;
    drop(writer);
    assert!(recv_timeout(&mut reader, Duration::from_millis(300)).await.is_none());
}
