use std::sync::Arc;

use devtrack_protocol::{
    self as protocol, Handshake, HandshakeResponse, Message, MessageType, TuiState, DEV_BUILD_HASH,
};
use devtrack_transport as transport;
use serde::Deserialize;
use tokio::io::{BufReader, ReadHalf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::context::{SharedWriter, ServerContext};
use crate::error::ServerError;

/// Wire shape carried by `event` frames: `{event: <opaque value>}`. Local
/// mirror of the protocol crate's private `EventPayload`, since only the
/// encode side is exported there.
#[derive(Deserialize)]
struct EventEnvelope {
    event: serde_json::Value,
}

/// Wire shape carried by `save_tui_state` frames.
#[derive(Deserialize)]
struct TuiStateEnvelope {
    tui_state: TuiState,
}

/// Per-client handler loop (§4.4). Reads frames until cancelled, EOF, or
/// a fatal I/O error; each frame is dispatched independently so a single
/// undecodable or unexpected frame never ends the connection on its own.
pub(crate) async fn run_client(
    ctx: Arc<ServerContext>,
    read_half: ReadHalf<transport::Connection>,
    writer: SharedWriter,
    cancel: CancellationToken,
) {
    let mut reader = BufReader::new(read_half);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("client handler cancelled");
                break;
            }
            outcome = transport::poll_with_deadline(protocol::read_message(&mut reader)) => {
                match outcome {
                    None => continue,
                    Some(Err(e)) => {
                        warn!(error = %e, "client read failed, closing connection");
                        break;
                    }
                    Some(Ok(protocol::ReadOutcome::Eof)) => break,
                    Some(Ok(protocol::ReadOutcome::Skipped)) => continue,
                    Some(Ok(protocol::ReadOutcome::Message(msg))) => {
                        if let Err(e) = dispatch(&ctx, &writer, msg).await {
                            warn!(error = %e, "dispatch failed for client frame");
                        }
                    }
                }
            }
        }
    }
}

/// The per-frame dispatch table (§4.4).
async fn dispatch(
    ctx: &Arc<ServerContext>,
    writer: &SharedWriter,
    msg: Message,
) -> Result<(), ServerError> {
    match msg.message_type {
        MessageType::Handshake => {
            let hs: Handshake = msg.payload_as()?;
            let compatible = hs.build_hash == ctx.build_hash;
            let both_real = hs.build_hash != DEV_BUILD_HASH && ctx.build_hash != DEV_BUILD_HASH;
            let resp = HandshakeResponse {
                build_hash: ctx.build_hash.clone(),
                version: ctx.version.clone(),
                compatible,
                restart_hint: !compatible && both_real,
            };
            write_locked(writer, &Message::handshake_resp(resp)?).await?;
            full_attach_send(ctx, writer).await?;
        }
        MessageType::Subscribe => {
            full_attach_send(ctx, writer).await?;
        }
        MessageType::GetState => {
            send_state_only(ctx, writer).await?;
        }
        MessageType::Event => {
            let env: EventEnvelope = msg.payload_as()?;
            if let Err(e) = ctx.presenter.handle_event(env.event).await {
                warn!(error = %e, "presenter rejected event");
            }
        }
        MessageType::SaveTuiState => {
            let env: TuiStateEnvelope = msg.payload_as()?;
            *ctx.tui_state.lock() = Some(env.tui_state);
        }
        MessageType::Ping => {
            write_locked(writer, &Message::pong()).await?;
        }
        other => {
            debug!(?other, "ignoring frame not handled by the server dispatch table");
        }
    }
    Ok(())
}

/// `sendStateOnly` (§4.4): the current presenter snapshot, nothing else.
/// Used for `get_state` and as the first step of a full attach send. If a
/// snapshot exists and is not `initializing`, forces a `refresh()` and
/// re-fetches before sending, so the client never observes a stale
/// snapshot when the backend is actually ready to recompute one.
async fn send_state_only(ctx: &Arc<ServerContext>, writer: &SharedWriter) -> Result<(), ServerError> {
    let mut state = ctx.presenter.get_state().await;
    if let Some(ref snapshot) = state {
        if !snapshot.initializing {
            if let Err(e) = ctx.presenter.refresh().await {
                warn!(error = %e, "presenter refresh failed, serving prior snapshot");
            } else {
                state = ctx.presenter.get_state().await;
            }
        }
    }
    if let Some(state) = state {
        write_locked(writer, &Message::state(state)?).await?;
    }
    Ok(())
}

/// `full attach send` (§4.4): state, then every buffered log line in
/// order, then — if a TUI state is in custody — exactly one `tui_state`
/// message, atomically clearing custody so delivery is one-shot.
async fn full_attach_send(ctx: &Arc<ServerContext>, writer: &SharedWriter) -> Result<(), ServerError> {
    send_state_only(ctx, writer).await?;

    let buffered: Vec<_> = ctx.log_buffer.lock().iter().cloned().collect();
    for line in buffered {
        write_locked(writer, &Message::log(line)?).await?;
    }

    let tui_state = ctx.tui_state.lock().take();
    if let Some(tui_state) = tui_state {
        write_locked(writer, &Message::tui_state(tui_state)?).await?;
    }
    Ok(())
}

pub(crate) async fn write_locked(writer: &SharedWriter, msg: &Message) -> Result<(), ServerError> {
    let mut guard = writer.lock().await;
    protocol::write_message(&mut *guard, msg).await?;
    Ok(())
}
