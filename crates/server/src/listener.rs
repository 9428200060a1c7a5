use std::sync::Arc;

use devtrack_transport as transport;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::context::{ClientSlot, ServerContext};
use crate::handler;

/// Accept one connection, evicting and joining any existing client
/// first (§3 invariant 1, §4.4 steps 1-4). The client mutex is held
/// across the join so a concurrent accept cannot race this one.
pub(crate) async fn accept_connection(ctx: &Arc<ServerContext>, conn: transport::Connection) {
    let mut guard = ctx.client.lock().await;
    if let Some(old) = guard.take() {
        info!("evicting current client for new connection");
        old.cancel.cancel();
        let _ = old.join.await;
    }

    let (read_half, write_half) = tokio::io::split(conn);
    let writer = Arc::new(AsyncMutex::new(write_half));
    let cancel = CancellationToken::new();

    let task_ctx = ctx.clone();
    let task_writer = writer.clone();
    let task_cancel = cancel.clone();
    let join = tokio::spawn(async move {
        handler::run_client(task_ctx, read_half, task_writer, task_cancel).await;
    });

    *guard = Some(ClientSlot { writer, cancel, join });
}

/// Top-level accept loop (§4.4): races new connections against an
/// external shutdown signal.
pub async fn run(
    ctx: Arc<ServerContext>,
    listener: transport::Listener,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("accept loop received shutdown signal");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((conn, _addr)) => accept_connection(&ctx, conn).await,
                    Err(e) => warn!(error = %e, "accept failed"),
                }
            }
        }
    }
}
