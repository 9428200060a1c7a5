use std::os::unix::fs::PermissionsExt;

use tokio::net::{UnixListener, UnixStream};
use tokio::time::Duration;

use crate::endpoint::Endpoint;
use crate::error::TransportError;

pub type Listener = UnixListener;
pub type Connection = UnixStream;

/// Bind the endpoint's socket path. The containing directory is created
/// `0700`; the socket file is chmod'd `0600` after bind (§4.1, §3
/// invariant 6).
pub async fn listen(endpoint: &Endpoint) -> Result<Listener, TransportError> {
    tokio::fs::create_dir_all(&endpoint.base_dir).await?;
    tokio::fs::set_permissions(&endpoint.base_dir, std::fs::Permissions::from_mode(0o700)).await?;

    // A leftover socket file from a crashed daemon would make bind fail;
    // the lifecycle supervisor is responsible for verifying ownership
    // and staleness before we get here (§4.3), so an unconditional
    // remove is safe at this layer.
    if endpoint.socket_path.exists() {
        let _ = tokio::fs::remove_file(&endpoint.socket_path).await;
    }

    let listener = UnixListener::bind(&endpoint.socket_path)
        .map_err(|source| TransportError::Bind { path: endpoint.socket_path.clone(), source })?;
    tokio::fs::set_permissions(&endpoint.socket_path, std::fs::Permissions::from_mode(0o600))
        .await?;
    Ok(listener)
}

pub async fn dial(endpoint: &Endpoint, timeout: Duration) -> Result<Connection, TransportError> {
    tokio::time::timeout(timeout, UnixStream::connect(&endpoint.socket_path))
        .await
        .map_err(|_| TransportError::ConnectTimeout)?
        .map_err(TransportError::Dial)
}
