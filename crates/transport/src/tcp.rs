use tokio::net::{TcpListener, TcpStream};
use tokio::time::Duration;

use crate::endpoint::Endpoint;
use crate::error::TransportError;

pub type Listener = TcpListener;
pub type Connection = TcpStream;

/// Bind an OS-assigned loopback port and publish it via the sibling
/// `.addr` file clients dial through (§4.1, §6.1). This module only
/// builds for non-Unix targets (`crates/transport/src/lib.rs`'s
/// `#[cfg(not(unix))]` arm), where there is no `chmod` equivalent to
/// apply — restricting the `.addr` file is a no-op at the OS level
/// there, per §9's stated platform tradeoff.
pub async fn listen(endpoint: &Endpoint) -> Result<Listener, TransportError> {
    tokio::fs::create_dir_all(&endpoint.base_dir).await?;

    let listener = TcpListener::bind(("127.0.0.1", 0))
        .await
        .map_err(|source| TransportError::Bind { path: endpoint.addr_path(), source })?;
    let addr = listener.local_addr()?;

    tokio::fs::write(endpoint.addr_path(), addr.to_string()).await?;

    Ok(listener)
}

/// Dial by first reading the peer's `.addr` file (§4.5: "on non-Unix,
/// read the sibling `.addr` file first").
pub async fn dial(endpoint: &Endpoint, timeout: Duration) -> Result<Connection, TransportError> {
    let addr_text = tokio::fs::read_to_string(endpoint.addr_path()).await?;
    let addr = addr_text
        .trim()
        .parse()
        .map_err(|_| TransportError::Dial(std::io::Error::other("malformed .addr file")))?;

    tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| TransportError::ConnectTimeout)?
        .map_err(TransportError::Dial)
}
