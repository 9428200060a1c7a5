use thiserror::Error;

/// Errors from framing, encoding, or decoding a single message.
///
/// Per the wire protocol's recovery policy, a `Decode` error on one frame
/// is never fatal to the connection — callers log it and move on. `Io`
/// and `ConnectionClosed` are the only variants that should terminate a
/// read loop.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode frame: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("connection closed")]
    ConnectionClosed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
