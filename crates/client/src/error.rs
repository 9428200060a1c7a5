use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not connected")]
    NotConnected,

    #[error(transparent)]
    Protocol(#[from] devtrack_protocol::ProtocolError),

    #[error(transparent)]
    Transport(#[from] devtrack_transport::TransportError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
