use thiserror::Error;

#[derive(Debug, Error)]
#[error("presenter backend error: {0}")]
pub struct PresenterError(pub String);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Protocol(#[from] devtrack_protocol::ProtocolError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
