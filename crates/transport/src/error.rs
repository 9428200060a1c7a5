use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error(
        "invalid instance name {0:?}: must match [A-Za-z0-9_-] (empty name is the default instance)"
    )]
    InvalidInstanceName(String),

    #[error("could not determine the user's home directory")]
    NoHomeDir,

    #[error("failed to bind endpoint at {path}: {source}")]
    Bind { path: std::path::PathBuf, #[source] source: std::io::Error },

    #[error("failed to dial endpoint: {0}")]
    Dial(#[source] std::io::Error),

    #[error("connect timed out")]
    ConnectTimeout,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
