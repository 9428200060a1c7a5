use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("daemon is already running")]
    AlreadyRunning,

    #[error("daemon is not running")]
    NotRunning,

    #[error("daemon did not become ready within the spawn timeout")]
    SpawnTimeout,

    #[error("daemon did not exit within the stop timeout, and remained alive after SIGKILL")]
    StopTimeout,

    #[error(transparent)]
    Transport(#[from] devtrack_transport::TransportError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
