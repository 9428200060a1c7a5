//! Client core and presenter (C5 + C6): connect/handshake, receive loop
//! with pre-handler buffering, typed sends, and a thin per-view adapter
//! over the connection (§4.5, §4.6).

mod daemon_client;
mod error;
mod handlers;
mod presenter;

pub use daemon_client::DaemonClient;
pub use error::ClientError;
pub use handlers::{
    DisconnectHandler, LogHandler, NotifyHandler, StateHandler, TuiStateHandler,
    VersionMismatchHandler,
};
pub use presenter::{
    ClientPresenter, NotificationSubscriber, TuiStateCallback, ViewSubscriber,
    DEFAULT_MAX_LOG_LINES,
};
