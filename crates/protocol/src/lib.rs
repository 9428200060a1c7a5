//! Wire protocol for the attach/detach daemon core: message envelope,
//! payload types, and newline-delimited JSON framing (§3, §4.2, §6.2).

mod codec;
mod error;
mod message;
mod state;
mod tui_state;

pub use codec::{decode, encode, read_message, write_message, ReadOutcome};
pub use error::ProtocolError;
pub use message::{
    ErrorPayload, Handshake, HandshakeResponse, Message, MessageType,
};
pub use state::{
    AppState, KNOWN_VIEW_TYPES, LogLine, LogsViewModel, Notification, UnknownViewType, ViewModel,
    ViewType,
};
pub use tui_state::{ConfigMode, FocusArea, TuiState};

/// Default ring-buffer capacity for server-side log replay (§3).
pub const DEFAULT_LOG_BUFFER_CAPACITY: usize = 1000;

/// Sentinel build hash used by unbuilt development trees, so a developer
/// iterating locally is not pestered with a restart hint (§4.4).
pub const DEV_BUILD_HASH: &str = "devtrack-dev";
