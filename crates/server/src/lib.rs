//! Server core (C4): accept loop with single-active-client policy,
//! per-connection dispatch, handshake-gated initial state, TUI-state
//! custody, ring-buffered log replay, and broadcast to the current
//! client (§3, §4.4).

mod context;
mod error;
mod handler;
mod listener;
mod presenter;
mod ring_buffer;

pub use context::ServerContext;
pub use error::{PresenterError, ServerError};
pub use listener::run;
pub use presenter::PresenterBackend;
pub use ring_buffer::LogRingBuffer;
