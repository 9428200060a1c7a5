//! Daemon lifecycle supervisor (§4.3): discover-or-start, health-check,
//! graceful stop with escalation, stale-artifact cleanup, multi-instance
//! isolation.

mod error;
mod lifecycle;
mod spawn;

pub use devtrack_transport::Endpoint;
pub use error::LifecycleError;
pub use lifecycle::{is_running, list_instances, start, stop, wipe, StartedDaemon};
pub use spawn::{spawn_detached, SpawnArgs};
