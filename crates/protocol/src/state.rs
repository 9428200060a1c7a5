use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The domains of application state the daemon owns (§1). `Logs` and
/// `Notifications` carry a known shape (the core appends to and evicts
/// from them); the rest are opaque payloads owned by the presenter
/// backend, which is out of scope here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    Projects,
    Builds,
    Processes,
    Logs,
    Git,
    Notifications,
    Config,
}

pub const KNOWN_VIEW_TYPES: [ViewType; 7] = [
    ViewType::Projects,
    ViewType::Builds,
    ViewType::Processes,
    ViewType::Logs,
    ViewType::Git,
    ViewType::Notifications,
    ViewType::Config,
];

/// Error returned by `AppState::view` / `ClientPresenter::view_model` for
/// an unknown view type (§4.6: "unknown types fail").
#[derive(Debug, thiserror::Error)]
#[error("no view model registered for {0:?}")]
pub struct UnknownViewType(pub ViewType);

/// A member of `AppState::views`, indexed by `ViewType`. The server and
/// transport treat the interior value as opaque JSON produced by the
/// presenter backend; only `Logs` is further interpreted by this crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ViewModel {
    Logs(LogsViewModel),
    Notifications(Vec<Notification>),
    Opaque(serde_json::Value),
}

/// A single log entry as seen by the view layer. The core only appends
/// to and evicts from this; line contents are opaque to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub source: Option<String>,
    pub text: String,
}

/// The log sub-view: a bounded, most-recent-first-evicted line history.
///
/// This mirrors the server's ring buffer on the client side (§4.6
/// invariant 4 / testable property 5): the presenter must be able to
/// preserve its locally accumulated lines across a full-state snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LogsViewModel {
    pub lines: VecDeque<LogLine>,
}

impl LogsViewModel {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Append a line, evicting the oldest if `max_lines` is exceeded.
    pub fn push(&mut self, line: LogLine, max_lines: usize) {
        self.lines.push_back(line);
        while self.lines.len() > max_lines {
            self.lines.pop_front();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub body: String,
}

/// A complete application-state snapshot (§3): per-view view-models plus
/// the log sub-view and an `initializing` flag signalling that the
/// backend presenter is not yet ready to be trusted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppState {
    pub views: HashMap<ViewType, serde_json::Value>,
    pub logs: LogsViewModel,
    pub notifications: Vec<Notification>,
    pub initializing: bool,
}

impl AppState {
    /// Look up a view model by type, per §4.6 `GetViewModel`.
    pub fn view(&self, view_type: ViewType) -> Result<ViewModel, UnknownViewType> {
        match view_type {
            ViewType::Logs => Ok(ViewModel::Logs(self.logs.clone())),
            ViewType::Notifications => Ok(ViewModel::Notifications(self.notifications.clone())),
            other => self
                .views
                .get(&other)
                .cloned()
                .map(ViewModel::Opaque)
                .ok_or(UnknownViewType(other)),
        }
    }
}
