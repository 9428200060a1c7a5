use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::state::{AppState, LogLine, Notification};
use crate::tui_state::TuiState;

/// The full set of frame kinds carried over the wire.
///
/// `StateUpdate` is reserved: no encoder in this crate emits it and the
/// decoder treats it like any other unrecognized type (forward
/// compatibility).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Event,
    Subscribe,
    GetState,
    Ping,
    SaveTuiState,
    Handshake,
    State,
    StateUpdate,
    Log,
    Notify,
    Pong,
    Error,
    TuiState,
    HandshakeResp,
}

/// One frame: `{type, timestamp, payload}`, newline-terminated on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl Message {
    fn new(message_type: MessageType, payload: Option<serde_json::Value>) -> Self {
        Self { message_type, timestamp: Utc::now(), payload }
    }

    fn with_payload(
        message_type: MessageType,
        payload: &impl Serialize,
    ) -> Result<Self, ProtocolError> {
        let value = serde_json::to_value(payload).map_err(ProtocolError::Encode)?;
        Ok(Self::new(message_type, Some(value)))
    }

    /// Deserialize `payload` into `T`. Callers only do this for the
    /// message types they expect to carry a typed payload.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        let value = self.payload.clone().unwrap_or(serde_json::Value::Null);
        serde_json::from_value(value).map_err(ProtocolError::Decode)
    }

    pub fn event(event: serde_json::Value) -> Result<Self, ProtocolError> {
        Self::with_payload(MessageType::Event, &EventPayload { event })
    }

    pub fn subscribe() -> Self {
        Self::new(MessageType::Subscribe, None)
    }

    pub fn get_state() -> Self {
        Self::new(MessageType::GetState, None)
    }

    pub fn ping() -> Self {
        Self::new(MessageType::Ping, None)
    }

    pub fn pong() -> Self {
        Self::new(MessageType::Pong, None)
    }

    pub fn save_tui_state(tui_state: TuiState) -> Result<Self, ProtocolError> {
        Self::with_payload(MessageType::SaveTuiState, &TuiStatePayload { tui_state })
    }

    pub fn tui_state(tui_state: TuiState) -> Result<Self, ProtocolError> {
        Self::with_payload(MessageType::TuiState, &TuiStatePayload { tui_state })
    }

    pub fn handshake(handshake: Handshake) -> Result<Self, ProtocolError> {
        Self::with_payload(MessageType::Handshake, &handshake)
    }

    pub fn handshake_resp(resp: HandshakeResponse) -> Result<Self, ProtocolError> {
        Self::with_payload(MessageType::HandshakeResp, &resp)
    }

    pub fn state(state: AppState) -> Result<Self, ProtocolError> {
        Self::with_payload(MessageType::State, &StatePayload { state })
    }

    pub fn log(line: LogLine) -> Result<Self, ProtocolError> {
        Self::with_payload(MessageType::Log, &LogPayload { line })
    }

    pub fn notify(notification: Notification) -> Result<Self, ProtocolError> {
        Self::with_payload(MessageType::Notify, &NotifyPayload { notification })
    }

    pub fn error(error: ErrorPayload) -> Result<Self, ProtocolError> {
        Self::with_payload(MessageType::Error, &error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Handshake {
    pub build_hash: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandshakeResponse {
    pub build_hash: String,
    pub version: String,
    pub compatible: bool,
    pub restart_hint: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EventPayload {
    event: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StatePayload {
    state: AppState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LogPayload {
    line: LogLine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NotifyPayload {
    notification: Notification,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TuiStatePayload {
    tui_state: TuiState,
}
