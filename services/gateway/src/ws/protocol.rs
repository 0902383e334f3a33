//! Defines the WebSocket wire protocol between the client device and the
//! gateway: the inbound command envelope and the uniform outbound
//! `ServerResponse` frame.

use kit_gateway_core::session::CommandKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Why an inbound text frame could not be turned into a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Not valid JSON, or not an object carrying a string `type` and an
    /// object `data`.
    Malformed,
    /// The envelope was well-formed but `type` names no known command.
    UnknownType(String),
}

/// A parsed inbound text command.
///
/// `data` stays untyped here; field-level validation belongs to the
/// individual handlers, after the state-legality check.
#[derive(Debug)]
pub struct ClientCommand {
    pub kind: CommandKind,
    pub data: Map<String, Value>,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    data: Map<String, Value>,
}

/// Parses one inbound text frame into a command.
///
/// Envelope problems are `Malformed`; a well-formed envelope with an
/// unrecognized `type` is reported separately so the router can reject it
/// softly. Both checks happen before any state-legality decision.
pub fn parse_command(text: &str) -> Result<ClientCommand, ParseError> {
    let envelope: Envelope = serde_json::from_str(text).map_err(|_| ParseError::Malformed)?;
    let kind = match envelope.kind.as_str() {
        "auth" => CommandKind::Auth,
        "register" => CommandKind::Register,
        "chat" => CommandKind::Chat,
        other => return Err(ParseError::UnknownType(other.to_string())),
    };
    Ok(ClientCommand {
        kind,
        data: envelope.data,
    })
}

/// Status of an outbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// The uniform outbound envelope.
///
/// Every reply is exactly one of these serialized as a single text frame.
/// All four fields are always emitted; `data` is an explicit `null` when
/// there is nothing to attach. The gateway only ever writes this type, it
/// never parses its own responses.
#[derive(Debug, Clone, Serialize)]
pub struct ServerResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub status: ResponseStatus,
    pub message: String,
    pub data: Value,
}

impl ServerResponse {
    pub fn success(kind: &str, message: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.to_string(),
            status: ResponseStatus::Success,
            message: message.into(),
            data,
        }
    }

    pub fn error(kind: &str, message: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.to_string(),
            status: ResponseStatus::Error,
            message: message.into(),
            data,
        }
    }
}
