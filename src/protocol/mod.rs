//! Wire model shared with the producer.
//!
//! Every line on the TCP stream is one JSON object:
//!
//! ```json
//! {"type": 0, "data": "{\"content\":\"boot ok\",\"logType\":11,\"timestamp\":0,\"stackTrace\":\"\"}"}
//! {"type": 1, "data": "{\"deviceId\":\"dev-01\",\"platform\":\"WindowsPlayer\"}"}
//! {"type": 2, "data": "CLI closed"}
//! {"type": 3, "data": "hello"}
//! ```
//!
//! | `type` | Meaning        | `data`                                   |
//! |--------|----------------|------------------------------------------|
//! | 0      | `Log`          | [`LogEntry`] encoded as a JSON string    |
//! | 1      | `Handshake`    | producer info, usually a JSON string     |
//! | 2      | `Disconnect`   | reason text                              |
//! | 3      | `Input`        | operator text (relay → producer only)    |
//! | 4      | `WorkerError`  | same shape as `Log`                      |

pub mod codec;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AppError, Result};

/// Record type tag carried in the `type` field.
///
/// Unrecognised tags are preserved in [`MessageType::Unknown`] so the
/// dispatcher can report them without failing the decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum MessageType {
    /// Producer log line.
    Log,
    /// Producer greeting sent right after connecting.
    Handshake,
    /// Either side is closing the connection.
    Disconnect,
    /// Operator text forwarded to the producer.
    Input,
    /// Reserved for producer worker failures; rendered like `Log`.
    WorkerError,
    /// Any tag this relay does not know.
    Unknown(i64),
}

impl From<i64> for MessageType {
    fn from(tag: i64) -> Self {
        match tag {
            0 => Self::Log,
            1 => Self::Handshake,
            2 => Self::Disconnect,
            3 => Self::Input,
            4 => Self::WorkerError,
            other => Self::Unknown(other),
        }
    }
}

impl From<MessageType> for i64 {
    fn from(kind: MessageType) -> Self {
        match kind {
            MessageType::Log => 0,
            MessageType::Handshake => 1,
            MessageType::Disconnect => 2,
            MessageType::Input => 3,
            MessageType::WorkerError => 4,
            MessageType::Unknown(tag) => tag,
        }
    }
}

/// Severity of a rendered line.
///
/// `Info`/`Warning`/`Error` are shared with the producer; `System` and
/// `Exception` are local additions, hence the gap in the numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum LogType {
    /// Plain informational output.
    Info,
    /// Producer warning.
    Warning,
    /// Producer or relay error.
    Error,
    /// Relay-originated status line.
    System,
    /// Producer exception trace.
    Exception,
    /// Unknown severity; rendered in the `Info` style.
    Other(i64),
}

impl From<i64> for LogType {
    fn from(tag: i64) -> Self {
        match tag {
            0 => Self::Info,
            1 => Self::Warning,
            2 => Self::Error,
            11 => Self::System,
            12 => Self::Exception,
            other => Self::Other(other),
        }
    }
}

impl From<LogType> for i64 {
    fn from(kind: LogType) -> Self {
        match kind {
            LogType::Info => 0,
            LogType::Warning => 1,
            LogType::Error => 2,
            LogType::System => 11,
            LogType::Exception => 12,
            LogType::Other(tag) => tag,
        }
    }
}

fn empty_data() -> Value {
    Value::String(String::new())
}

/// One decoded line of the wire protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record type tag.
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Payload whose meaning depends on `kind`.
    #[serde(default = "empty_data")]
    pub data: Value,
}

impl Record {
    /// Build a record from a tag and payload.
    #[must_use]
    pub fn new(kind: MessageType, data: Value) -> Self {
        Self { kind, data }
    }

    /// Operator input destined for the producer.
    #[must_use]
    pub fn input(text: impl Into<String>) -> Self {
        Self::new(MessageType::Input, Value::String(text.into()))
    }

    /// Disconnect notice carrying a human-readable reason.
    #[must_use]
    pub fn disconnect(reason: impl Into<String>) -> Self {
        Self::new(MessageType::Disconnect, Value::String(reason.into()))
    }

    /// Log record with the entry nested as a JSON string, as producers send it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Encode` if the entry cannot be serialized.
    pub fn log(entry: &LogEntry) -> Result<Self> {
        let nested = serde_json::to_string(entry)
            .map_err(|err| AppError::Encode(format!("log entry: {err}")))?;
        Ok(Self::new(MessageType::Log, Value::String(nested)))
    }

    /// Payload as display text: strings verbatim, anything else as compact JSON.
    #[must_use]
    pub fn data_text(&self) -> String {
        match &self.data {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// Payload of a `Log` (or `WorkerError`) record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Message text.
    pub content: String,
    /// Severity used to pick the style.
    pub log_type: LogType,
    /// Epoch milliseconds; `0` means absent.
    #[serde(default)]
    pub timestamp: i64,
    /// Optional trace rendered on the following line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

impl LogEntry {
    /// Entry without timestamp or trace.
    #[must_use]
    pub fn new(log_type: LogType, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            log_type,
            timestamp: 0,
            stack_trace: None,
        }
    }

    /// Unpack the `data` field of a `Log` record.
    ///
    /// Producers nest the entry as a JSON-encoded string; an inline object is
    /// accepted as well.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Decode` if the payload is neither shape or is
    /// missing required fields.
    pub fn from_payload(data: &Value) -> Result<Self> {
        match data {
            Value::String(nested) => Ok(serde_json::from_str(nested)?),
            Value::Object(_) => Ok(Self::deserialize(data)?),
            other => Err(AppError::Decode(format!(
                "log payload must be a JSON string or object, got {other}"
            ))),
        }
    }
}
