//! Per-record routing of inbound producer traffic.
//!
//! | Type          | Action                                           |
//! |---------------|--------------------------------------------------|
//! | `Log`         | unpack [`LogEntry`], render with its severity    |
//! | `WorkerError` | same as `Log`                                    |
//! | `Handshake`   | System line `Handshake: <data>`                  |
//! | `Disconnect`  | System line, then end the read loop              |
//! | `Input`       | System line; only the relay sends this type      |
//! | unknown       | System line naming the tag                       |
//!
//! Every failure here is contained at the line boundary: it is rendered as an
//! Error line and the caller keeps reading.

use tracing::debug;

use crate::protocol::codec::{decode_record, Frame};
use crate::protocol::{LogEntry, MessageType, Record};
use crate::terminal::TerminalSink;

/// What the read loop does after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Keep reading.
    Continue,
    /// The peer announced it is leaving; stop reading.
    Disconnect,
}

/// Decode and dispatch one framed line.
pub fn dispatch_frame(frame: &Frame, sink: &TerminalSink) -> DispatchOutcome {
    let line = match frame {
        Frame::Line(line) => line,
        Frame::Oversized => {
            sink.error("Processing message: line exceeds the maximum length, discarded");
            return DispatchOutcome::Continue;
        }
    };
    match decode_record(line) {
        Ok(Some(record)) => dispatch(&record, sink),
        Ok(None) => DispatchOutcome::Continue,
        Err(err) => {
            sink.error(&format!("Invalid JSON received ({err})"));
            DispatchOutcome::Continue
        }
    }
}

/// Route one decoded record.
pub fn dispatch(record: &Record, sink: &TerminalSink) -> DispatchOutcome {
    debug!(kind = ?record.kind, "dispatching record");
    match record.kind {
        MessageType::Log | MessageType::WorkerError => {
            match LogEntry::from_payload(&record.data) {
                Ok(entry) => sink.render_entry(&entry),
                Err(err) => sink.error(&format!(
                    "unpack log failed: {err}. Data: {}",
                    record.data_text()
                )),
            }
            DispatchOutcome::Continue
        }
        MessageType::Handshake => {
            sink.system(&format!("Handshake: {}", record.data_text()));
            DispatchOutcome::Continue
        }
        MessageType::Disconnect => {
            sink.system(&format!("Disconnect received: {}", record.data_text()));
            DispatchOutcome::Disconnect
        }
        MessageType::Input => {
            sink.system("Invalid packet type: Input is relay-to-producer only");
            DispatchOutcome::Continue
        }
        MessageType::Unknown(tag) => {
            sink.system(&format!("Invalid packet type: {tag}"));
            DispatchOutcome::Continue
        }
    }
}
