//! Unit tests for the wire model and line encode/decode.

use cli_relay::protocol::codec::{decode_record, encode_record};
use cli_relay::protocol::{LogEntry, LogType, MessageType, Record};
use cli_relay::AppError;
use serde_json::json;

const BOOT_OK: &str = r#"{"type":0,"data":"{\"content\":\"boot ok\",\"logType\":11,\"timestamp\":0,\"stackTrace\":\"\"}"}"#;

#[test]
fn input_record_encodes_as_single_line() {
    let bytes = encode_record(&Record::input("hello")).expect("encode");
    assert_eq!(bytes, b"{\"type\":3,\"data\":\"hello\"}\n");
}

#[test]
fn disconnect_record_carries_reason() {
    let bytes = encode_record(&Record::disconnect("CLI closed")).expect("encode");
    assert_eq!(bytes, b"{\"type\":2,\"data\":\"CLI closed\"}\n");
}

#[test]
fn embedded_newlines_are_escaped() {
    let bytes = encode_record(&Record::input("line one\nline two")).expect("encode");
    let newlines = bytes.iter().filter(|b| **b == b'\n').count();
    assert_eq!(newlines, 1, "only the terminator may be a raw newline");
    assert!(bytes.ends_with(b"\n"));
}

#[test]
fn producer_log_line_decodes() {
    let record = decode_record(BOOT_OK.as_bytes())
        .expect("decode")
        .expect("record present");
    assert_eq!(record.kind, MessageType::Log);

    let entry = LogEntry::from_payload(&record.data).expect("log payload");
    assert_eq!(entry.content, "boot ok");
    assert_eq!(entry.log_type, LogType::System);
    assert_eq!(entry.timestamp, 0);
    assert_eq!(entry.stack_trace.as_deref(), Some(""));
}

#[test]
fn decode_reverses_encode() {
    let records = [
        Record::input("hello"),
        Record::disconnect("bye"),
        Record::new(MessageType::Handshake, json!({"deviceId": "dev-01"})),
        Record::new(MessageType::WorkerError, json!("worker died")),
        Record::new(MessageType::Unknown(42), json!("?")),
        Record::log(&LogEntry::new(LogType::Warning, "careful")).expect("log"),
    ];
    for record in records {
        let bytes = encode_record(&record).expect("encode");
        let decoded = decode_record(&bytes).expect("decode").expect("record");
        assert_eq!(decoded, record);
    }
}

#[test]
fn blank_lines_decode_to_nothing() {
    assert!(decode_record(b"").expect("empty").is_none());
    assert!(decode_record(b"   \t ").expect("whitespace").is_none());
    assert!(decode_record(b"\r").expect("bare cr").is_none());
}

#[test]
fn surrounding_whitespace_is_ignored() {
    let record = decode_record(b"  {\"type\":1,\"data\":\"hi\"}\r")
        .expect("decode")
        .expect("record");
    assert_eq!(record.kind, MessageType::Handshake);
}

#[test]
fn malformed_json_is_a_decode_error() {
    let err = decode_record(b"{not json").expect_err("must fail");
    assert!(matches!(err, AppError::Decode(_)), "got {err:?}");
}

#[test]
fn invalid_utf8_is_a_decode_error() {
    let err = decode_record(&[0xff, 0xfe, b'{']).expect_err("must fail");
    assert!(matches!(err, AppError::Decode(_)), "got {err:?}");
}

#[test]
fn missing_data_defaults_to_empty_string() {
    let record = decode_record(b"{\"type\":2}").expect("decode").expect("record");
    assert_eq!(record.data_text(), "");
}

#[test]
fn unknown_type_tag_is_preserved() {
    let record = decode_record(b"{\"type\":99,\"data\":\"x\"}")
        .expect("decode")
        .expect("record");
    assert_eq!(record.kind, MessageType::Unknown(99));
    assert_eq!(i64::from(record.kind), 99);
}

#[test]
fn log_type_numbering_has_a_gap() {
    assert_eq!(LogType::from(0), LogType::Info);
    assert_eq!(LogType::from(1), LogType::Warning);
    assert_eq!(LogType::from(2), LogType::Error);
    assert_eq!(LogType::from(11), LogType::System);
    assert_eq!(LogType::from(12), LogType::Exception);
    assert_eq!(LogType::from(5), LogType::Other(5));
    assert_eq!(i64::from(LogType::Exception), 12);
}

#[test]
fn log_record_nests_entry_as_string() {
    let mut entry = LogEntry::new(LogType::Error, "oops");
    entry.timestamp = 1_700_000_000_000;
    entry.stack_trace = Some("at foo()".into());

    let record = Record::log(&entry).expect("log");
    assert!(record.data.is_string(), "Log data is a JSON-encoded string");
    assert_eq!(LogEntry::from_payload(&record.data).expect("unpack"), entry);
}

#[test]
fn log_payload_accepts_inline_object() {
    let data = json!({"content": "inline", "logType": 1});
    let entry = LogEntry::from_payload(&data).expect("unpack");
    assert_eq!(entry.content, "inline");
    assert_eq!(entry.log_type, LogType::Warning);
    assert_eq!(entry.timestamp, 0);
    assert_eq!(entry.stack_trace, None);
}

#[test]
fn log_payload_rejects_other_shapes() {
    assert!(LogEntry::from_payload(&json!(17)).is_err());
    assert!(LogEntry::from_payload(&json!("{\"logType\":0}")).is_err());
    assert!(LogEntry::from_payload(&json!("not json")).is_err());
}

#[test]
fn data_text_renders_objects_as_json() {
    let record = Record::new(MessageType::Handshake, json!({"platform": "Linux"}));
    assert_eq!(record.data_text(), r#"{"platform":"Linux"}"#);
}
