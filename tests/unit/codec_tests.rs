//! Unit tests for `RecordCodec` line framing.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use cli_relay::protocol::codec::{Frame, RecordCodec, MAX_LINE_BYTES};
use cli_relay::protocol::Record;

fn line(text: &str) -> Frame {
    Frame::Line(Bytes::copy_from_slice(text.as_bytes()))
}

#[test]
fn default_limit_is_one_mebibyte() {
    assert_eq!(RecordCodec::default().max_length(), MAX_LINE_BYTES);
}

#[test]
fn single_line_is_returned_without_newline() {
    let mut codec = RecordCodec::default();
    let mut buf = BytesMut::from("{\"type\":1}\n");
    assert_eq!(codec.decode(&mut buf).expect("decode"), Some(line("{\"type\":1}")));
    assert!(buf.is_empty());
}

#[test]
fn batched_lines_are_split() {
    let mut codec = RecordCodec::default();
    let mut buf = BytesMut::from("first\nsecond\n");
    assert_eq!(codec.decode(&mut buf).expect("1"), Some(line("first")));
    assert_eq!(codec.decode(&mut buf).expect("2"), Some(line("second")));
    assert_eq!(codec.decode(&mut buf).expect("3"), None);
}

#[test]
fn partial_line_waits_for_newline() {
    let mut codec = RecordCodec::default();
    let mut buf = BytesMut::from("{\"type\":");
    assert_eq!(codec.decode(&mut buf).expect("partial"), None);

    buf.extend_from_slice(b"2}\n");
    assert_eq!(codec.decode(&mut buf).expect("complete"), Some(line("{\"type\":2}")));
}

#[test]
fn oversized_line_is_discarded_and_next_line_survives() {
    let mut codec = RecordCodec::new(16);
    let mut buf = BytesMut::from("aaaaaaaaaaaaaaaaaaaaaaaa\n{\"type\":2}\n");

    assert_eq!(codec.decode(&mut buf).expect("oversized"), Some(Frame::Oversized));
    assert_eq!(codec.decode(&mut buf).expect("next"), Some(line("{\"type\":2}")));
}

#[test]
fn oversized_line_split_across_reads() {
    let mut codec = RecordCodec::new(8);
    let mut buf = BytesMut::from("0123456789abcdef");
    assert_eq!(codec.decode(&mut buf).expect("discarding"), None);

    buf.extend_from_slice(b"tail\nok\n");
    assert_eq!(codec.decode(&mut buf).expect("end of long"), Some(Frame::Oversized));
    assert_eq!(codec.decode(&mut buf).expect("ok"), Some(line("ok")));
}

#[test]
fn invalid_utf8_is_still_framed() {
    let mut codec = RecordCodec::default();
    let mut buf = BytesMut::from(&[0xff, 0xfe, b'\n'][..]);
    assert_eq!(
        codec.decode(&mut buf).expect("framing ignores encoding"),
        Some(Frame::Line(Bytes::from_static(&[0xff, 0xfe])))
    );
}

#[test]
fn unterminated_tail_is_flushed_at_eof() {
    let mut codec = RecordCodec::default();
    let mut buf = BytesMut::from("last");
    assert_eq!(codec.decode_eof(&mut buf).expect("eof"), Some(line("last")));
    assert_eq!(codec.decode_eof(&mut buf).expect("drained"), None);
}

#[test]
fn encoder_appends_one_newline() {
    let mut codec = RecordCodec::default();
    let mut dst = BytesMut::new();
    codec
        .encode(Record::input("hello"), &mut dst)
        .expect("encode");
    assert_eq!(&dst[..], b"{\"type\":3,\"data\":\"hello\"}\n");
}
