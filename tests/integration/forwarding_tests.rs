//! Producer-to-terminal rendering and operator-to-producer forwarding over
//! a live loopback connection.

use super::test_helpers::Harness;

#[tokio::test]
async fn log_records_render_in_arrival_order() {
    let harness = Harness::start().await;
    let mut producer = harness.connect().await;

    for content in ["first", "second", "third"] {
        producer.send_system_log(content).await;
    }
    let output = harness.wait_for_output("third").await;

    let first = output.find("first\n").expect("first rendered");
    let second = output.find("second\n").expect("second rendered");
    let third = output.find("third\n").expect("third rendered");
    assert!(first < second && second < third, "out of order:\n{output}");
}

#[tokio::test]
async fn malformed_line_does_not_drop_the_connection() {
    let harness = Harness::start().await;
    let mut producer = harness.connect().await;

    producer.send_line("{not json").await;
    producer.send_line(r#"{"type":0,"data":"{\"content\":1}"}"#).await;
    producer.send_system_log("still here").await;

    let output = harness.wait_for_output("still here").await;
    assert!(output.contains("Invalid JSON received"), "{output}");
    assert!(output.contains("unpack log failed:"), "{output}");
    assert!(harness.guard.peer().await.is_some());
}

#[tokio::test]
async fn operator_line_is_forwarded_as_input_record() {
    let harness = Harness::start().await;
    let mut producer = harness.connect().await;

    harness.type_line("hello").await;
    assert_eq!(
        producer.read_line().await.as_deref(),
        Some(r#"{"type":3,"data":"hello"}"#)
    );
}

#[tokio::test]
async fn input_is_forwarded_verbatim() {
    let harness = Harness::start().await;
    let mut producer = harness.connect().await;

    harness.type_line("  spawn \"enemy\" 3").await;
    assert_eq!(
        producer.read_line().await.as_deref(),
        Some(r#"{"type":3,"data":"  spawn \"enemy\" 3"}"#)
    );
}

#[tokio::test]
async fn local_commands_are_not_forwarded() {
    let harness = Harness::start().await;
    let mut producer = harness.connect().await;

    harness.type_line("@clear").await;
    harness.type_line("@bogus").await;
    harness.type_line("").await;
    harness.type_line("after").await;

    assert_eq!(
        producer.read_line().await.as_deref(),
        Some(r#"{"type":3,"data":"after"}"#)
    );
    harness.wait_for_output("Unknown command: '@bogus'").await;
}

#[tokio::test]
async fn whitespace_only_input_is_forwarded() {
    let harness = Harness::start().await;
    let mut producer = harness.connect().await;

    harness.type_line("   ").await;
    harness.type_line("\t").await;
    assert_eq!(
        producer.read_line().await.as_deref(),
        Some(r#"{"type":3,"data":"   "}"#)
    );
    assert_eq!(
        producer.read_line().await.as_deref(),
        Some(r#"{"type":3,"data":"\t"}"#)
    );
}

#[tokio::test]
async fn input_without_peer_reports_no_connection() {
    let harness = Harness::start().await;

    harness.type_line("anyone there").await;
    harness.wait_for_output("No connection to producer.").await;
    assert!(harness.guard.snapshot().await.is_idle());
}
