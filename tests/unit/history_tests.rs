//! Unit tests for the bounded input history.

use cli_relay::terminal::InputHistory;

#[test]
fn keeps_most_recent_lines() {
    let mut history = InputHistory::new(2);
    history.push("one");
    history.push("two");
    history.push("three");
    assert_eq!(history.entries(), vec!["two", "three"]);
    assert_eq!(history.get(0), Some("two"));
    assert_eq!(history.len(), 2);
}

#[test]
fn zero_limit_keeps_nothing() {
    let mut history = InputHistory::new(0);
    history.push("one");
    assert!(history.is_empty());
}

#[test]
fn empty_lines_and_immediate_repeats_are_not_recorded() {
    let mut history = InputHistory::new(8);
    history.push("");
    history.push("@clear");
    history.push("@clear");
    history.push("hello");
    history.push("@clear");
    assert_eq!(history.entries(), vec!["@clear", "hello", "@clear"]);
}
