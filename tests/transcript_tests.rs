// Unit tests for the transcript accumulator
//
// These tests verify the interim/final merge semantics: interims replace,
// finals append space-separated, and turn finalization promotes a dangling
// interim so no answer is silently empty.

use intervo::transcript::TranscriptAccumulator;

#[test]
fn test_interim_then_final_yields_final_text() {
    let mut acc = TranscriptAccumulator::new();

    // Recognizers revise interims many times before the stable result
    acc.on_interim("hel");
    acc.on_interim("hello wor");
    acc.on_interim("hello world");
    acc.on_final("hello world");

    assert_eq!(acc.current_value(), "hello world");
}

#[test]
fn test_no_leakage_between_turns() {
    let mut acc = TranscriptAccumulator::new();

    acc.on_interim("hel");
    acc.on_interim("hello world");
    acc.on_final("hello world");
    acc.finalize_turn(1);

    // Second turn starts from a clean slate
    acc.reset();
    acc.on_final("yes");

    assert_eq!(acc.current_value(), "yes", "no leakage from turn one");
}

#[test]
fn test_reset_always_yields_empty() {
    let mut acc = TranscriptAccumulator::new();

    acc.on_final("some earlier content");
    acc.on_interim("and a pending interim");
    acc.reset();

    assert_eq!(acc.current_value(), "");

    // Idempotent
    acc.reset();
    assert_eq!(acc.current_value(), "");
}

#[test]
fn test_final_segments_concatenate_space_separated() {
    let mut acc = TranscriptAccumulator::new();

    acc.on_interim("I started");
    acc.on_final("I started my career");
    acc.on_interim("in embed");
    acc.on_final("in embedded systems");
    acc.on_final("then moved to backend work");

    assert_eq!(
        acc.current_value(),
        "I started my career in embedded systems then moved to backend work",
        "all final segments, space-separated, no duplicates or drops"
    );
}

#[test]
fn test_current_value_includes_pending_interim() {
    let mut acc = TranscriptAccumulator::new();

    acc.on_final("the confirmed part");
    acc.on_interim("plus a guess");

    assert_eq!(acc.current_value(), "the confirmed part plus a guess");

    // The next final supersedes the interim rather than stacking on it
    acc.on_final("plus the stable version");
    assert_eq!(
        acc.current_value(),
        "the confirmed part plus the stable version"
    );
}

#[test]
fn test_empty_final_segments_leave_no_double_spaces() {
    let mut acc = TranscriptAccumulator::new();

    acc.on_final("left");
    acc.on_final("");
    acc.on_final("  ");
    acc.on_final("right");

    assert_eq!(acc.current_value(), "left right");
    assert!(!acc.current_value().contains("  "));
}

#[test]
fn test_finalize_promotes_dangling_interim() {
    let mut acc = TranscriptAccumulator::new();

    // The recognizer never confirmed the last segment
    acc.on_interim("my answer never got a final event");

    let turn = acc.finalize_turn(3);

    assert_eq!(turn.text, "my answer never got a final event");
    assert_eq!(turn.question_number, 3);
    assert_eq!(acc.current_value(), "", "working buffers reset");
    assert_eq!(acc.turns().len(), 1);
}

#[test]
fn test_finalize_with_no_events_records_empty_turn() {
    let mut acc = TranscriptAccumulator::new();

    let turn = acc.finalize_turn(1);

    assert_eq!(turn.text, "");
    assert_eq!(acc.turns().len(), 1);
}

#[test]
fn test_discard_last_turn() {
    let mut acc = TranscriptAccumulator::new();

    acc.on_final("first answer");
    acc.finalize_turn(1);

    acc.reset();
    acc.on_final("second answer, to be retried");
    acc.finalize_turn(2);

    let discarded = acc.discard_last_turn().unwrap();
    assert_eq!(discarded.text, "second answer, to be retried");

    assert_eq!(acc.turns().len(), 1);
    assert_eq!(acc.turns()[0].text, "first answer");
}
