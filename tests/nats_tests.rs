// Tests for the NATS wire message shapes

use base64::Engine;
use intervo::nats::messages::{AudioFrameMessage, TranscriptMessage};

#[test]
fn test_audio_frame_serialization() {
    let msg = AudioFrameMessage {
        session_id: "interview-test".to_string(),
        turn: 2,
        sequence: 0,
        pcm: base64::engine::general_purpose::STANDARD.encode([0u8; 100]),
        sample_rate: 16000,
        channels: 1,
        timestamp: "2026-08-07T14:30:00Z".to_string(),
        final_frame: false,
    };

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("interview-test"));
    assert!(json.contains("16000"));
    assert!(json.contains("\"final\":false"));
    assert!(json.contains("\"turn\":2"));

    let deserialized: AudioFrameMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.session_id, "interview-test");
    assert_eq!(deserialized.turn, 2);
    assert_eq!(deserialized.sequence, 0);
    assert_eq!(deserialized.sample_rate, 16000);
    assert!(!deserialized.final_frame);
}

#[test]
fn test_audio_frame_final_marker() {
    let msg = AudioFrameMessage {
        session_id: "interview-test".to_string(),
        turn: 1,
        sequence: 42,
        pcm: String::new(), // Empty for the final marker
        sample_rate: 16000,
        channels: 1,
        timestamp: "2026-08-07T14:30:00Z".to_string(),
        final_frame: true,
    };

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"final\":true"));

    let deserialized: AudioFrameMessage = serde_json::from_str(&json).unwrap();
    assert!(deserialized.final_frame);
    assert!(deserialized.pcm.is_empty());
}

#[test]
fn test_transcript_message_parse() {
    let json = r#"{
        "session_id": "interview-test",
        "turn": 3,
        "text": "hello world",
        "partial": true,
        "timestamp": "2026-08-07T14:30:01Z",
        "confidence": null
    }"#;

    let msg: TranscriptMessage = serde_json::from_str(json).unwrap();
    assert_eq!(msg.session_id, "interview-test");
    assert_eq!(msg.turn, 3);
    assert_eq!(msg.text, "hello world");
    assert!(msg.partial);
    assert_eq!(msg.confidence, None);
}

#[test]
fn test_transcript_message_with_confidence() {
    let json = r#"{
        "session_id": "interview-test",
        "turn": 3,
        "text": "hello world",
        "partial": false,
        "timestamp": "2026-08-07T14:30:02Z",
        "confidence": 0.875
    }"#;

    let msg: TranscriptMessage = serde_json::from_str(json).unwrap();
    assert!(!msg.partial);
    assert_eq!(msg.confidence, Some(0.875));
}
