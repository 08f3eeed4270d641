use serde::{Deserialize, Serialize};

/// Audio frame message published to the recognizer service
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioFrameMessage {
    pub session_id: String,
    /// Recording turn this frame belongs to
    pub turn: u64,
    pub sequence: u32,
    /// Base64-encoded PCM bytes
    pub pcm: String,
    pub sample_rate: u32,
    pub channels: u16,
    /// RFC3339 timestamp
    pub timestamp: String,
    /// Marks the last frame of a turn
    #[serde(rename = "final")]
    pub final_frame: bool,
}

/// Transcript message received from the recognizer service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub session_id: String,
    /// Recording turn the recognizer was transcribing
    pub turn: u64,
    pub text: String,
    /// True for interim (still-revisable) results
    pub partial: bool,
    pub timestamp: String,
    pub confidence: Option<f32>,
}
