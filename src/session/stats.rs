use crate::media::MediaState;
use crate::phase::PhaseSnapshot;
use crate::timer::TimerState;
use crate::transcript::TurnTranscript;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Point-in-time view of one interview session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub session_id: String,

    /// When the session object was created
    pub created_at: DateTime<Utc>,

    pub phase: PhaseSnapshot,
    pub timer: TimerState,
    pub media: MediaState,
}

/// Transcript view: finalized turns plus the live in-progress value
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptView {
    pub turns: Vec<TurnTranscript>,

    /// Current accumulated + interim text for the open turn
    pub live: String,
}
