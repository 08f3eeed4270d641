use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A finalized answer transcript for one completed turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnTranscript {
    /// Question ordinal this answer belongs to (1-based)
    pub question_number: u32,

    /// The complete answer text
    pub text: String,

    /// When the turn was finalized
    pub finalized_at: DateTime<Utc>,
}

/// Merges interim/final recognition events into one answer string per turn.
///
/// Interim events replace the scratch buffer; final events append to the
/// accumulated answer. The recognizer delivers events in emission order and
/// the accumulator preserves that order.
#[derive(Debug, Default)]
pub struct TranscriptAccumulator {
    /// Text confirmed by final recognition events for the open turn
    accumulated: String,

    /// Most recent interim (still-revisable) text, not yet confirmed
    interim: String,

    /// Finalized transcripts for completed turns, in turn order
    turns: Vec<TurnTranscript>,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the working buffers for a fresh recording turn.
    ///
    /// Idempotent; finalized turns from earlier turns are kept.
    pub fn reset(&mut self) {
        self.accumulated.clear();
        self.interim.clear();
    }

    /// Replace the interim buffer with the recognizer's latest guess.
    ///
    /// Safe to call at high frequency; each call supersedes the last.
    pub fn on_interim(&mut self, text: &str) {
        self.interim.clear();
        self.interim.push_str(text);
    }

    /// Append a stable segment to the accumulated answer and clear the
    /// interim buffer. Returns the new accumulated value.
    ///
    /// Empty or whitespace-only segments are ignored so the answer never
    /// picks up stray separator spaces.
    pub fn on_final(&mut self, segment: &str) -> String {
        self.interim.clear();

        let segment = segment.trim();
        if segment.is_empty() {
            return self.accumulated.clone();
        }

        if !self.accumulated.is_empty() {
            self.accumulated.push(' ');
        }
        self.accumulated.push_str(segment);

        self.accumulated.clone()
    }

    /// The best current answer text: accumulated finals, plus the pending
    /// interim when one exists.
    pub fn current_value(&self) -> String {
        if self.interim.is_empty() {
            return self.accumulated.clone();
        }

        if self.accumulated.is_empty() {
            return self.interim.clone();
        }

        format!("{} {}", self.accumulated, self.interim)
    }

    /// True when neither finals nor an interim have been seen this turn.
    pub fn is_empty(&self) -> bool {
        self.accumulated.is_empty() && self.interim.is_empty()
    }

    /// Close the open turn: promote a dangling interim to final (so an
    /// answer whose recognizer never confirmed its last segment is not
    /// silently empty), record the finalized transcript, and reset the
    /// working buffers.
    pub fn finalize_turn(&mut self, question_number: u32) -> TurnTranscript {
        if !self.interim.is_empty() {
            debug!("promoting dangling interim to final: {:?}", self.interim);
            let interim = std::mem::take(&mut self.interim);
            self.on_final(&interim);
        }

        let turn = TurnTranscript {
            question_number,
            text: std::mem::take(&mut self.accumulated),
            finalized_at: Utc::now(),
        };

        self.turns.push(turn.clone());
        self.interim.clear();

        turn
    }

    /// Discard the most recently finalized turn (the Retry path).
    pub fn discard_last_turn(&mut self) -> Option<TurnTranscript> {
        self.turns.pop()
    }

    /// Finalized transcripts for completed turns, in turn order.
    pub fn turns(&self) -> &[TurnTranscript] {
        &self.turns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interim_replaces_not_appends() {
        let mut acc = TranscriptAccumulator::new();

        acc.on_interim("hel");
        acc.on_interim("hello wor");
        acc.on_interim("hello world");

        assert_eq!(acc.current_value(), "hello world");
    }

    #[test]
    fn test_final_appends_with_single_space() {
        let mut acc = TranscriptAccumulator::new();

        acc.on_final("hello world");
        acc.on_final("this is me");

        assert_eq!(acc.current_value(), "hello world this is me");
    }

    #[test]
    fn test_empty_final_segments_ignored() {
        let mut acc = TranscriptAccumulator::new();

        acc.on_final("hello");
        acc.on_final("");
        acc.on_final("   ");
        acc.on_final("world");

        assert_eq!(acc.current_value(), "hello world");
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut acc = TranscriptAccumulator::new();

        acc.on_final("something");
        acc.reset();
        acc.reset();

        assert_eq!(acc.current_value(), "");
    }

    #[test]
    fn test_finalize_promotes_dangling_interim() {
        let mut acc = TranscriptAccumulator::new();

        acc.on_final("the first part");
        acc.on_interim("and the rest");

        let turn = acc.finalize_turn(1);
        assert_eq!(turn.text, "the first part and the rest");
        assert_eq!(acc.current_value(), "", "buffers reset after finalize");
    }
}
