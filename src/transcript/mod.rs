//! Per-turn transcript accumulation
//!
//! The speech recognizer emits many transient "interim" events before each
//! stable "final" event. This module merges that stream into one
//! authoritative answer string per turn:
//! - Interim events replace a scratch buffer (no concatenation)
//! - Final events append to the accumulated answer
//! - A dangling interim is promoted to final when the turn closes

mod accumulator;

pub use accumulator::{TranscriptAccumulator, TurnTranscript};
