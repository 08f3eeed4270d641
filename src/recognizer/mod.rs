//! Streaming speech recognition client
//!
//! Owns the microphone while a recording turn is open, pumps PCM frames to
//! the recognizer service, and feeds the transcript accumulator with
//! interim/final events for the current turn. Events tagged with a stale
//! turn id are dropped before they reach the accumulator.

mod client;

pub use client::{NatsRecognizer, SpeechRecognizer, TurnAudioStats};
