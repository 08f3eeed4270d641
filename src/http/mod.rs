//! HTTP API for driving interview sessions
//!
//! This module provides the REST control surface over the orchestrator:
//! - POST /interviews/start - Create and start a session
//! - POST /interviews/:id/start - Re-attempt a failed start
//! - POST /interviews/:id/context - One-time job-context submission
//! - POST /interviews/:id/record/toggle - Start/stop recording
//! - POST /interviews/:id/retry - Discard the turn and re-record
//! - POST /interviews/:id/submit - Submit the finalized answer
//! - POST /interviews/:id/continue - Next question
//! - POST /interviews/:id/end - End the interview
//! - POST /interviews/:id/audio - Push microphone PCM frames
//! - GET /interviews/:id/status - Session status snapshot
//! - GET /interviews/:id/transcript - Finalized turns + live transcript
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
