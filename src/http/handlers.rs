use super::state::AppState;
use crate::audio::AudioFrame;
use crate::session::{InterviewSession, SessionConfig, SessionStats};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartInterviewRequest {
    /// Optional session ID (if not provided, generate UUID)
    pub session_id: Option<String>,

    /// Interviewer persona (default: "behavioral")
    pub persona: Option<String>,

    /// Question difficulty (default: "medium")
    pub difficulty: Option<String>,

    /// Session mode (default: "15min"; unknown modes run unbounded)
    pub mode: Option<String>,

    /// Job/role context; sessions without it block until supplied
    pub job_context: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartInterviewResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct JobContextRequest {
    pub job_context: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct SubmitRequest {
    /// Typed answer for the manual-entry path; omitted for recorded answers
    pub transcript: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AudioFrameRequest {
    /// Base64-encoded i16 little-endian PCM
    pub pcm: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub timestamp_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct EndInterviewResponse {
    pub session_id: String,
    pub status: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

async fn session_or_404(state: &AppState, session_id: &str) -> Result<Arc<InterviewSession>, Response> {
    let sessions = state.sessions.read().await;

    sessions.get(session_id).cloned().ok_or_else(|| {
        error_response(
            StatusCode::NOT_FOUND,
            format!("Interview {} not found", session_id),
        )
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /interviews/start
/// Create a new interview session and run the start sequence
pub async fn start_interview(
    State(state): State<AppState>,
    Json(req): Json<StartInterviewRequest>,
) -> impl IntoResponse {
    let session_id = req
        .session_id
        .unwrap_or_else(|| format!("interview-{}", uuid::Uuid::new_v4()));

    info!("Starting interview session: {}", session_id);

    // Check for an existing session with the same id
    {
        let sessions = state.sessions.read().await;
        if sessions.contains_key(&session_id) {
            return error_response(
                StatusCode::CONFLICT,
                format!("Interview {} already exists", session_id),
            );
        }
    }

    let config = SessionConfig {
        session_id: session_id.clone(),
        persona: req.persona.unwrap_or_else(|| "behavioral".to_string()),
        difficulty: req.difficulty.unwrap_or_else(|| "medium".to_string()),
        mode: req.mode.unwrap_or_else(|| "15min".to_string()),
        job_context: req.job_context,
        nats_url: state.config.nats.url.clone(),
    };

    let session = match InterviewSession::new(&state.config, config).await {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("Failed to create session: {:#}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to create session: {:#}", e),
            );
        }
    };

    // Register before starting so a failed start can be re-attempted
    // through POST /interviews/:id/start.
    {
        let mut sessions = state.sessions.write().await;
        sessions.insert(session_id.clone(), Arc::clone(&session));
    }

    if let Err(e) = session.start().await {
        error!("Failed to start interview {}: {:#}", session_id, e);
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to start interview: {:#}", e),
        );
    }

    info!("Interview started: {}", session_id);

    (
        StatusCode::OK,
        Json(StartInterviewResponse {
            session_id: session_id.clone(),
            status: "started".to_string(),
            message: format!("Interview {} started", session_id),
        }),
    )
        .into_response()
}

/// POST /interviews/:id/start
/// Re-attempt the start sequence after a surfaced connectivity failure
pub async fn restart_interview(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let session = match session_or_404(&state, &session_id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match session.start().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ActionResponse {
                session_id,
                status: "started".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to start interview {}: {:#}", session_id, e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to start interview: {:#}", e),
            )
        }
    }
}

/// POST /interviews/:id/context
/// One-time job-context submission
pub async fn set_job_context(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<JobContextRequest>,
) -> impl IntoResponse {
    let session = match session_or_404(&state, &session_id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match session.set_job_context(&req.job_context).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ActionResponse {
                session_id,
                status: "context_set".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::CONFLICT, format!("{:#}", e)),
    }
}

/// POST /interviews/:id/record/toggle
/// Start recording in Listening; stop while a recording is open
pub async fn record_toggle(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let session = match session_or_404(&state, &session_id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match session.record_toggle().await {
        Ok(()) => {
            let recording = session.stats().await.phase.recording;
            (
                StatusCode::OK,
                Json(ActionResponse {
                    session_id,
                    status: if recording { "recording" } else { "stopped" }.to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => error_response(StatusCode::CONFLICT, format!("{:#}", e)),
    }
}

/// POST /interviews/:id/retry
/// Discard the current turn and return to a clean Listening state
pub async fn retry_turn(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let session = match session_or_404(&state, &session_id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match session.retry().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ActionResponse {
                session_id,
                status: "listening".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::CONFLICT, format!("{:#}", e)),
    }
}

/// POST /interviews/:id/submit
/// Submit the finalized answer; a typed transcript takes the manual path
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Option<Json<SubmitRequest>>,
) -> impl IntoResponse {
    let session = match session_or_404(&state, &session_id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let req = body.map(|Json(r)| r).unwrap_or_default();

    match session.submit(req.transcript.as_deref()).await {
        Ok(feedback) => (StatusCode::OK, Json(feedback)).into_response(),
        Err(e) => {
            error!("Answer submission failed for {}: {:#}", session_id, e);
            error_response(StatusCode::BAD_GATEWAY, format!("{:#}", e))
        }
    }
}

/// POST /interviews/:id/continue
/// Move on to the next question
pub async fn continue_interview(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let session = match session_or_404(&state, &session_id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match session.continue_session().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ActionResponse {
                session_id,
                status: "continued".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::CONFLICT, format!("{:#}", e)),
    }
}

/// POST /interviews/:id/end
/// End the interview and release its resources
pub async fn end_interview(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    info!("Ending interview: {}", session_id);

    let session = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&session_id)
    };

    match session {
        Some(session) => {
            session.end().await;
            let stats = session.stats().await;

            (
                StatusCode::OK,
                Json(EndInterviewResponse {
                    session_id,
                    status: "ended".to_string(),
                    stats,
                }),
            )
                .into_response()
        }
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Interview {} not found", session_id),
        ),
    }
}

/// POST /interviews/:id/audio
/// Push one microphone PCM frame into the recognizer's capture stream
pub async fn push_audio(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<AudioFrameRequest>,
) -> impl IntoResponse {
    let session = match session_or_404(&state, &session_id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let pcm_bytes = match base64::engine::general_purpose::STANDARD.decode(&req.pcm) {
        Ok(bytes) => bytes,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid base64 PCM payload: {}", e),
            )
        }
    };

    let samples: Vec<i16> = pcm_bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();

    let frame = AudioFrame {
        samples,
        sample_rate: req.sample_rate,
        channels: req.channels,
        timestamp_ms: req.timestamp_ms,
    };

    match session.feed_audio(frame).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => error_response(StatusCode::CONFLICT, format!("{:#}", e)),
    }
}

/// GET /interviews/:id/status
/// Session status snapshot: phase, timer, media state, question
pub async fn get_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let session = match session_or_404(&state, &session_id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    (StatusCode::OK, Json(session.stats().await)).into_response()
}

/// GET /interviews/:id/transcript
/// Finalized turns plus the live in-progress transcript
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let session = match session_or_404(&state, &session_id).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    (StatusCode::OK, Json(session.transcript().await)).into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
