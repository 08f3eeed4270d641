//! External collaborator interfaces
//!
//! Question generation and answer evaluation live in a remote scoring
//! service. The phase controller only sees these traits; the NATS
//! request/reply implementations are in `nats.rs`.

pub mod nats;

use serde::{Deserialize, Serialize};

pub use nats::{NatsAnswerService, NatsQuestionService};

/// An interview question, fetched lazily one at a time.
///
/// Immutable once fetched; each subsequent fetch supersedes (never merges
/// with) the previous question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// 1-based ordinal within the session
    pub number: u32,
    pub text: String,
}

/// Context for the next-question request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRequest {
    pub session_id: String,
    pub persona: String,
    pub difficulty: String,
    pub mode: String,
    pub job_context: String,
    pub prior_question_count: u32,
}

/// Outbound answer payload; not retained locally beyond the current turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub session_id: String,
    pub question_number: u32,
    pub question_text: String,
    pub transcript: String,
    pub duration_ms: u64,
    pub confidence: Option<f32>,
}

/// Score/feedback payload returned by the answer service (opaque here)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerFeedback {
    pub question_number: u32,
    #[serde(default)]
    pub feedback: serde_json::Value,
}

/// Produces the next interview question.
///
/// `None` signals "no more questions" and ends the session.
#[async_trait::async_trait]
pub trait QuestionService: Send + Sync {
    async fn next_question(&self, request: &QuestionRequest) -> anyhow::Result<Option<Question>>;
}

/// Persists/evaluates a submitted answer.
#[async_trait::async_trait]
pub trait AnswerService: Send + Sync {
    async fn submit_answer(&self, submission: &AnswerSubmission)
        -> anyhow::Result<AnswerFeedback>;
}
