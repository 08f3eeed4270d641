use serde::{Deserialize, Serialize};

/// Configuration for one interview session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "interview-2026-08-07-uuid")
    pub session_id: String,

    /// Interviewer persona/category (e.g., "behavioral", "systems-design")
    pub persona: String,

    /// Question difficulty ("easy", "medium", "hard")
    pub difficulty: String,

    /// Session mode; bounded modes carry a time budget in the mode table
    /// ("5min", "15min", "30min"), anything else runs unbounded
    pub mode: String,

    /// Job description / role context the questions are grounded in.
    /// When absent at start, the session blocks until it is supplied.
    pub job_context: Option<String>,

    /// NATS server URL
    pub nats_url: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("interview-{}", uuid::Uuid::new_v4()),
            persona: "behavioral".to_string(),
            difficulty: "medium".to_string(),
            mode: "15min".to_string(),
            job_context: None,
            nats_url: "nats://localhost:4222".to_string(),
        }
    }
}
