use crate::config::Config;
use crate::session::InterviewSession;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Service configuration shared by all sessions
    pub config: Arc<Config>,

    /// Active interview sessions (session_id → session)
    pub sessions: Arc<RwLock<HashMap<String, Arc<InterviewSession>>>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}
