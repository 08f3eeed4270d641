use super::{
    AnswerFeedback, AnswerService, AnswerSubmission, Question, QuestionRequest, QuestionService,
};
use crate::nats::NatsClient;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const QUESTION_SUBJECT: &str = "interview.question.next";
const ANSWER_SUBJECT: &str = "interview.answer.submit";

/// Reply shape for the question service; an absent question signals
/// "no more questions."
#[derive(Debug, Deserialize)]
struct QuestionReply {
    question: Option<Question>,
}

/// Question service over NATS request/reply
pub struct NatsQuestionService {
    nats: Arc<NatsClient>,
    timeout: Duration,
}

impl NatsQuestionService {
    pub fn new(nats: Arc<NatsClient>, timeout: Duration) -> Self {
        Self { nats, timeout }
    }
}

#[async_trait::async_trait]
impl QuestionService for NatsQuestionService {
    async fn next_question(&self, request: &QuestionRequest) -> Result<Option<Question>> {
        debug!(
            "Requesting question {} for session {}",
            request.prior_question_count + 1,
            request.session_id
        );

        let reply: QuestionReply = self
            .nats
            .request_json(QUESTION_SUBJECT, request, self.timeout)
            .await
            .context("Question service request failed")?;

        match &reply.question {
            Some(q) => info!("Received question {}: {:?}", q.number, q.text),
            None => info!("Question service signalled end of questions"),
        }

        Ok(reply.question)
    }
}

/// Answer service over NATS request/reply
pub struct NatsAnswerService {
    nats: Arc<NatsClient>,
    timeout: Duration,
}

impl NatsAnswerService {
    pub fn new(nats: Arc<NatsClient>, timeout: Duration) -> Self {
        Self { nats, timeout }
    }
}

#[async_trait::async_trait]
impl AnswerService for NatsAnswerService {
    async fn submit_answer(&self, submission: &AnswerSubmission) -> Result<AnswerFeedback> {
        info!(
            "Submitting answer for question {} ({} chars, {}ms)",
            submission.question_number,
            submission.transcript.len(),
            submission.duration_ms
        );

        self.nats
            .request_json(ANSWER_SUBJECT, submission, self.timeout)
            .await
            .context("Answer service request failed")
    }
}
