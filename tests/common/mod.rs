// Shared in-process fakes for the integration tests: a media transport and
// output surface the tests can script, a recognizer that records calls, and
// scripted question/answer services.

#![allow(dead_code)]

use anyhow::Result;
use intervo::config::PacingConfig;
use intervo::media::{
    AppMessage, MediaSessionManager, MediaTransport, OutputSurface, PlaybackStart, RemoteStream,
    RoomEvent,
};
use intervo::phase::{InterviewProfile, PhaseController};
use intervo::recognizer::{SpeechRecognizer, TurnAudioStats};
use intervo::services::{
    AnswerFeedback, AnswerService, AnswerSubmission, Question, QuestionRequest, QuestionService,
};
use intervo::timer::TurnTimer;
use intervo::transcript::TranscriptAccumulator;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

// ============================================================================
// Media transport fake
// ============================================================================

#[derive(Default)]
pub struct FakeTransport {
    pub joins: AtomicUsize,
    pub leaves: AtomicUsize,
    pub fail_join: AtomicBool,
    pub app_messages: Mutex<Vec<AppMessage>>,
    pub subscribe_calls: Mutex<Vec<String>>,
    pub local_audio_calls: Mutex<Vec<bool>>,
    events_tx: Mutex<Option<mpsc::Sender<RoomEvent>>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Inject a room event as if the remote side had emitted it.
    pub async fn send_event(&self, event: RoomEvent) {
        let tx = self
            .events_tx
            .lock()
            .await
            .clone()
            .expect("transport not joined");
        tx.send(event).await.expect("event channel closed");

        // Let the manager's event loop process it.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
    }

    pub async fn spoken_texts(&self) -> Vec<String> {
        self.app_messages
            .lock()
            .await
            .iter()
            .filter_map(|m| match m {
                AppMessage::Speak { text } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn terminate_count(&self) -> usize {
        self.app_messages
            .lock()
            .await
            .iter()
            .filter(|m| matches!(m, AppMessage::Terminate))
            .count()
    }
}

#[async_trait::async_trait]
impl MediaTransport for FakeTransport {
    async fn request_permissions(&self) -> Result<()> {
        Ok(())
    }

    async fn join(&self, _room: &str, _identity: &str) -> Result<mpsc::Receiver<RoomEvent>> {
        if self.fail_join.load(Ordering::SeqCst) {
            anyhow::bail!("join refused");
        }

        self.joins.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(32);
        *self.events_tx.lock().await = Some(tx);

        Ok(rx)
    }

    async fn subscribe_tracks(&self, participant_id: &str) -> Result<()> {
        self.subscribe_calls
            .lock()
            .await
            .push(participant_id.to_string());
        Ok(())
    }

    async fn send_app_message(&self, message: &AppMessage) -> Result<()> {
        self.app_messages.lock().await.push(message.clone());
        Ok(())
    }

    async fn set_local_audio(&self, enabled: bool) -> Result<()> {
        self.local_audio_calls.lock().await.push(enabled);
        Ok(())
    }

    async fn leave(&self) -> Result<()> {
        self.leaves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Output surface fake
// ============================================================================

#[derive(Default)]
pub struct FakeSurface {
    pub attached: Mutex<Vec<RemoteStream>>,
    /// Reject unmuted playback until cleared (autoplay policy simulation)
    pub block_autoplay: AtomicBool,
    /// Muted flag of every play attempt, in order
    pub plays: Mutex<Vec<bool>>,
}

impl FakeSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait::async_trait]
impl OutputSurface for FakeSurface {
    async fn attach(&self, stream: RemoteStream) -> Result<()> {
        self.attached.lock().await.push(stream);
        Ok(())
    }

    async fn play(&self, muted: bool) -> Result<PlaybackStart> {
        self.plays.lock().await.push(muted);

        if !muted && self.block_autoplay.load(Ordering::SeqCst) {
            return Ok(PlaybackStart::AutoplayBlocked);
        }

        Ok(PlaybackStart::Playing)
    }
}

// ============================================================================
// Recognizer fake
// ============================================================================

#[derive(Default)]
pub struct FakeRecognizer {
    running: AtomicBool,
    pub started_turns: Mutex<Vec<u64>>,
    pub stops: AtomicUsize,
    pub fail_start: AtomicBool,
}

impl FakeRecognizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for FakeRecognizer {
    async fn start_turn(&self, turn: u64) -> Result<()> {
        if self.fail_start.load(Ordering::SeqCst) {
            anyhow::bail!("recognizer refused to start");
        }

        self.started_turns.lock().await.push(turn);
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_turn(&self) -> Result<TurnAudioStats> {
        self.running.store(false, Ordering::SeqCst);
        self.stops.fetch_add(1, Ordering::SeqCst);

        Ok(TurnAudioStats {
            duration_ms: 1500,
            mean_confidence: Some(0.9),
        })
    }

    fn is_recognizing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Question/answer service fakes
// ============================================================================

pub struct ScriptedQuestions {
    questions: Mutex<VecDeque<String>>,
    pub fail_next: AtomicBool,
    pub requests: Mutex<Vec<QuestionRequest>>,
}

impl ScriptedQuestions {
    pub fn new(questions: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            questions: Mutex::new(questions.iter().map(|q| q.to_string()).collect()),
            fail_next: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl QuestionService for ScriptedQuestions {
    async fn next_question(&self, request: &QuestionRequest) -> Result<Option<Question>> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            anyhow::bail!("question service unavailable");
        }

        self.requests.lock().await.push(request.clone());

        Ok(self.questions.lock().await.pop_front().map(|text| Question {
            number: request.prior_question_count + 1,
            text,
        }))
    }
}

#[derive(Default)]
pub struct CapturingAnswers {
    pub submissions: Mutex<Vec<AnswerSubmission>>,
    pub fail_next: AtomicBool,
}

impl CapturingAnswers {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait::async_trait]
impl AnswerService for CapturingAnswers {
    async fn submit_answer(&self, submission: &AnswerSubmission) -> Result<AnswerFeedback> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            anyhow::bail!("answer service unavailable");
        }

        self.submissions.lock().await.push(submission.clone());

        Ok(AnswerFeedback {
            question_number: submission.question_number,
            feedback: serde_json::json!({ "score": 4 }),
        })
    }
}

// ============================================================================
// Harness
// ============================================================================

pub const AVATAR: &str = "interviewer-1";

/// Fast pacing so the tests don't wait out real speaking windows.
pub fn fast_pacing() -> PacingConfig {
    PacingConfig {
        speak_floor_ms: 20,
        speak_per_char_ms: 0,
        speak_cap_ms: 100,
        settle_delay_ms: 1,
    }
}

/// A media session already joined with the avatar observed.
pub async fn ready_media(
    idle_timeout: Duration,
) -> (MediaSessionManager, Arc<FakeTransport>, Arc<FakeSurface>) {
    let transport = FakeTransport::new();
    let surface = FakeSurface::new();

    let media = MediaSessionManager::new(
        transport.clone(),
        surface.clone(),
        "interviewer".to_string(),
        idle_timeout,
    );

    media.connect("room-test", "candidate").await.unwrap();
    transport
        .send_event(RoomEvent::ParticipantJoined {
            participant_id: AVATAR.to_string(),
        })
        .await;
    media
        .wait_until_ready(Duration::from_secs(5))
        .await
        .unwrap();

    (media, transport, surface)
}

pub struct Harness {
    pub controller: PhaseController,
    pub media: MediaSessionManager,
    pub transport: Arc<FakeTransport>,
    pub timer: Arc<TurnTimer>,
    pub accumulator: Arc<Mutex<TranscriptAccumulator>>,
    pub recognizer: Arc<FakeRecognizer>,
    pub questions: Arc<ScriptedQuestions>,
    pub answers: Arc<CapturingAnswers>,
}

impl Harness {
    /// Controller wired to fakes, media ready, job context preset.
    pub async fn new(questions: &[&str], time_limit_secs: Option<u64>) -> Self {
        Self::build(questions, time_limit_secs, true, true).await
    }

    pub async fn build(
        questions: &[&str],
        time_limit_secs: Option<u64>,
        with_context: bool,
        with_recognizer: bool,
    ) -> Self {
        let (media, transport, _surface) = ready_media(Duration::from_secs(600)).await;

        let timer = Arc::new(TurnTimer::new());
        let accumulator = Arc::new(Mutex::new(TranscriptAccumulator::new()));
        let recognizer = FakeRecognizer::new();
        let questions = ScriptedQuestions::new(questions);
        let answers = CapturingAnswers::new();

        let profile = InterviewProfile {
            session_id: "interview-test".to_string(),
            persona: "behavioral".to_string(),
            difficulty: "medium".to_string(),
            mode: "5min".to_string(),
            time_limit_secs,
        };

        let controller = PhaseController::new(
            profile,
            fast_pacing(),
            media.clone(),
            Arc::clone(&timer),
            Arc::clone(&accumulator),
            with_recognizer.then(|| recognizer.clone() as Arc<dyn SpeechRecognizer>),
            questions.clone() as Arc<dyn QuestionService>,
            answers.clone() as Arc<dyn AnswerService>,
        );

        if with_context {
            controller
                .set_job_context("Senior backend engineer, Rust")
                .await
                .unwrap();
        }

        Self {
            controller,
            media,
            transport,
            timer,
            accumulator,
            recognizer,
            questions,
            answers,
        }
    }

    /// Let the deferred Asking → Listening flip run (paused-clock friendly).
    pub async fn wait_for_listening(&self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        tokio::task::yield_now().await;
    }
}
