use super::estimate::speaking_window;
use crate::config::PacingConfig;
use crate::media::{MediaConnectionState, MediaSessionManager};
use crate::recognizer::{SpeechRecognizer, TurnAudioStats};
use crate::services::{AnswerFeedback, AnswerService, AnswerSubmission, Question, QuestionRequest, QuestionService};
use crate::timer::TurnTimer;
use crate::transcript::TranscriptAccumulator;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

/// Interview phase. Exactly one is active per session at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Session created, not yet started
    Idle,
    /// Started, but blocked until the candidate supplies job-context text
    /// (guards against generating hollow generic questions)
    AwaitingContext,
    /// A question is being fetched/spoken by the avatar
    Asking,
    /// Recording-ready: the candidate may start/stop recording
    Listening,
    /// Recognizer stopped; waiting out the settle delay and finalizing
    Finalizing,
    /// Finalized answer shown; candidate submits, retries, continues or ends
    Reviewing,
}

/// Static facts about the session, fixed at creation
#[derive(Debug, Clone)]
pub struct InterviewProfile {
    pub session_id: String,
    pub persona: String,
    pub difficulty: String,
    pub mode: String,
    /// From the mode table; None means unbounded
    pub time_limit_secs: Option<u64>,
}

/// Events emitted as the state machine advances
#[derive(Debug, Clone)]
pub enum PhaseEvent {
    PhaseChanged { from: Phase, to: Phase },
    QuestionAsked { number: u32, text: String },
    TurnFinalized { question_number: u32 },
    AnswerSubmitted { question_number: u32 },
    SessionEnded { reason: String },
}

/// Status snapshot for the control surface
#[derive(Debug, Clone, Serialize)]
pub struct PhaseSnapshot {
    pub phase: Phase,
    pub question: Option<Question>,
    pub questions_asked: u32,
    pub recording: bool,
    pub answered: bool,
    pub ended: Option<String>,
}

struct ControllerInner {
    phase: Phase,
    started: bool,
    job_context: Option<String>,
    question: Option<Question>,
    questions_asked: u32,
    /// Recording-turn generation; deferred continuations scheduled under an
    /// older value are discarded
    turn: u64,
    recording: bool,
    last_turn_stats: Option<TurnAudioStats>,
    answered: bool,
    last_feedback: Option<AnswerFeedback>,
    ended: Option<String>,
}

struct ControllerShared {
    profile: InterviewProfile,
    pacing: PacingConfig,
    media: MediaSessionManager,
    timer: Arc<TurnTimer>,
    accumulator: Arc<Mutex<TranscriptAccumulator>>,
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    questions: Arc<dyn QuestionService>,
    answers: Arc<dyn AnswerService>,
    inner: Mutex<ControllerInner>,
    events: broadcast::Sender<PhaseEvent>,
}

/// The interview state machine.
///
/// All transitions run through this controller while holding one mutex, so
/// no two transitions are ever processed concurrently. Cheap to clone; all
/// clones share state.
#[derive(Clone)]
pub struct PhaseController {
    shared: Arc<ControllerShared>,
}

impl PhaseController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        profile: InterviewProfile,
        pacing: PacingConfig,
        media: MediaSessionManager,
        timer: Arc<TurnTimer>,
        accumulator: Arc<Mutex<TranscriptAccumulator>>,
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
        questions: Arc<dyn QuestionService>,
        answers: Arc<dyn AnswerService>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);

        Self {
            shared: Arc::new(ControllerShared {
                profile,
                pacing,
                media,
                timer,
                accumulator,
                recognizer,
                questions,
                answers,
                inner: Mutex::new(ControllerInner {
                    phase: Phase::Idle,
                    started: false,
                    job_context: None,
                    question: None,
                    questions_asked: 0,
                    turn: 0,
                    recording: false,
                    last_turn_stats: None,
                    answered: false,
                    last_feedback: None,
                    ended: None,
                }),
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PhaseEvent> {
        self.shared.events.subscribe()
    }

    pub async fn snapshot(&self) -> PhaseSnapshot {
        let inner = self.shared.inner.lock().await;
        PhaseSnapshot {
            phase: inner.phase,
            question: inner.question.clone(),
            questions_asked: inner.questions_asked,
            recording: inner.recording,
            answered: inner.answered,
            ended: inner.ended.clone(),
        }
    }

    pub async fn last_feedback(&self) -> Option<AnswerFeedback> {
        self.shared.inner.lock().await.last_feedback.clone()
    }

    /// Supply the one-time job-context text. If the session is already
    /// started and blocked on context, this unblocks the first question.
    pub async fn set_job_context(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            bail!("job context must not be empty");
        }

        let unblock = {
            let mut inner = self.shared.inner.lock().await;
            if inner.job_context.is_some() {
                bail!("job context already supplied");
            }

            inner.job_context = Some(text.to_string());
            inner.phase == Phase::AwaitingContext
        };

        info!("Job context supplied ({} chars)", text.len());

        if unblock {
            if let Err(e) = self.begin_interview().await {
                // Leave the start guard open so the candidate can re-attempt
                // via start() after a surfaced service failure.
                self.shared.inner.lock().await.started = false;
                return Err(e);
            }
        }

        Ok(())
    }

    /// Start the interview. Gated on the media session being joined with
    /// the avatar participant observed; blocks in AwaitingContext until
    /// job-context text has been supplied.
    ///
    /// Idempotent under rapid repeated invocation: the first call wins.
    pub async fn start(&self) -> Result<()> {
        {
            let mut inner = self.shared.inner.lock().await;
            if inner.started {
                warn!("Interview already started");
                return Ok(());
            }

            let media = self.shared.media.state().await;
            if media.connection != MediaConnectionState::Joined || !media.avatar_observed {
                bail!("media session not ready: the avatar has not joined yet");
            }

            inner.started = true;

            if inner.job_context.is_none() {
                Self::set_phase(&self.shared, &mut inner, Phase::AwaitingContext);
                info!("Interview start blocked awaiting job context");
                return Ok(());
            }
        }

        if let Err(e) = self.begin_interview().await {
            // A failed first fetch must not wedge the session behind the
            // duplicate-start guard.
            self.shared.inner.lock().await.started = false;
            return Err(e);
        }

        Ok(())
    }

    /// Timer start + first question. Runs once the media gate and the
    /// job-context gate have both cleared.
    async fn begin_interview(&self) -> Result<()> {
        self.shared
            .timer
            .start(self.shared.profile.time_limit_secs)
            .await;

        self.ask_next_question().await
    }

    /// Fetch the next question, hand it to the avatar, and schedule the
    /// Asking → Listening flip after the estimated speaking window.
    ///
    /// The phase only commits once the fetch succeeds, so a failed fetch
    /// leaves the session re-attemptable from its previous state.
    async fn ask_next_question(&self) -> Result<()> {
        let request = {
            let inner = self.shared.inner.lock().await;
            QuestionRequest {
                session_id: self.shared.profile.session_id.clone(),
                persona: self.shared.profile.persona.clone(),
                difficulty: self.shared.profile.difficulty.clone(),
                mode: self.shared.profile.mode.clone(),
                job_context: inner.job_context.clone().unwrap_or_default(),
                prior_question_count: inner.questions_asked,
            }
        };

        let question = self
            .shared
            .questions
            .next_question(&request)
            .await
            .context("Failed to fetch the next question")?;

        let Some(question) = question else {
            self.end_session("no more questions").await;
            return Ok(());
        };

        let (turn, text) = {
            let mut inner = self.shared.inner.lock().await;
            inner.turn += 1;
            inner.questions_asked += 1;
            inner.question = Some(question.clone());
            inner.answered = false;
            inner.recording = false;
            inner.last_turn_stats = None;
            Self::set_phase(&self.shared, &mut inner, Phase::Asking);

            let _ = self.shared.events.send(PhaseEvent::QuestionAsked {
                number: question.number,
                text: question.text.clone(),
            });

            (inner.turn, question.text.clone())
        };

        // Must be delivered before the turn can proceed; on failure we stay
        // in Asking and the candidate can re-attempt.
        self.shared
            .media
            .speak(&text)
            .await
            .context("Failed to deliver the question to the avatar")?;

        let window = speaking_window(&self.shared.pacing, &text);
        info!(
            "Question {} spoken; opening microphone in {:?}",
            question.number, window
        );

        let controller = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            controller.advance_to_listening(turn).await;
        });

        Ok(())
    }

    /// Deferred Asking → Listening flip. A stale turn id (retry, end, next
    /// question) makes this a no-op.
    async fn advance_to_listening(&self, turn: u64) {
        let mut inner = self.shared.inner.lock().await;

        if inner.turn != turn || inner.phase != Phase::Asking {
            debug!("Discarding stale listening transition for turn {}", turn);
            return;
        }

        Self::set_phase(&self.shared, &mut inner, Phase::Listening);
    }

    /// Begin recording the candidate's answer.
    ///
    /// Only legal in Listening, with time remaining, and with a recognizer
    /// available (otherwise the manual text-entry path applies).
    pub async fn start_recording(&self) -> Result<()> {
        let mut inner = self.shared.inner.lock().await;

        if inner.phase != Phase::Listening {
            bail!("cannot record in the {:?} phase", inner.phase);
        }
        if inner.recording {
            bail!("recording already in progress");
        }
        if self.shared.timer.is_expired() {
            bail!("the session time limit has been reached");
        }

        let Some(recognizer) = self.shared.recognizer.clone() else {
            bail!("speech recognition unavailable; submit a typed answer instead");
        };

        // Exactly one reset per recording turn.
        self.shared.accumulator.lock().await.reset();

        recognizer
            .start_turn(inner.turn)
            .await
            .context("Failed to start recognition")?;

        inner.recording = true;
        info!("Recording started for turn {}", inner.turn);

        Ok(())
    }

    /// Stop recording: Listening → Finalizing → Reviewing.
    ///
    /// Stops the recognizer (which releases the microphone and drains its
    /// settle window), then promotes any dangling interim and appends the
    /// finalized transcript.
    pub async fn stop_recording(&self) -> Result<()> {
        let (turn, recognizer) = {
            let mut inner = self.shared.inner.lock().await;

            if inner.phase != Phase::Listening || !inner.recording {
                bail!("no recording in progress");
            }

            let Some(recognizer) = self.shared.recognizer.clone() else {
                bail!("speech recognition unavailable");
            };

            inner.recording = false;
            Self::set_phase(&self.shared, &mut inner, Phase::Finalizing);
            (inner.turn, recognizer)
        };

        let stats = match recognizer.stop_turn().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                error!("Recognizer stop failed: {}", e);
                None
            }
        };

        self.finalize_turn(turn, stats).await;

        Ok(())
    }

    /// Submit a typed answer in place of a recorded one (the degraded path
    /// when recognition is unavailable). Follows the same
    /// Finalizing → Reviewing route as recorded answers.
    pub async fn submit_manual_answer(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            bail!("answer text must not be empty");
        }

        let turn = {
            let mut inner = self.shared.inner.lock().await;

            if inner.phase != Phase::Listening {
                bail!("cannot submit an answer in the {:?} phase", inner.phase);
            }
            if inner.recording {
                bail!("stop the recording first");
            }

            Self::set_phase(&self.shared, &mut inner, Phase::Finalizing);
            inner.turn
        };

        {
            let mut acc = self.shared.accumulator.lock().await;
            acc.reset();
            acc.on_final(text);
        }

        self.finalize_turn(turn, None).await;

        Ok(())
    }

    /// Finalizing → Reviewing: promote + append exactly once per turn.
    async fn finalize_turn(&self, turn: u64, stats: Option<TurnAudioStats>) {
        let mut inner = self.shared.inner.lock().await;

        if inner.turn != turn || inner.phase != Phase::Finalizing {
            debug!("Discarding stale finalization for turn {}", turn);
            return;
        }

        let question_number = inner.question.as_ref().map(|q| q.number).unwrap_or(0);

        let entry = self
            .shared
            .accumulator
            .lock()
            .await
            .finalize_turn(question_number);

        info!(
            "Turn {} finalized: {} chars for question {}",
            turn,
            entry.text.len(),
            question_number
        );

        inner.last_turn_stats = stats;
        Self::set_phase(&self.shared, &mut inner, Phase::Reviewing);

        let _ = self
            .shared
            .events
            .send(PhaseEvent::TurnFinalized { question_number });
    }

    /// Discard the current turn's transcript and audio and return to a
    /// clean Listening state. Does not advance the question index.
    pub async fn retry(&self) -> Result<()> {
        // Stop any open recording first, so late events from the discarded
        // turn cannot repopulate the buffers after the reset below.
        let was_recording = {
            let mut inner = self.shared.inner.lock().await;

            match inner.phase {
                Phase::Listening => {}
                Phase::Reviewing => {
                    if inner.answered {
                        bail!("the answer has already been submitted");
                    }
                }
                phase => bail!("nothing to retry in the {:?} phase", phase),
            }

            let was_recording = inner.recording;
            inner.recording = false;
            was_recording
        };

        if was_recording {
            if let Some(recognizer) = self.shared.recognizer.clone() {
                if let Err(e) = recognizer.stop_turn().await {
                    warn!("Recognizer stop during retry failed: {}", e);
                }
            }
        }

        let mut inner = self.shared.inner.lock().await;

        if inner.ended.is_some() {
            return Ok(());
        }

        if inner.phase == Phase::Reviewing {
            // Remove the entry appended at finalization.
            self.shared.accumulator.lock().await.discard_last_turn();
        }

        inner.last_turn_stats = None;
        self.shared.accumulator.lock().await.reset();
        Self::set_phase(&self.shared, &mut inner, Phase::Listening);

        info!("Turn discarded; back to a clean Listening state");

        Ok(())
    }

    /// Submit the finalized answer to the answer service.
    ///
    /// On failure the error is surfaced and the action is not auto-retried;
    /// the session stays in Reviewing for a manual re-attempt. Once the
    /// timer has expired in a bounded mode, a successful submit forces
    /// session end instead of offering Continue.
    pub async fn submit(&self) -> Result<AnswerFeedback> {
        let submission = {
            let inner = self.shared.inner.lock().await;

            if inner.phase != Phase::Reviewing {
                bail!("cannot submit in the {:?} phase", inner.phase);
            }
            if inner.answered {
                bail!("the answer has already been submitted");
            }

            let question = inner
                .question
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("no question on record"))?;

            let transcript = self
                .shared
                .accumulator
                .lock()
                .await
                .turns()
                .last()
                .map(|t| t.text.clone())
                .unwrap_or_default();

            AnswerSubmission {
                session_id: self.shared.profile.session_id.clone(),
                question_number: question.number,
                question_text: question.text.clone(),
                transcript,
                duration_ms: inner
                    .last_turn_stats
                    .as_ref()
                    .map(|s| s.duration_ms)
                    .unwrap_or(0),
                confidence: inner.last_turn_stats.as_ref().and_then(|s| s.mean_confidence),
            }
        };

        let feedback = self
            .shared
            .answers
            .submit_answer(&submission)
            .await
            .context("Failed to submit the answer")?;

        let force_end = {
            let mut inner = self.shared.inner.lock().await;
            inner.answered = true;
            inner.last_feedback = Some(feedback.clone());

            let _ = self.shared.events.send(PhaseEvent::AnswerSubmitted {
                question_number: submission.question_number,
            });

            self.shared.timer.is_expired()
        };

        if force_end {
            info!("Time limit reached; ending the session after submission");
            self.end_session("time limit reached").await;
        }

        Ok(feedback)
    }

    /// Move on to the next question. Requires a submitted answer; an
    /// expired timer ends the session instead.
    pub async fn continue_session(&self) -> Result<()> {
        {
            let inner = self.shared.inner.lock().await;

            if inner.phase != Phase::Reviewing {
                bail!("cannot continue in the {:?} phase", inner.phase);
            }
            if !inner.answered {
                bail!("submit the answer before continuing");
            }
        }

        if self.shared.timer.is_expired() {
            self.end_session("time limit reached").await;
            return Ok(());
        }

        self.ask_next_question().await
    }

    /// End the session. Stops the timer and any open recording; emits the
    /// terminal event. Safe to call more than once.
    pub async fn end_session(&self, reason: &str) {
        let stop_recognizer = {
            let mut inner = self.shared.inner.lock().await;

            if inner.ended.is_some() {
                return;
            }

            inner.ended = Some(reason.to_string());
            let was_recording = inner.recording;
            inner.recording = false;
            Self::set_phase(&self.shared, &mut inner, Phase::Idle);

            was_recording
        };

        self.shared.timer.stop().await;

        if stop_recognizer {
            if let Some(recognizer) = self.shared.recognizer.clone() {
                if let Err(e) = recognizer.stop_turn().await {
                    warn!("Recognizer stop during session end failed: {}", e);
                }
            }
        }

        info!("Session ended: {}", reason);

        let _ = self.shared.events.send(PhaseEvent::SessionEnded {
            reason: reason.to_string(),
        });
    }

    fn set_phase(shared: &ControllerShared, inner: &mut ControllerInner, to: Phase) {
        let from = inner.phase;
        if from == to {
            return;
        }

        inner.phase = to;
        info!("Phase: {:?} -> {:?}", from, to);

        let _ = shared.events.send(PhaseEvent::PhaseChanged { from, to });
    }
}
