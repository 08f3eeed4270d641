use super::config::SessionConfig;
use super::stats::{SessionStats, TranscriptView};
use crate::audio::{AudioFrame, CaptureConfig, ChannelCapture};
use crate::config::Config;
use crate::media::{MediaSessionManager, NatsMediaTransport, NullOutput};
use crate::nats::NatsClient;
use crate::phase::{InterviewProfile, PhaseController, PhaseEvent};
use crate::recognizer::NatsRecognizer;
use crate::services::{AnswerFeedback, NatsAnswerService, NatsQuestionService};
use crate::timer::TurnTimer;
use crate::transcript::TranscriptAccumulator;
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

/// One interview session: the user-facing action surface over the media
/// manager, phase controller, timer, and recognizer.
pub struct InterviewSession {
    config: SessionConfig,
    media: MediaSessionManager,
    controller: PhaseController,
    timer: Arc<TurnTimer>,
    accumulator: Arc<Mutex<TranscriptAccumulator>>,

    /// Feeds microphone PCM frames into the recognizer's capture backend
    audio_feed: mpsc::Sender<AudioFrame>,

    room: String,
    identity: String,
    greeting: String,
    greeting_gap: Duration,
    avatar_join_timeout: Duration,

    created_at: chrono::DateTime<chrono::Utc>,

    /// Guards the start sequence: media connect, greeting, and the first
    /// question fetch must each happen exactly once, even under rapid
    /// repeated user action
    starting: AtomicBool,
}

impl InterviewSession {
    /// Create a new interview session and connect its wire clients.
    pub async fn new(app: &Config, config: SessionConfig) -> Result<Self> {
        info!("Creating interview session: {}", config.session_id);

        let nats = Arc::new(
            NatsClient::connect(&config.nats_url, config.session_id.clone())
                .await
                .context("Failed to connect to NATS")?,
        );

        let transport = Arc::new(NatsMediaTransport::new(nats.client()));
        let media = MediaSessionManager::new(
            transport,
            Arc::new(NullOutput),
            app.media.avatar_prefix.clone(),
            Duration::from_secs(app.media.idle_timeout_secs),
        );

        let accumulator = Arc::new(Mutex::new(TranscriptAccumulator::new()));
        let timer = Arc::new(TurnTimer::new());

        // The capture seam: the host pushes microphone frames through
        // audio_feed; the recognizer owns the receiving side while a
        // recording turn is open.
        let (capture, audio_feed) = ChannelCapture::new(64);

        let recognizer = if app.audio.recognition_enabled {
            Some(Arc::new(NatsRecognizer::new(
                Arc::clone(&nats),
                Box::new(capture),
                Arc::clone(&accumulator),
                CaptureConfig {
                    sample_rate: app.audio.sample_rate,
                    channels: app.audio.channels,
                    buffer_duration_ms: app.audio.buffer_duration_ms,
                },
                Duration::from_millis(app.pacing.settle_delay_ms),
            )) as Arc<dyn crate::recognizer::SpeechRecognizer>)
        } else {
            warn!("Speech recognition disabled; answers will be typed");
            None
        };

        let request_timeout = Duration::from_millis(app.nats.request_timeout_ms);
        let questions = Arc::new(NatsQuestionService::new(Arc::clone(&nats), request_timeout));
        let answers = Arc::new(NatsAnswerService::new(Arc::clone(&nats), request_timeout));

        let profile = InterviewProfile {
            session_id: config.session_id.clone(),
            persona: config.persona.clone(),
            difficulty: config.difficulty.clone(),
            mode: config.mode.clone(),
            time_limit_secs: app.limits.time_limit_secs(&config.mode),
        };

        let controller = PhaseController::new(
            profile,
            app.pacing.clone(),
            media.clone(),
            Arc::clone(&timer),
            Arc::clone(&accumulator),
            recognizer,
            questions,
            answers,
        );

        if let Some(ref context) = config.job_context {
            controller.set_job_context(context).await?;
        }

        Ok(Self {
            room: format!("{}{}", app.media.room_prefix, config.session_id),
            identity: app.media.identity.clone(),
            greeting: app.media.greeting.clone(),
            greeting_gap: Duration::from_millis(app.media.greeting_gap_ms),
            avatar_join_timeout: Duration::from_secs(app.media.avatar_join_timeout_secs),
            config,
            media,
            controller,
            timer,
            accumulator,
            audio_feed,
            created_at: Utc::now(),
            starting: AtomicBool::new(false),
        })
    }

    /// Start the interview: join the avatar room, run the greeting
    /// handshake, then hand off to the phase controller for the first
    /// question.
    ///
    /// Duplicate calls (double-click, duplicate mount) are absorbed: the
    /// first caller runs the sequence, later callers return immediately.
    pub async fn start(&self) -> Result<()> {
        if self.starting.swap(true, Ordering::SeqCst) {
            warn!("Session {} already starting", self.config.session_id);
            return Ok(());
        }

        let result = self.run_start_sequence().await;

        if result.is_err() {
            // Leave the guard open for a manual retry after a surfaced
            // connectivity failure.
            self.starting.store(false, Ordering::SeqCst);
        }

        result
    }

    async fn run_start_sequence(&self) -> Result<()> {
        self.media
            .connect(&self.room, &self.identity)
            .await
            .context("Failed to connect the media session")?;

        self.media
            .wait_until_ready(self.avatar_join_timeout)
            .await?;

        // Greeting handshake: the only moment the candidate's mic is open.
        // The avatar must never hear the spoken answers.
        if let Err(e) = self.media.set_local_audio_enabled(true).await {
            warn!("Could not open the mic for the greeting: {}", e);
        }

        self.media.speak(&self.greeting).await?;
        tokio::time::sleep(self.greeting_gap).await;

        self.media
            .set_local_audio_enabled(false)
            .await
            .context("Failed to mute the candidate microphone")?;

        // Tear the media session down when the state machine ends the
        // session on its own (time limit, question exhaustion).
        let media = self.media.clone();
        let mut events = self.controller.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                if let PhaseEvent::SessionEnded { reason } = event {
                    info!("Session ended ({}); releasing media session", reason);
                    media.terminate_remote().await;
                    media.disconnect().await;
                    break;
                }
            }
        });

        self.controller.start().await
    }

    /// One-time job-context submission; unblocks the first question when
    /// the session started without context.
    pub async fn set_job_context(&self, text: &str) -> Result<()> {
        self.media.note_activity().await;
        self.controller.set_job_context(text).await
    }

    /// Toggle recording: start in Listening, stop while recording.
    pub async fn record_toggle(&self) -> Result<()> {
        self.media.note_activity().await;

        if self.controller.snapshot().await.recording {
            self.controller.stop_recording().await
        } else {
            self.controller.start_recording().await
        }
    }

    /// Discard the current turn and return to a clean Listening state.
    pub async fn retry(&self) -> Result<()> {
        self.media.note_activity().await;
        self.controller.retry().await
    }

    /// Submit the finalized answer. A manual transcript takes the typed
    /// text through the same finalization path first (the degraded mode
    /// when recognition is unavailable).
    pub async fn submit(&self, manual_transcript: Option<&str>) -> Result<AnswerFeedback> {
        self.media.note_activity().await;

        if let Some(text) = manual_transcript {
            self.controller.submit_manual_answer(text).await?;
        }

        self.controller.submit().await
    }

    /// Move on to the next question.
    pub async fn continue_session(&self) -> Result<()> {
        self.media.note_activity().await;
        self.controller.continue_session().await
    }

    /// End the interview and release the media session (best-effort).
    pub async fn end(&self) {
        self.controller.end_session("ended by candidate").await;
        self.media.terminate_remote().await;
        self.media.disconnect().await;
    }

    /// Push one microphone frame into the recognizer's capture stream.
    ///
    /// Frames arriving while no recording turn is open are dropped once the
    /// feed buffer fills; the mic stream must never backpressure the caller.
    pub async fn feed_audio(&self, frame: AudioFrame) -> Result<()> {
        use tokio::sync::mpsc::error::TrySendError;

        match self.audio_feed.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                debug!("Audio feed full; dropping frame");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(anyhow::anyhow!("audio feed closed")),
        }
    }

    /// Point-in-time session status
    pub async fn stats(&self) -> SessionStats {
        SessionStats {
            session_id: self.config.session_id.clone(),
            created_at: self.created_at,
            phase: self.controller.snapshot().await,
            timer: self.timer.snapshot(),
            media: self.media.state().await,
        }
    }

    /// Finalized turns plus the live in-progress transcript
    pub async fn transcript(&self) -> TranscriptView {
        let acc = self.accumulator.lock().await;
        TranscriptView {
            turns: acc.turns().to_vec(),
            live: acc.current_value(),
        }
    }

    /// Latest answer feedback from the scoring service, if any
    pub async fn last_feedback(&self) -> Option<AnswerFeedback> {
        self.controller.last_feedback().await
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }
}
