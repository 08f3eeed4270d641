use crate::audio::{AudioCapture, CaptureConfig};
use crate::nats::{NatsClient, TranscriptMessage};
use crate::transcript::TranscriptAccumulator;
use anyhow::{Context, Result};
use futures::stream::StreamExt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Measurements for one completed recording turn
#[derive(Debug, Clone)]
pub struct TurnAudioStats {
    pub duration_ms: u64,
    /// Mean of final-segment confidences, when the recognizer supplies them
    pub mean_confidence: Option<f32>,
}

/// Recognizer seam consumed by the phase controller.
///
/// The controller only needs turn start/stop; everything else (device
/// ownership, wire traffic, event routing) stays behind this trait so tests
/// can substitute an in-process fake.
#[async_trait::async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Begin streaming recognition for the given turn.
    async fn start_turn(&self, turn: u64) -> Result<()>;

    /// Stop streaming, release the microphone, and report turn stats.
    /// Events from the stopped turn arriving afterwards are ignored.
    async fn stop_turn(&self) -> Result<TurnAudioStats>;

    fn is_recognizing(&self) -> bool;
}

/// NATS-backed streaming recognizer client.
///
/// While a turn is open this client is the exclusive owner of the capture
/// device: frames flow capture → audio pump task → recognizer subject, and
/// transcript events flow back on the transcript subject, filtered by
/// session id and turn id.
pub struct NatsRecognizer {
    nats: Arc<NatsClient>,
    capture: Mutex<Box<dyn AudioCapture>>,
    accumulator: Arc<Mutex<TranscriptAccumulator>>,

    running: Arc<AtomicBool>,
    active_turn: Arc<AtomicU64>,
    sequence: Arc<AtomicU32>,

    turn_started: Mutex<Option<Instant>>,
    confidences: Arc<Mutex<Vec<f32>>>,

    audio_task: Mutex<Option<JoinHandle<()>>>,
    transcript_task: Mutex<Option<JoinHandle<()>>>,

    sample_rate: u32,
    channels: u16,
    /// How long the transcript pump keeps draining after stop, so a last
    /// in-flight final event can land before the turn is finalized
    settle_delay: Duration,
}

impl NatsRecognizer {
    pub fn new(
        nats: Arc<NatsClient>,
        capture: Box<dyn AudioCapture>,
        accumulator: Arc<Mutex<TranscriptAccumulator>>,
        capture_config: CaptureConfig,
        settle_delay: Duration,
    ) -> Self {
        Self {
            nats,
            capture: Mutex::new(capture),
            accumulator,
            running: Arc::new(AtomicBool::new(false)),
            active_turn: Arc::new(AtomicU64::new(0)),
            sequence: Arc::new(AtomicU32::new(0)),
            turn_started: Mutex::new(None),
            confidences: Arc::new(Mutex::new(Vec::new())),
            audio_task: Mutex::new(None),
            transcript_task: Mutex::new(None),
            sample_rate: capture_config.sample_rate,
            channels: capture_config.channels,
            settle_delay,
        }
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for NatsRecognizer {
    async fn start_turn(&self, turn: u64) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            warn!("Recognition already running");
            return Ok(());
        }

        info!("Starting recognition for turn {}", turn);

        self.active_turn.store(turn, Ordering::SeqCst);
        self.sequence.store(0, Ordering::SeqCst);
        self.confidences.lock().await.clear();
        *self.turn_started.lock().await = Some(Instant::now());
        self.running.store(true, Ordering::SeqCst);

        // Take the microphone. Exclusive ownership: nothing else may hold
        // an open device stream while the turn is open.
        let mut frames = {
            let mut capture = self.capture.lock().await;
            match capture.start().await {
                Ok(rx) => rx,
                Err(e) => {
                    self.running.store(false, Ordering::SeqCst);
                    return Err(e).context("Failed to start audio capture");
                }
            }
        };

        // Audio pump: capture frames -> recognizer subject
        let nats = Arc::clone(&self.nats);
        let running = Arc::clone(&self.running);
        let sequence = Arc::clone(&self.sequence);
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        let audio_task = tokio::spawn(async move {
            debug!("Audio pump task started");

            while let Some(frame) = frames.recv().await {
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                let pcm_bytes: Vec<u8> = frame
                    .samples
                    .iter()
                    .flat_map(|s| s.to_le_bytes())
                    .collect();

                let seq = sequence.fetch_add(1, Ordering::SeqCst);

                if let Err(e) = nats
                    .publish_audio_frame(turn, &pcm_bytes, sample_rate, channels, seq, false)
                    .await
                {
                    error!("Failed to publish audio frame: {}", e);
                }
            }

            debug!("Audio pump task stopped");
        });

        {
            let mut handle = self.audio_task.lock().await;
            if let Some(prev) = handle.replace(audio_task) {
                prev.abort();
            }
        }

        // Transcript pump: recognizer subject -> accumulator, filtered by
        // session id and turn id so stale events never leak across turns.
        let mut transcripts = self
            .nats
            .subscribe_transcripts()
            .await
            .context("Failed to subscribe to transcripts")?;

        let session_id = self.nats.session_id().to_string();
        let accumulator = Arc::clone(&self.accumulator);
        let active_turn = Arc::clone(&self.active_turn);
        let confidences = Arc::clone(&self.confidences);

        // Note: this loop does not watch the running flag. It keeps draining
        // through the post-stop settle window (the recognizer may deliver
        // one last final event after the final-frame marker) and is torn
        // down by stop_turn once that window closes. The turn-id filter is
        // what keeps stale events out.
        let transcript_task = tokio::spawn(async move {
            debug!("Transcript pump task started");

            while let Some(msg) = transcripts.next().await {
                let transcript = match serde_json::from_slice::<TranscriptMessage>(&msg.payload) {
                    Ok(t) => t,
                    Err(e) => {
                        warn!("Failed to parse transcript message: {}", e);
                        continue;
                    }
                };

                if transcript.session_id != session_id {
                    continue;
                }

                // Late events from a stopped turn are discarded.
                if transcript.turn != active_turn.load(Ordering::SeqCst) {
                    debug!("Dropping stale transcript for turn {}", transcript.turn);
                    continue;
                }

                let mut acc = accumulator.lock().await;
                if transcript.partial {
                    acc.on_interim(&transcript.text);
                } else {
                    acc.on_final(&transcript.text);
                    if let Some(confidence) = transcript.confidence {
                        confidences.lock().await.push(confidence);
                    }
                }
            }

            debug!("Transcript pump task stopped");
        });

        {
            let mut handle = self.transcript_task.lock().await;
            if let Some(prev) = handle.replace(transcript_task) {
                prev.abort();
            }
        }

        Ok(())
    }

    async fn stop_turn(&self) -> Result<TurnAudioStats> {
        let turn = self.active_turn.load(Ordering::SeqCst);

        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Recognition not running");
        } else {
            info!("Stopping recognition for turn {}", turn);
        }

        // Final-frame marker tells the recognizer the turn is closed.
        let seq = self.sequence.load(Ordering::SeqCst);
        if let Err(e) = self
            .nats
            .publish_audio_frame(turn, &[], self.sample_rate, self.channels, seq, true)
            .await
        {
            error!("Failed to send final frame: {}", e);
        }

        {
            let mut handle = self.audio_task.lock().await;
            if let Some(task) = handle.take() {
                task.abort();
            }
        }

        {
            let mut capture = self.capture.lock().await;
            if let Err(e) = capture.stop().await {
                error!("Failed to stop audio capture: {}", e);
            }
        }

        // Let a last in-flight final event land before tearing down the
        // transcript pump; the caller finalizes the transcript after this
        // returns.
        tokio::time::sleep(self.settle_delay).await;

        {
            let mut handle = self.transcript_task.lock().await;
            if let Some(task) = handle.take() {
                task.abort();
            }
        }

        let duration_ms = self
            .turn_started
            .lock()
            .await
            .take()
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        let confidences = self.confidences.lock().await;
        let mean_confidence = if confidences.is_empty() {
            None
        } else {
            Some(confidences.iter().sum::<f32>() / confidences.len() as f32)
        };

        Ok(TurnAudioStats {
            duration_ms,
            mean_confidence,
        })
    }

    fn is_recognizing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
