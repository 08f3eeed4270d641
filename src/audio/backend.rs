use anyhow::Result;
use tokio::sync::mpsc;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for microphone capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (recognizer expects 16kHz)
    pub sample_rate: u32,
    /// Target channel count (1 = mono)
    pub channels: u16,
    /// Buffer size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz for the recognizer
            channels: 1,        // Mono
            buffer_duration_ms: 100,
        }
    }
}

/// Microphone capture backend trait.
///
/// The recognizer client is the only holder of an open capture stream while
/// a recording turn is open; two subsystems must never hold the device at
/// once (it would double-prompt for permission).
#[async_trait::async_trait]
pub trait AudioCapture: Send + Sync {
    /// Start capturing audio.
    ///
    /// Returns a channel receiver that will receive audio frames.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio and release the device.
    async fn stop(&mut self) -> Result<()>;

    /// Check if the backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Capture backend fed by an external channel.
///
/// Used by tests and by hosts that deliver microphone frames themselves
/// (the frames arrive from the embedding runtime, not a device we own).
/// Restartable across recording turns: each `start` opens a fresh stream
/// that forwards from the long-lived feed until `stop`.
pub struct ChannelCapture {
    feed: std::sync::Arc<tokio::sync::Mutex<mpsc::Receiver<AudioFrame>>>,
    forward_task: Option<tokio::task::JoinHandle<()>>,
    capturing: bool,
}

impl ChannelCapture {
    /// Create a capture backend and the sender that feeds it.
    pub fn new(buffer: usize) -> (Self, mpsc::Sender<AudioFrame>) {
        let (tx, rx) = mpsc::channel(buffer);
        (
            Self {
                feed: std::sync::Arc::new(tokio::sync::Mutex::new(rx)),
                forward_task: None,
                capturing: false,
            },
            tx,
        )
    }
}

#[async_trait::async_trait]
impl AudioCapture for ChannelCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing {
            anyhow::bail!("capture already started");
        }

        let (tx, rx) = mpsc::channel(64);
        let feed = std::sync::Arc::clone(&self.feed);

        self.forward_task = Some(tokio::spawn(async move {
            let mut feed = feed.lock().await;
            while let Some(frame) = feed.recv().await {
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        }));

        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing = false;
        if let Some(task) = self.forward_task.take() {
            task.abort();
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "channel"
    }
}
