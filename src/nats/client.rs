use anyhow::{Context, Result};
use async_nats::Client;
use base64::Engine;
use std::time::Duration;
use tracing::{debug, info};

/// NATS client owning this session's subjects.
///
/// Publishes captured audio frames for the recognizer, subscribes to the
/// recognizer's transcript stream, and carries request/reply traffic for the
/// question and answer services.
pub struct NatsClient {
    client: Client,
    session_id: String,
}

impl NatsClient {
    /// Connect to the NATS server
    pub async fn connect(url: &str, session_id: String) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client, session_id })
    }

    /// The underlying connection, shared by other wire components.
    pub fn client(&self) -> Client {
        self.client.clone()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Publish one audio frame for the recognizer service
    pub async fn publish_audio_frame(
        &self,
        turn: u64,
        pcm_bytes: &[u8],
        sample_rate: u32,
        channels: u16,
        sequence: u32,
        is_final: bool,
    ) -> Result<()> {
        let subject = format!("audio.frame.{}", self.session_id);

        let message = super::messages::AudioFrameMessage {
            session_id: self.session_id.clone(),
            turn,
            sequence,
            pcm: base64::engine::general_purpose::STANDARD.encode(pcm_bytes),
            sample_rate,
            channels,
            timestamp: chrono::Utc::now().to_rfc3339(),
            final_frame: is_final,
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish audio frame")?;

        debug!(
            "Published audio frame to {} (turn={}, seq={}, bytes={}, final={})",
            subject,
            turn,
            sequence,
            pcm_bytes.len(),
            is_final
        );

        Ok(())
    }

    /// Subscribe to transcript messages.
    ///
    /// The recognizer publishes to stt.text.partial and stt.text.final;
    /// we subscribe to both and filter by session_id in the payload.
    pub async fn subscribe_transcripts(&self) -> Result<async_nats::Subscriber> {
        let subject = "stt.text.>";

        info!("Subscribing to transcripts on {}", subject);

        let subscriber = self
            .client
            .subscribe(subject)
            .await
            .context("Failed to subscribe to transcripts")?;

        Ok(subscriber)
    }

    /// JSON request/reply helper with a timeout, used by the external
    /// question/answer services.
    pub async fn request_json<Req, Resp>(
        &self,
        subject: &str,
        request: &Req,
        timeout: Duration,
    ) -> Result<Resp>
    where
        Req: serde::Serialize,
        Resp: serde::de::DeserializeOwned,
    {
        let payload = serde_json::to_vec(request)?;

        let response = tokio::time::timeout(
            timeout,
            self.client.request(subject.to_string(), payload.into()),
        )
        .await
        .with_context(|| format!("Request to {} timed out", subject))?
        .with_context(|| format!("Request to {} failed", subject))?;

        serde_json::from_slice(&response.payload)
            .with_context(|| format!("Failed to parse reply from {}", subject))
    }
}
