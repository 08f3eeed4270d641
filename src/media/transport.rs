use super::events::{AppMessage, RoomEvent};
use anyhow::{Context, Result};
use futures::stream::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

/// Media transport seam.
///
/// The manager drives the avatar room exclusively through this trait so the
/// wire protocol can be swapped (and tests can run against an in-process
/// fake) without touching connection-state logic.
#[async_trait::async_trait]
pub trait MediaTransport: Send + Sync {
    /// Request local microphone/camera permission.
    ///
    /// Best-effort: only remote media is rendered, so a denial must not
    /// abort the join.
    async fn request_permissions(&self) -> Result<()>;

    /// Join a room and return the stream of participant/track events.
    async fn join(&self, room: &str, identity: &str) -> Result<mpsc::Receiver<RoomEvent>>;

    /// (Re-)request subscription to a participant's audio+video tracks.
    ///
    /// Must be idempotent: duplicate participant-joined events trigger
    /// duplicate subscribe requests.
    async fn subscribe_tracks(&self, participant_id: &str) -> Result<()>;

    /// Send a structured app message into the room.
    async fn send_app_message(&self, message: &AppMessage) -> Result<()>;

    /// Mute/unmute the candidate's outbound audio.
    async fn set_local_audio(&self, enabled: bool) -> Result<()>;

    /// Leave the room and release transport resources.
    async fn leave(&self) -> Result<()>;
}

/// Control message published on the room's control subject
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum RoomControlMessage {
    Join { identity: String },
    SubscribeTracks { participant_id: String },
    SetLocalAudio { enabled: bool },
    Leave { identity: String },
}

/// NATS-backed media transport.
///
/// Room traffic rides three subjects per room: `room.{room}.control` for
/// join/leave/subscription commands, `room.{room}.events` for participant
/// and track lifecycle events, and `room.{room}.app` for avatar app
/// messages.
pub struct NatsMediaTransport {
    client: async_nats::Client,
    joined: Mutex<Option<JoinedRoom>>,
}

struct JoinedRoom {
    room: String,
    identity: String,
    event_task: tokio::task::JoinHandle<()>,
}

impl NatsMediaTransport {
    pub fn new(client: async_nats::Client) -> Self {
        Self {
            client,
            joined: Mutex::new(None),
        }
    }

    async fn publish_control(&self, room: &str, message: &RoomControlMessage) -> Result<()> {
        let subject = format!("room.{}.control", room);
        let payload = serde_json::to_vec(message)?;

        self.client
            .publish(subject, payload.into())
            .await
            .context("Failed to publish room control message")?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl MediaTransport for NatsMediaTransport {
    async fn request_permissions(&self) -> Result<()> {
        // Device permission is a host concern; the wire transport itself
        // renders no local media.
        Ok(())
    }

    async fn join(&self, room: &str, identity: &str) -> Result<mpsc::Receiver<RoomEvent>> {
        let subject = format!("room.{}.events", room);

        let mut subscriber = self
            .client
            .subscribe(subject.clone())
            .await
            .context("Failed to subscribe to room events")?;

        self.publish_control(
            room,
            &RoomControlMessage::Join {
                identity: identity.to_string(),
            },
        )
        .await?;

        info!("Joined room {} as {}", room, identity);

        let (tx, rx) = mpsc::channel(64);

        let event_task = tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                match serde_json::from_slice::<RoomEvent>(&msg.payload) {
                    Ok(event) => {
                        if tx.send(event).await.is_err() {
                            // Receiver dropped; the manager disconnected.
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to parse room event: {}", e);
                    }
                }
            }

            debug!("Room event forwarding task stopped");
        });

        let mut joined = self.joined.lock().await;
        if let Some(prev) = joined.replace(JoinedRoom {
            room: room.to_string(),
            identity: identity.to_string(),
            event_task,
        }) {
            prev.event_task.abort();
        }

        Ok(rx)
    }

    async fn subscribe_tracks(&self, participant_id: &str) -> Result<()> {
        let joined = self.joined.lock().await;
        let room = joined
            .as_ref()
            .map(|j| j.room.clone())
            .ok_or_else(|| anyhow::anyhow!("not joined to a room"))?;
        drop(joined);

        self.publish_control(
            &room,
            &RoomControlMessage::SubscribeTracks {
                participant_id: participant_id.to_string(),
            },
        )
        .await
    }

    async fn send_app_message(&self, message: &AppMessage) -> Result<()> {
        let joined = self.joined.lock().await;
        let room = joined
            .as_ref()
            .map(|j| j.room.clone())
            .ok_or_else(|| anyhow::anyhow!("not joined to a room"))?;
        drop(joined);

        let subject = format!("room.{}.app", room);
        let payload = serde_json::to_vec(message)?;

        self.client
            .publish(subject, payload.into())
            .await
            .context("Failed to publish app message")?;

        Ok(())
    }

    async fn set_local_audio(&self, enabled: bool) -> Result<()> {
        let joined = self.joined.lock().await;
        let room = joined
            .as_ref()
            .map(|j| j.room.clone())
            .ok_or_else(|| anyhow::anyhow!("not joined to a room"))?;
        drop(joined);

        self.publish_control(&room, &RoomControlMessage::SetLocalAudio { enabled })
            .await
    }

    async fn leave(&self) -> Result<()> {
        let mut joined = self.joined.lock().await;

        let Some(JoinedRoom {
            room,
            identity,
            event_task,
        }) = joined.take()
        else {
            return Ok(());
        };
        drop(joined);

        event_task.abort();

        self.publish_control(&room, &RoomControlMessage::Leave { identity })
            .await?;

        info!("Left room {}", room);

        Ok(())
    }
}
