use super::events::{AppMessage, RoomEvent, TrackHandle, TrackKind};
use super::playback::{OutputSurface, PlaybackStart, RemoteStream};
use super::transport::MediaTransport;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Connection lifecycle state.
///
/// Legal transitions: Disconnected → Joining → Joined → Disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaConnectionState {
    Disconnected,
    Joining,
    Joined,
}

/// Snapshot of the media session, read-only to the phase controller
#[derive(Debug, Clone, Serialize)]
pub struct MediaState {
    pub connection: MediaConnectionState,
    pub avatar_observed: bool,
    pub avatar_track_attached: bool,
    /// True while playback is muted pending a user gesture
    pub sound_blocked: bool,
}

struct Inner {
    conn: MediaConnectionState,
    avatar_id: Option<String>,
    /// Best known avatar track per kind; persistent handles win over
    /// transient per-event handles
    avatar_tracks: HashMap<TrackKind, TrackHandle>,
    attached: bool,
    sound_blocked: bool,
    last_activity: Instant,
    event_task: Option<JoinHandle<()>>,
    watchdog_task: Option<JoinHandle<()>>,
}

struct Shared {
    transport: Arc<dyn MediaTransport>,
    surface: Arc<dyn OutputSurface>,
    /// Participant identities starting with this prefix are the avatar
    avatar_prefix: String,
    idle_timeout: Duration,
    inner: Mutex<Inner>,
    /// True once joined with an avatar participant observed
    ready_tx: watch::Sender<bool>,
}

/// Owns the avatar room connection for one interview session.
///
/// Cheap to clone; all clones share one connection. The transport handle is
/// owned here (one per session), reused across re-initialization, with
/// `disconnect` as the explicit cleanup path.
#[derive(Clone)]
pub struct MediaSessionManager {
    shared: Arc<Shared>,
}

impl MediaSessionManager {
    pub fn new(
        transport: Arc<dyn MediaTransport>,
        surface: Arc<dyn OutputSurface>,
        avatar_prefix: String,
        idle_timeout: Duration,
    ) -> Self {
        let (ready_tx, _) = watch::channel(false);

        Self {
            shared: Arc::new(Shared {
                transport,
                surface,
                avatar_prefix,
                idle_timeout,
                inner: Mutex::new(Inner {
                    conn: MediaConnectionState::Disconnected,
                    avatar_id: None,
                    avatar_tracks: HashMap::new(),
                    attached: false,
                    sound_blocked: false,
                    last_activity: Instant::now(),
                    event_task: None,
                    watchdog_task: None,
                }),
                ready_tx,
            }),
        }
    }

    /// Join the avatar room. Idempotent: if already joined (or a join is in
    /// flight) this returns immediately.
    pub async fn connect(&self, room: &str, identity: &str) -> Result<()> {
        {
            let mut inner = self.shared.inner.lock().await;
            match inner.conn {
                MediaConnectionState::Joined | MediaConnectionState::Joining => {
                    debug!("connect(): already {:?}", inner.conn);
                    return Ok(());
                }
                MediaConnectionState::Disconnected => {
                    inner.conn = MediaConnectionState::Joining;
                }
            }
        }

        // Permission is best-effort: only remote media is rendered, so a
        // denied microphone must not abort the join.
        if let Err(e) = self.shared.transport.request_permissions().await {
            warn!("Device permission request failed: {}", e);
        }

        let events = match self.shared.transport.join(room, identity).await {
            Ok(rx) => rx,
            Err(e) => {
                let mut inner = self.shared.inner.lock().await;
                inner.conn = MediaConnectionState::Disconnected;
                return Err(e).context("Failed to join avatar room");
            }
        };

        info!("Media session joined room {}", room);

        {
            let mut inner = self.shared.inner.lock().await;
            inner.conn = MediaConnectionState::Joined;
            inner.last_activity = Instant::now();

            let event_task = tokio::spawn(Self::event_loop(self.clone(), events));
            if let Some(prev) = inner.event_task.replace(event_task) {
                prev.abort();
            }

            let watchdog = tokio::spawn(Self::idle_watchdog(self.clone()));
            if let Some(prev) = inner.watchdog_task.replace(watchdog) {
                prev.abort();
            }
        }

        self.update_ready().await;

        Ok(())
    }

    /// Instruct the avatar to vocalize `text`.
    ///
    /// Only legal once joined with an avatar participant observed. There is
    /// no completion reply; the caller estimates a speaking window from the
    /// text length.
    pub async fn speak(&self, text: &str) -> Result<()> {
        {
            let inner = self.shared.inner.lock().await;
            if inner.conn != MediaConnectionState::Joined {
                anyhow::bail!("cannot speak: media session not joined");
            }
            if inner.avatar_id.is_none() {
                anyhow::bail!("cannot speak: no avatar participant observed");
            }
        }

        self.shared
            .transport
            .send_app_message(&AppMessage::Speak {
                text: text.to_string(),
            })
            .await
            .context("Failed to deliver speak command")
    }

    /// Gate the candidate's outbound microphone.
    ///
    /// Policy: always muted except the brief greeting handshake; the avatar
    /// must never hear the candidate's answer.
    pub async fn set_local_audio_enabled(&self, enabled: bool) -> Result<()> {
        self.shared
            .transport
            .set_local_audio(enabled)
            .await
            .context("Failed to set local audio state")
    }

    /// Record user activity: resets the idle window and, if playback is
    /// muted pending a gesture, retries unmuted playback.
    pub async fn note_activity(&self) {
        let retry_sound = {
            let mut inner = self.shared.inner.lock().await;
            inner.last_activity = Instant::now();
            inner.sound_blocked && inner.attached
        };

        if retry_sound {
            match self.shared.surface.play(false).await {
                Ok(PlaybackStart::Playing) => {
                    let mut inner = self.shared.inner.lock().await;
                    inner.sound_blocked = false;
                    info!("Playback unmuted after user interaction");
                }
                Ok(PlaybackStart::AutoplayBlocked) => {
                    debug!("Unmuted playback still blocked");
                }
                Err(e) => {
                    warn!("Unmuted playback retry failed: {}", e);
                }
            }
        }
    }

    /// Best-effort cooperative remote-session termination request.
    /// Failures are logged, not retried.
    pub async fn terminate_remote(&self) {
        if let Err(e) = self
            .shared
            .transport
            .send_app_message(&AppMessage::Terminate)
            .await
        {
            warn!("Remote termination request failed: {}", e);
        }
    }

    /// Tear down the connection and all listeners. Safe to call multiple
    /// times and from teardown paths.
    pub async fn disconnect(&self) {
        {
            let mut inner = self.shared.inner.lock().await;
            if inner.conn == MediaConnectionState::Disconnected {
                return;
            }

            inner.conn = MediaConnectionState::Disconnected;
            inner.avatar_id = None;
            inner.avatar_tracks.clear();
            inner.attached = false;

            if let Some(task) = inner.event_task.take() {
                task.abort();
            }
            if let Some(task) = inner.watchdog_task.take() {
                task.abort();
            }
        }

        self.shared.ready_tx.send_replace(false);

        if let Err(e) = self.shared.transport.leave().await {
            warn!("Transport leave failed: {}", e);
        }

        info!("Media session disconnected");
    }

    /// Current state snapshot (read-only to callers)
    pub async fn state(&self) -> MediaState {
        let inner = self.shared.inner.lock().await;
        MediaState {
            connection: inner.conn,
            avatar_observed: inner.avatar_id.is_some(),
            avatar_track_attached: inner.attached,
            sound_blocked: inner.sound_blocked,
        }
    }

    /// Wait until joined with an avatar participant observed.
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<()> {
        let mut ready = self.shared.ready_tx.subscribe();

        tokio::time::timeout(timeout, async {
            loop {
                if *ready.borrow() {
                    return;
                }
                if ready.changed().await.is_err() {
                    return;
                }
            }
        })
        .await
        .context("Timed out waiting for the avatar to join")?;

        if !*self.shared.ready_tx.subscribe().borrow() {
            anyhow::bail!("media session closed before the avatar joined");
        }

        Ok(())
    }

    fn is_avatar(&self, participant_id: &str) -> bool {
        participant_id.starts_with(&self.shared.avatar_prefix)
    }

    async fn update_ready(&self) {
        let ready = {
            let inner = self.shared.inner.lock().await;
            inner.conn == MediaConnectionState::Joined && inner.avatar_id.is_some()
        };
        self.shared.ready_tx.send_replace(ready);
    }

    async fn event_loop(manager: MediaSessionManager, mut events: mpsc::Receiver<RoomEvent>) {
        debug!("Room event loop started");

        while let Some(event) = events.recv().await {
            manager.handle_room_event(event).await;
        }

        debug!("Room event loop stopped");
    }

    async fn handle_room_event(&self, event: RoomEvent) {
        match event {
            RoomEvent::ParticipantJoined { participant_id }
            | RoomEvent::ParticipantUpdated { participant_id } => {
                if !self.is_avatar(&participant_id) {
                    return;
                }

                {
                    let mut inner = self.shared.inner.lock().await;
                    if inner.avatar_id.as_deref() != Some(&participant_id) {
                        info!("Avatar participant observed: {}", participant_id);
                    }
                    inner.avatar_id = Some(participant_id.clone());
                }

                // Duplicate joined events for the same participant are
                // expected; re-subscribing is idempotent.
                if let Err(e) = self.shared.transport.subscribe_tracks(&participant_id).await {
                    warn!("Track subscription request failed: {}", e);
                }

                self.update_ready().await;
            }

            RoomEvent::TrackStarted {
                participant_id,
                kind,
                track,
            } => {
                if !self.is_avatar(&participant_id) {
                    return;
                }

                self.store_track(kind, track).await;
                self.attach_avatar_stream().await;
            }

            RoomEvent::ParticipantLeft { participant_id } => {
                if !self.is_avatar(&participant_id) {
                    return;
                }

                warn!("Avatar participant left: {}", participant_id);

                {
                    let mut inner = self.shared.inner.lock().await;
                    inner.avatar_id = None;
                    inner.avatar_tracks.clear();
                    inner.attached = false;
                }

                self.update_ready().await;
            }

            RoomEvent::Disconnected { reason } => {
                warn!("Media transport disconnected: {}", reason);

                // Drop our own task handle so disconnect() does not abort
                // the event loop out from under this teardown.
                self.shared.inner.lock().await.event_task.take();
                self.disconnect().await;
            }
        }
    }

    /// Keep the best handle per track kind: a persistent handle always
    /// replaces a transient one, never the reverse (the transient handle
    /// can be invalidated by subsequent renegotiation).
    async fn store_track(&self, kind: TrackKind, track: TrackHandle) {
        let mut inner = self.shared.inner.lock().await;

        let keep_existing = matches!(
            inner.avatar_tracks.get(&kind),
            Some(existing) if existing.persistent && !track.persistent
        );

        if keep_existing {
            debug!("Keeping persistent {:?} handle over transient {}", kind, track.id);
        } else {
            inner.avatar_tracks.insert(kind, track);
        }
    }

    /// Build the combined stream from the best available handles, assign it
    /// to the output surface, and start playback proactively. On autoplay
    /// rejection, retry muted and leave the enable-sound affordance up.
    async fn attach_avatar_stream(&self) {
        let stream = {
            let inner = self.shared.inner.lock().await;
            RemoteStream {
                audio: inner.avatar_tracks.get(&TrackKind::Audio).cloned(),
                video: inner.avatar_tracks.get(&TrackKind::Video).cloned(),
            }
        };

        if stream.is_empty() {
            return;
        }

        if let Err(e) = self.shared.surface.attach(stream).await {
            error!("Failed to attach avatar stream: {}", e);
            return;
        }

        let start = match self.shared.surface.play(false).await {
            Ok(start) => start,
            Err(e) => {
                error!("Playback start failed: {}", e);
                return;
            }
        };

        let mut inner = self.shared.inner.lock().await;
        inner.attached = true;

        match start {
            PlaybackStart::Playing => {
                inner.sound_blocked = false;
                info!("Avatar stream playing");
            }
            PlaybackStart::AutoplayBlocked => {
                drop(inner);

                // Hard requirement: muted playback must proceed so the
                // session is usable before any user gesture.
                match self.shared.surface.play(true).await {
                    Ok(_) => {
                        let mut inner = self.shared.inner.lock().await;
                        inner.sound_blocked = true;
                        warn!("Autoplay rejected; playing muted until user interaction");
                    }
                    Err(e) => {
                        error!("Muted playback retry failed: {}", e);
                    }
                }
            }
        }
    }

    /// Reclaims the media session after a fixed window with no tracked user
    /// activity. The window resets on activity, not a fixed deadline.
    async fn idle_watchdog(manager: MediaSessionManager) {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.tick().await;

        loop {
            interval.tick().await;

            let idle_for = {
                let inner = manager.shared.inner.lock().await;
                if inner.conn != MediaConnectionState::Joined {
                    break;
                }
                inner.last_activity.elapsed()
            };

            if idle_for >= manager.shared.idle_timeout {
                info!(
                    "No user activity for {:?}; terminating media session",
                    idle_for
                );

                // Drop our own task handle so disconnect() does not abort
                // this task before the teardown completes.
                manager.shared.inner.lock().await.watchdog_task.take();
                manager.terminate_remote().await;
                manager.disconnect().await;
                break;
            }
        }
    }
}
