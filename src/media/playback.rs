use super::events::TrackHandle;
use anyhow::Result;
use tracing::debug;

/// Combined remote media stream built from the best available track handles
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteStream {
    pub audio: Option<TrackHandle>,
    pub video: Option<TrackHandle>,
}

impl RemoteStream {
    pub fn is_empty(&self) -> bool {
        self.audio.is_none() && self.video.is_none()
    }
}

/// Result of a playback start attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStart {
    Playing,
    /// The runtime refused unmuted playback (no user gesture yet).
    /// The caller retries muted and offers an "enable sound" affordance.
    AutoplayBlocked,
}

/// Output surface the avatar's media stream is rendered on.
///
/// The concrete surface is host-provided (a video element, a native view);
/// the manager only needs attach and play.
#[async_trait::async_trait]
pub trait OutputSurface: Send + Sync {
    /// Assign the remote stream to the surface, replacing any prior stream.
    async fn attach(&self, stream: RemoteStream) -> Result<()>;

    /// Start playback. `muted` playback is always permitted; unmuted
    /// playback may be rejected until a user gesture has occurred.
    async fn play(&self, muted: bool) -> Result<PlaybackStart>;
}

/// Surface that discards media, for headless operation.
pub struct NullOutput;

#[async_trait::async_trait]
impl OutputSurface for NullOutput {
    async fn attach(&self, stream: RemoteStream) -> Result<()> {
        debug!("Null output: attached stream {:?}", stream);
        Ok(())
    }

    async fn play(&self, _muted: bool) -> Result<PlaybackStart> {
        Ok(PlaybackStart::Playing)
    }
}
