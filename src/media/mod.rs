//! Avatar media session management
//!
//! Owns the lifecycle of the remote avatar connection:
//! - Join the avatar room (idempotent, permission request is best-effort)
//! - Observe participant/track lifecycle events and attach the avatar's
//!   audio/video once tracks become playable
//! - Send "speak this text" app messages to the avatar
//! - Gate the candidate's outbound microphone (muted except the greeting)
//! - Retry playback muted when autoplay is rejected
//! - Tear the connection down explicitly or on inactivity

pub mod events;
pub mod manager;
pub mod playback;
pub mod transport;

pub use events::{AppMessage, RoomEvent, TrackHandle, TrackKind};
pub use manager::{MediaConnectionState, MediaSessionManager, MediaState};
pub use playback::{NullOutput, OutputSurface, PlaybackStart, RemoteStream};
pub use transport::{MediaTransport, NatsMediaTransport};
