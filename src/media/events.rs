use serde::{Deserialize, Serialize};

/// Media track category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Audio,
    Video,
}

/// Handle to a remote media track.
///
/// Persistent handles stay valid across renegotiation; transient handles are
/// delivered with individual track events and can be invalidated by later
/// renegotiation, so persistent handles are always preferred when building
/// the playback stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackHandle {
    pub id: String,
    pub persistent: bool,
}

/// Participant/track lifecycle events delivered by the media transport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoomEvent {
    ParticipantJoined {
        participant_id: String,
    },
    ParticipantUpdated {
        participant_id: String,
    },
    TrackStarted {
        participant_id: String,
        kind: TrackKind,
        track: TrackHandle,
    },
    ParticipantLeft {
        participant_id: String,
    },
    Disconnected {
        reason: String,
    },
}

/// Structured app messages sent to the remote avatar
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppMessage {
    /// Instruct the avatar to vocalize the given text.
    ///
    /// There is no completion reply; the caller estimates a speaking
    /// window from the text length.
    Speak { text: String },

    /// Cooperative remote-session termination request (best-effort)
    Terminate,
}
