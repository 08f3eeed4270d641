pub mod audio;
pub mod config;
pub mod http;
pub mod media;
pub mod nats;
pub mod phase;
pub mod recognizer;
pub mod services;
pub mod session;
pub mod timer;
pub mod transcript;

pub use audio::{AudioCapture, AudioFrame, CaptureConfig, ChannelCapture};
pub use config::Config;
pub use http::{create_router, AppState};
pub use media::{
    MediaConnectionState, MediaSessionManager, MediaTransport, OutputSurface, RoomEvent,
};
pub use nats::{AudioFrameMessage, NatsClient, TranscriptMessage};
pub use phase::{Phase, PhaseController, PhaseEvent};
pub use recognizer::{NatsRecognizer, SpeechRecognizer};
pub use services::{AnswerService, Question, QuestionService};
pub use session::{InterviewSession, SessionConfig, SessionStats};
pub use timer::{TimerState, TurnTimer};
pub use transcript::{TranscriptAccumulator, TurnTranscript};
