pub mod backend;

pub use backend::{AudioCapture, AudioFrame, CaptureConfig, ChannelCapture};
