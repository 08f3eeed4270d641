use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub nats: NatsConfig,
    pub media: MediaConfig,
    pub pacing: PacingConfig,
    pub limits: LimitsConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    pub url: String,
    /// Timeout for question/answer request round-trips
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Room names are `{room_prefix}{session_id}`
    pub room_prefix: String,
    /// Local participant identity in the room
    pub identity: String,
    /// Participant identities starting with this prefix are the avatar
    pub avatar_prefix: String,
    /// Inactivity window before the media session is reclaimed
    pub idle_timeout_secs: u64,
    /// How long session start waits for the avatar participant to join
    pub avatar_join_timeout_secs: u64,
    /// Spoken once at session start, with the candidate mic briefly open
    pub greeting: String,
    /// Gap between the greeting and the first question
    pub greeting_gap_ms: u64,
}

/// Timing heuristics for the turn-taking protocol.
///
/// These are tunable approximations, not contracts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Minimum avatar speaking window
    pub speak_floor_ms: u64,
    /// Speaking window increment per character of question text
    pub speak_per_char_ms: u64,
    /// Upper bound on the speaking window
    pub speak_cap_ms: u64,
    /// Wait after stopping the recognizer before finalizing the transcript,
    /// so a last in-flight final event can land
    pub settle_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Session mode → time budget in seconds; modes absent from the table
    /// are unbounded
    pub modes: HashMap<String, u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_duration_ms: u64,
    /// When false, sessions skip streaming recognition and candidates type
    /// their answers instead
    pub recognition_enabled: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "intervo".to_string(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8700,
        }
    }
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            room_prefix: "interview-".to_string(),
            identity: "candidate".to_string(),
            avatar_prefix: "interviewer".to_string(),
            idle_timeout_secs: 300,
            avatar_join_timeout_secs: 30,
            greeting: "Hello, and welcome! Take a breath and get comfortable. \
                       We will begin in a moment."
                .to_string(),
            greeting_gap_ms: 2000,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            speak_floor_ms: 3000,
            speak_per_char_ms: 55,
            speak_cap_ms: 30_000,
            settle_delay_ms: 800,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        let mut modes = HashMap::new();
        modes.insert("5min".to_string(), 300);
        modes.insert("15min".to_string(), 900);
        modes.insert("30min".to_string(), 1800);

        Self { modes }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            buffer_duration_ms: 100,
            recognition_enabled: true,
        }
    }
}

impl LimitsConfig {
    /// Time budget for a session mode; None means unbounded.
    pub fn time_limit_secs(&self, mode: &str) -> Option<u64> {
        self.modes.get(mode).copied()
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_lookup() {
        let limits = LimitsConfig::default();

        assert_eq!(limits.time_limit_secs("5min"), Some(300));
        assert_eq!(limits.time_limit_secs("15min"), Some(900));
        assert_eq!(limits.time_limit_secs("30min"), Some(1800));
        assert_eq!(limits.time_limit_secs("open"), None, "unknown modes are unbounded");
    }
}
