use crate::config::PacingConfig;
use std::time::Duration;

/// Estimate how long the avatar will take to vocalize `text`.
///
/// The transport exposes no "done speaking" signal, so the controller waits
/// out an estimated window before opening the microphone: a floor plus a
/// per-character increment, capped. The constants are tunable configuration,
/// not a contract; if the transport ever grows a real completion signal this
/// function is the only thing it replaces.
pub fn speaking_window(pacing: &PacingConfig, text: &str) -> Duration {
    let chars = text.chars().count() as u64;
    let estimate_ms = pacing.speak_floor_ms + chars * pacing.speak_per_char_ms;

    Duration::from_millis(estimate_ms.min(pacing.speak_cap_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_never_below_floor() {
        let pacing = PacingConfig::default();

        let window = speaking_window(&pacing, "Hi.");
        assert!(window >= Duration::from_millis(pacing.speak_floor_ms));
    }

    #[test]
    fn test_window_scales_with_length() {
        let pacing = PacingConfig::default();

        // 27 chars, the canonical first question
        let short = speaking_window(&pacing, "Tell me about yourself.");
        let long = speaking_window(
            &pacing,
            "Walk me through a project where you had to balance competing \
             deadlines across multiple teams.",
        );

        assert!(short >= Duration::from_millis(3000));
        assert!(long > short, "longer questions get longer windows");
    }

    #[test]
    fn test_window_is_capped() {
        let pacing = PacingConfig::default();

        let window = speaking_window(&pacing, &"x".repeat(100_000));
        assert_eq!(window, Duration::from_millis(pacing.speak_cap_ms));
    }
}
