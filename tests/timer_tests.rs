// Tests for the turn timer
//
// These run on a paused tokio clock; sleeps auto-advance virtual time, so
// the one-second ticks fire deterministically without real waiting.

use intervo::timer::TurnTimer;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_unbounded_mode_counts_up_only() {
    let timer = TurnTimer::new();
    timer.start(None).await;

    tokio::time::sleep(Duration::from_millis(5500)).await;

    let state = timer.snapshot();
    assert_eq!(state.elapsed_secs, 5);
    assert_eq!(state.remaining_secs, None, "unbounded mode has no countdown");
    assert!(state.is_active);
}

#[tokio::test(start_paused = true)]
async fn test_bounded_mode_counts_down() {
    let timer = TurnTimer::new();
    timer.start(Some(300)).await;

    tokio::time::sleep(Duration::from_millis(3500)).await;

    let state = timer.snapshot();
    assert_eq!(state.elapsed_secs, 3);
    assert_eq!(state.remaining_secs, Some(297));
    assert!(state.is_active);
}

#[tokio::test(start_paused = true)]
async fn test_bounded_timer_stops_at_exactly_zero() {
    let timer = TurnTimer::new();
    timer.start(Some(3)).await;

    // Run well past the limit; remaining must pin at 0, never negative
    tokio::time::sleep(Duration::from_secs(10)).await;

    let state = timer.snapshot();
    assert_eq!(state.remaining_secs, Some(0));
    assert_eq!(state.elapsed_secs, 3, "ticking stops when the limit is reached");
    assert!(!state.is_active);
    assert!(timer.is_expired());
}

#[tokio::test(start_paused = true)]
async fn test_stop_pauses_without_resetting() {
    let timer = TurnTimer::new();
    timer.start(Some(60)).await;

    tokio::time::sleep(Duration::from_millis(2500)).await;
    timer.stop().await;

    let before = timer.snapshot();
    assert_eq!(before.elapsed_secs, 2);
    assert_eq!(before.remaining_secs, Some(58));
    assert!(!before.is_active);

    // No ticking while stopped
    tokio::time::sleep(Duration::from_secs(5)).await;

    let after = timer.snapshot();
    assert_eq!(after.elapsed_secs, 2);
    assert_eq!(after.remaining_secs, Some(58));
}

#[tokio::test(start_paused = true)]
async fn test_restart_resets_counters_and_invalidates_old_task() {
    let timer = TurnTimer::new();
    timer.start(Some(5)).await;

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(timer.snapshot().elapsed_secs, 2);

    // Restart with a new limit; the first tick task must not keep
    // mutating the restarted counters
    timer.start(Some(10)).await;
    tokio::time::sleep(Duration::from_millis(3500)).await;

    let state = timer.snapshot();
    assert_eq!(state.elapsed_secs, 3);
    assert_eq!(state.remaining_secs, Some(7));
}

#[tokio::test(start_paused = true)]
async fn test_not_expired_while_running_or_unbounded() {
    let timer = TurnTimer::new();

    timer.start(Some(30)).await;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!timer.is_expired());

    timer.start(None).await;
    tokio::time::sleep(Duration::from_secs(100)).await;
    assert!(!timer.is_expired(), "unbounded timers never expire");
}
