//! Turn timer for interview sessions
//!
//! Tracks elapsed time and, for bounded modes, remaining time. Ticks once
//! per second while active and stops cleanly at zero. Ticking is independent
//! of phase transitions: pausing is a caller decision, never an automatic
//! side effect, since a question can be pending for reasons unrelated to
//! elapsed time.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Snapshot of the timer counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerState {
    /// Monotonic up-counter, seconds since the timer first started
    pub elapsed_secs: u64,
    /// Down-counter for bounded modes; None in unbounded mode
    pub remaining_secs: Option<u64>,
    pub is_active: bool,
}

/// One-second interview timer.
///
/// A generation counter guards the tick task: stopping and restarting the
/// timer invalidates any tick task still draining its interval, so a stale
/// task can never touch the restarted counters.
pub struct TurnTimer {
    elapsed: Arc<AtomicU64>,
    /// u64::MAX encodes "unbounded" so the counter can live in an atomic
    remaining: Arc<AtomicU64>,
    active: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
    tick_task: Mutex<Option<JoinHandle<()>>>,
}

const UNBOUNDED: u64 = u64::MAX;

impl TurnTimer {
    pub fn new() -> Self {
        Self {
            elapsed: Arc::new(AtomicU64::new(0)),
            remaining: Arc::new(AtomicU64::new(UNBOUNDED)),
            active: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            tick_task: Mutex::new(None),
        }
    }

    /// Start (or restart) ticking.
    ///
    /// `limit_secs` comes from the session's mode lookup: Some(n) for a
    /// bounded mode, None for unbounded. Counters are reset on start.
    pub async fn start(&self, limit_secs: Option<u64>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        self.elapsed.store(0, Ordering::SeqCst);
        self.remaining
            .store(limit_secs.unwrap_or(UNBOUNDED), Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);

        info!("Timer started (limit: {:?}s)", limit_secs);

        let elapsed = Arc::clone(&self.elapsed);
        let remaining = Arc::clone(&self.remaining);
        let active = Arc::clone(&self.active);
        let generations = Arc::clone(&self.generation);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // The first tick completes immediately; skip it so the counters
            // move one second after start, not at start.
            interval.tick().await;

            loop {
                interval.tick().await;

                if generations.load(Ordering::SeqCst) != generation
                    || !active.load(Ordering::SeqCst)
                {
                    break;
                }

                elapsed.fetch_add(1, Ordering::SeqCst);

                let rem = remaining.load(Ordering::SeqCst);
                if rem != UNBOUNDED {
                    let next = rem.saturating_sub(1);
                    remaining.store(next, Ordering::SeqCst);

                    if next == 0 {
                        info!("Timer reached zero, stopping");
                        active.store(false, Ordering::SeqCst);
                        break;
                    }
                }
            }

            debug!("Timer tick task exited");
        });

        let mut handle = self.tick_task.lock().await;
        if let Some(prev) = handle.replace(task) {
            prev.abort();
        }
    }

    /// Pause ticking without resetting the counters.
    pub async fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);

        let mut handle = self.tick_task.lock().await;
        if let Some(task) = handle.take() {
            task.abort();
        }

        debug!("Timer stopped at {}s elapsed", self.elapsed.load(Ordering::SeqCst));
    }

    /// True once a bounded timer has counted down to zero.
    pub fn is_expired(&self) -> bool {
        self.remaining.load(Ordering::SeqCst) == 0
    }

    pub fn snapshot(&self) -> TimerState {
        let remaining = self.remaining.load(Ordering::SeqCst);

        TimerState {
            elapsed_secs: self.elapsed.load(Ordering::SeqCst),
            remaining_secs: (remaining != UNBOUNDED).then_some(remaining),
            is_active: self.active.load(Ordering::SeqCst),
        }
    }
}

impl Default for TurnTimer {
    fn default() -> Self {
        Self::new()
    }
}
