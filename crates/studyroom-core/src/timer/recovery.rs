//! Restoring a persisted timer at application start.
//!
//! A countdown saved as "running" keeps running only if it was saved
//! recently. Anything older is brought back paused, so a timer that silently
//! elapsed while the app was closed does not pick up where it left off.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::engine::TimerEngine;

/// Default staleness window: one hour since the last persist.
pub const DEFAULT_STALENESS_SECS: i64 = 60 * 60;

/// Timer state as written to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedTimer {
    pub state: TimerEngine,
    pub saved_at: DateTime<Utc>,
}

impl PersistedTimer {
    pub fn new(state: TimerEngine, saved_at: DateTime<Utc>) -> Self {
        Self { state, saved_at }
    }
}

/// What happened to a restored timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RestoreOutcome {
    /// Saved stopped; restored as-is.
    Stopped,
    /// Saved running and recent enough; keeps counting.
    Resumed,
    /// Saved running but stale (or from the future); restored paused.
    Suspended { age_secs: i64 },
}

/// Whether a saved running countdown may continue automatically.
///
/// True only when the saved timer was running and `now - saved_at` lies in
/// `[0, window]`. A `saved_at` in the future means the clock moved backwards
/// and is treated as stale.
pub fn should_resume(saved: &PersistedTimer, now: DateTime<Utc>, window: Duration) -> bool {
    if !saved.state.is_running() {
        return false;
    }
    let age = now.signed_duration_since(saved.saved_at);
    age >= Duration::zero() && age <= window
}

/// Rebuild the engine from its persisted form, applying [`should_resume`].
///
/// Remaining time is kept either way; no catch-up for the time the app was
/// closed is attempted.
pub fn restore(saved: PersistedTimer, now: DateTime<Utc>, window: Duration) -> (TimerEngine, RestoreOutcome) {
    let resume = should_resume(&saved, now, window);
    let age_secs = now.signed_duration_since(saved.saved_at).num_seconds();
    let mut engine = saved.state.normalize();

    let outcome = if !engine.is_running() {
        RestoreOutcome::Stopped
    } else if resume {
        RestoreOutcome::Resumed
    } else {
        engine.suspend();
        RestoreOutcome::Suspended { age_secs }
    };
    (engine, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-06T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn running_engine() -> TimerEngine {
        let mut engine = TimerEngine::new(1500, 300).unwrap();
        engine.start(t0());
        engine.tick(t0() + Duration::seconds(1));
        engine
    }

    fn window() -> Duration {
        Duration::seconds(DEFAULT_STALENESS_SECS)
    }

    #[test]
    fn recent_running_timer_resumes() {
        let saved = PersistedTimer::new(running_engine(), t0());
        assert!(should_resume(&saved, t0() + Duration::minutes(59), window()));
        assert!(should_resume(&saved, t0() + Duration::minutes(60), window()));
    }

    #[test]
    fn stale_running_timer_does_not_resume() {
        let saved = PersistedTimer::new(running_engine(), t0());
        assert!(!should_resume(&saved, t0() + Duration::minutes(61), window()));
    }

    #[test]
    fn future_save_does_not_resume() {
        let saved = PersistedTimer::new(running_engine(), t0());
        assert!(!should_resume(&saved, t0() - Duration::seconds(5), window()));
    }

    #[test]
    fn stopped_timer_never_resumes() {
        let saved = PersistedTimer::new(TimerEngine::default(), t0());
        assert!(!should_resume(&saved, t0(), window()));
    }

    #[test]
    fn restore_suspends_stale_timer_and_keeps_remaining() {
        let saved = PersistedTimer::new(running_engine(), t0());
        let (engine, outcome) = restore(saved, t0() + Duration::hours(2), window());
        assert_eq!(outcome, RestoreOutcome::Suspended { age_secs: 7200 });
        assert!(!engine.is_running());
        assert_eq!(engine.remaining_secs(), 1499);
        assert!(engine.session_started_at().is_none());
        assert!(engine.invariants_hold());
    }

    #[test]
    fn restore_resumes_recent_timer() {
        let saved = PersistedTimer::new(running_engine(), t0());
        let (engine, outcome) = restore(saved, t0() + Duration::minutes(5), window());
        assert_eq!(outcome, RestoreOutcome::Resumed);
        assert!(engine.is_running());
        assert_eq!(engine.session_started_at(), Some(t0()));
    }
}
