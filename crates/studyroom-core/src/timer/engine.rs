//! Timer engine implementation.
//!
//! The engine is a tick-driven state machine. It does not own a thread or a
//! clock: the caller (normally [`ClockDriver`](super::ClockDriver) through the
//! composition root) invokes `tick()` once per second and passes the current
//! time into every command.
//!
//! ## State Transitions
//!
//! ```text
//!                start                    remaining == 0
//! Idle/Paused-Focus ----> Running-Focus ------------------> Running-Break
//!        ^    <---- pause ----'                                 |   ^
//!        |                                          pause       |   | start
//!        |                                                      v   |
//!        '--------------- remaining == 0 ---------------- Paused-Break
//! ```
//!
//! `reset()` and a rebind to another owner while running always land in
//! `Idle/Paused-Focus` with a full focus countdown.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::default();
//! engine.start(Utc::now());
//! // Once per second:
//! if let Some(completion) = engine.tick(Utc::now()) {
//!     // record the session, notify listeners
//! }
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::phase::{Phase, TimerStatus};
use crate::error::ValidationError;
use crate::events::Event;

pub const DEFAULT_FOCUS_SECS: u64 = 25 * 60;
pub const DEFAULT_BREAK_SECS: u64 = 5 * 60;

/// Produced by `tick()` when a phase countdown reaches zero.
///
/// Carries everything the session recorder needs, captured before the
/// auto-transition overwrote the engine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub phase: Phase,
    pub owner_id: Option<String>,
    pub session_started_at: Option<DateTime<Utc>>,
    pub completed_at: DateTime<Utc>,
    pub focus_duration_secs: u64,
    /// Phase the engine moved to as part of this completion.
    pub next_phase: Phase,
    pub next_running: bool,
}

/// Core timer engine.
///
/// Fields are private: consumers read through the query methods and change
/// state only through the commands, so the invariants below always hold.
///
/// - `remaining_secs <= max(focus_duration_secs, break_duration_secs)`
/// - `session_started_at.is_some()` only while running in the focus phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerEngine {
    phase: Phase,
    remaining_secs: u64,
    running: bool,
    #[serde(default)]
    owner_id: Option<String>,
    focus_duration_secs: u64,
    break_duration_secs: u64,
    #[serde(default)]
    session_started_at: Option<DateTime<Utc>>,
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::idle(DEFAULT_FOCUS_SECS, DEFAULT_BREAK_SECS)
    }
}

impl TimerEngine {
    /// Create an idle engine with the given durations.
    ///
    /// # Errors
    /// Returns a validation error if either duration is zero.
    pub fn new(focus_duration_secs: u64, break_duration_secs: u64) -> Result<Self, ValidationError> {
        validate_durations(focus_duration_secs, break_duration_secs)?;
        Ok(Self::idle(focus_duration_secs, break_duration_secs))
    }

    fn idle(focus_duration_secs: u64, break_duration_secs: u64) -> Self {
        Self {
            phase: Phase::Focus,
            remaining_secs: focus_duration_secs,
            running: false,
            owner_id: None,
            focus_duration_secs,
            break_duration_secs,
            session_started_at: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    pub fn focus_duration_secs(&self) -> u64 {
        self.focus_duration_secs
    }

    pub fn break_duration_secs(&self) -> u64 {
        self.break_duration_secs
    }

    pub fn session_started_at(&self) -> Option<DateTime<Utc>> {
        self.session_started_at
    }

    pub fn status(&self) -> TimerStatus {
        TimerStatus::from_parts(self.phase, self.running)
    }

    /// Configured length of the current phase.
    pub fn total_secs(&self) -> u64 {
        match self.phase {
            Phase::Focus => self.focus_duration_secs,
            Phase::Break => self.break_duration_secs,
        }
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn progress(&self) -> f64 {
        let total = self.total_secs();
        if total == 0 {
            return 0.0;
        }
        (1.0 - self.remaining_secs as f64 / total as f64).clamp(0.0, 1.0)
    }

    pub fn invariants_hold(&self) -> bool {
        let max = self.focus_duration_secs.max(self.break_duration_secs);
        let started_ok =
            self.session_started_at.is_none() || (self.running && self.phase == Phase::Focus);
        self.focus_duration_secs > 0
            && self.break_duration_secs > 0
            && self.remaining_secs <= max
            && started_ok
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Event {
        Event::StateSnapshot {
            status: self.status(),
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            total_secs: self.total_secs(),
            progress: self.progress(),
            running: self.running,
            owner_id: self.owner_id.clone(),
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Bind the timer to `owner_id`.
    ///
    /// A running countdown that belongs to a different owner is cancelled
    /// outright: the new owner starts from a full, stopped focus phase and
    /// nothing is recorded for the interrupted attempt.
    pub fn bind(&mut self, owner_id: impl Into<String>, now: DateTime<Utc>) -> Option<Event> {
        let owner_id = owner_id.into();
        if self.owner_id.as_deref() == Some(owner_id.as_str()) {
            return None;
        }

        let previous = self.owner_id.clone();
        let cancelled_remaining_secs = if self.running && previous.is_some() {
            let remaining = self.remaining_secs;
            self.reset_countdown();
            debug!(?previous, to = %owner_id, remaining, "rebind cancelled running countdown");
            Some(remaining)
        } else {
            None
        };
        self.owner_id = Some(owner_id.clone());

        Some(Event::TimerRebound {
            from: previous,
            to: owner_id,
            cancelled_remaining_secs,
            at: now,
        })
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.running {
            return None;
        }
        self.running = true;
        if self.phase == Phase::Focus {
            // Backdate by the focus time already counted down, so a resumed
            // session still spans its full length.
            let elapsed = self.focus_duration_secs.saturating_sub(self.remaining_secs);
            self.session_started_at = Some(now - Duration::seconds(elapsed as i64));
        }
        Some(Event::TimerStarted {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            owner_id: self.owner_id.clone(),
            at: now,
        })
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if !self.running {
            return None;
        }
        self.running = false;
        self.session_started_at = None;
        Some(Event::TimerPaused {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            at: now,
        })
    }

    pub fn reset(&mut self, now: DateTime<Utc>) -> Option<Event> {
        self.reset_countdown();
        Some(Event::TimerReset { at: now })
    }

    /// Change the configured durations.
    ///
    /// A stopped timer is reset to a fresh focus phase with the new length.
    /// A running one keeps counting, with its remaining time clamped to the
    /// new bounds.
    ///
    /// # Errors
    /// Returns a validation error if either duration is zero; the previous
    /// configuration is kept.
    pub fn configure(
        &mut self,
        focus_duration_secs: u64,
        break_duration_secs: u64,
        now: DateTime<Utc>,
    ) -> Result<Event, ValidationError> {
        validate_durations(focus_duration_secs, break_duration_secs)?;
        self.focus_duration_secs = focus_duration_secs;
        self.break_duration_secs = break_duration_secs;

        if self.running {
            self.remaining_secs = self
                .remaining_secs
                .min(focus_duration_secs.max(break_duration_secs));
        } else {
            self.reset_countdown();
        }

        Ok(Event::TimerConfigured {
            focus_duration_secs,
            break_duration_secs,
            at: now,
        })
    }

    /// Call once per second. Returns `Some(Completion)` when the current
    /// phase finishes; the auto-transition has already been applied by then.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Completion> {
        if !self.running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return None;
        }
        Some(self.complete(now))
    }

    /// Force the engine into a consistent state after deserializing it from
    /// an untrusted store.
    pub(crate) fn normalize(mut self) -> Self {
        if self.focus_duration_secs == 0 {
            self.focus_duration_secs = DEFAULT_FOCUS_SECS;
        }
        if self.break_duration_secs == 0 {
            self.break_duration_secs = DEFAULT_BREAK_SECS;
        }
        let max = self.focus_duration_secs.max(self.break_duration_secs);
        self.remaining_secs = self.remaining_secs.min(max);
        if !(self.running && self.phase == Phase::Focus) {
            self.session_started_at = None;
        }
        self
    }

    /// Stop without emitting an event. Used when a restored countdown is too
    /// old to resume.
    pub(crate) fn suspend(&mut self) {
        self.running = false;
        self.session_started_at = None;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn reset_countdown(&mut self) {
        self.running = false;
        self.phase = Phase::Focus;
        self.remaining_secs = self.focus_duration_secs;
        self.session_started_at = None;
    }

    fn complete(&mut self, now: DateTime<Utc>) -> Completion {
        let finished = self.phase;
        let owner_id = self.owner_id.clone();
        let session_started_at = self.session_started_at;

        match finished {
            Phase::Focus => {
                // Break starts on its own.
                self.phase = Phase::Break;
                self.remaining_secs = self.break_duration_secs;
                self.running = true;
                self.session_started_at = None;
            }
            Phase::Break => {
                // Focus waits for the user.
                self.reset_countdown();
            }
        }

        Completion {
            phase: finished,
            owner_id,
            session_started_at,
            completed_at: now,
            focus_duration_secs: self.focus_duration_secs,
            next_phase: self.phase,
            next_running: self.running,
        }
    }
}

fn validate_durations(focus_duration_secs: u64, break_duration_secs: u64) -> Result<(), ValidationError> {
    if focus_duration_secs == 0 {
        return Err(ValidationError::InvalidValue {
            field: "focus_duration_secs".into(),
            message: "must be greater than zero".into(),
        });
    }
    if break_duration_secs == 0 {
        return Err(ValidationError::InvalidValue {
            field: "break_duration_secs".into(),
            message: "must be greater than zero".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-06T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(secs)
    }

    #[test]
    fn starts_idle_with_full_focus() {
        let engine = TimerEngine::default();
        assert_eq!(engine.status(), TimerStatus::IdlePausedFocus);
        assert_eq!(engine.remaining_secs(), DEFAULT_FOCUS_SECS);
        assert!(engine.session_started_at().is_none());
        assert!(engine.invariants_hold());
    }

    #[test]
    fn start_pause_start() {
        let mut engine = TimerEngine::new(60, 30).unwrap();

        assert!(engine.start(t0()).is_some());
        assert_eq!(engine.status(), TimerStatus::RunningFocus);
        assert_eq!(engine.session_started_at(), Some(t0()));
        assert!(engine.start(at(1)).is_none(), "second start is a no-op");

        engine.tick(at(1));
        assert!(engine.pause(at(1)).is_some());
        assert_eq!(engine.remaining_secs(), 59);
        assert!(engine.session_started_at().is_none());
        assert!(engine.pause(at(2)).is_none());

        engine.start(at(5));
        // One second was already spent before the pause.
        assert_eq!(engine.session_started_at(), Some(at(4)));
        assert!(engine.invariants_hold());
    }

    #[test]
    fn resumed_focus_completion_spans_full_length() {
        let mut engine = TimerEngine::new(4, 1).unwrap();
        engine.start(t0());
        engine.tick(at(1));
        engine.tick(at(2));
        engine.pause(at(2));

        engine.start(at(600));
        engine.tick(at(601));
        let completion = engine.tick(at(602)).unwrap();
        let started = completion.session_started_at.unwrap();
        assert_eq!(completion.completed_at - started, Duration::seconds(4));
    }

    #[test]
    fn tick_does_nothing_while_stopped() {
        let mut engine = TimerEngine::new(3, 1).unwrap();
        assert!(engine.tick(t0()).is_none());
        assert_eq!(engine.remaining_secs(), 3);
    }

    #[test]
    fn focus_completion_auto_starts_break() {
        let mut engine = TimerEngine::new(2, 1).unwrap();
        engine.bind("kun", t0());
        engine.start(t0());

        assert!(engine.tick(at(1)).is_none());
        let completion = engine.tick(at(2)).expect("focus completes");

        assert_eq!(completion.phase, Phase::Focus);
        assert_eq!(completion.owner_id.as_deref(), Some("kun"));
        assert_eq!(completion.session_started_at, Some(t0()));
        assert_eq!(completion.focus_duration_secs, 2);
        assert_eq!(completion.next_phase, Phase::Break);
        assert!(completion.next_running);
        assert_eq!(engine.status(), TimerStatus::RunningBreak);
        assert_eq!(engine.remaining_secs(), 1);
        assert!(engine.invariants_hold());
    }

    #[test]
    fn break_completion_waits_for_user() {
        let mut engine = TimerEngine::new(2, 1).unwrap();
        engine.start(t0());
        engine.tick(at(1));
        engine.tick(at(2));

        let completion = engine.tick(at(3)).expect("break completes");
        assert_eq!(completion.phase, Phase::Break);
        assert!(!completion.next_running);
        assert_eq!(engine.status(), TimerStatus::IdlePausedFocus);
        assert_eq!(engine.remaining_secs(), 2);
        assert!(engine.tick(at(4)).is_none());
    }

    #[test]
    fn paused_break_can_be_resumed() {
        let mut engine = TimerEngine::new(1, 5).unwrap();
        engine.start(t0());
        engine.tick(at(1));
        engine.pause(at(2));
        assert_eq!(engine.status(), TimerStatus::PausedBreak);

        engine.start(at(3));
        assert_eq!(engine.status(), TimerStatus::RunningBreak);
        assert!(engine.session_started_at().is_none());
    }

    #[test]
    fn rebind_while_running_cancels_countdown() {
        let mut engine = TimerEngine::new(20, 5).unwrap();
        engine.bind("a", t0());
        engine.start(t0());
        for i in 1..=10 {
            assert!(engine.tick(at(i)).is_none());
        }
        assert_eq!(engine.remaining_secs(), 10);

        let event = engine.bind("b", at(10)).unwrap();
        match event {
            Event::TimerRebound {
                from,
                to,
                cancelled_remaining_secs,
                ..
            } => {
                assert_eq!(from.as_deref(), Some("a"));
                assert_eq!(to, "b");
                assert_eq!(cancelled_remaining_secs, Some(10));
            }
            other => panic!("Expected TimerRebound, got {other:?}"),
        }
        assert_eq!(engine.status(), TimerStatus::IdlePausedFocus);
        assert_eq!(engine.remaining_secs(), 20);
        assert_eq!(engine.owner_id(), Some("b"));
        assert!(engine.session_started_at().is_none());
    }

    #[test]
    fn rebind_same_owner_is_noop() {
        let mut engine = TimerEngine::new(20, 5).unwrap();
        engine.bind("a", t0());
        engine.start(t0());
        engine.tick(at(1));
        assert!(engine.bind("a", at(1)).is_none());
        assert!(engine.is_running());
        assert_eq!(engine.remaining_secs(), 19);
    }

    #[test]
    fn first_bind_keeps_unowned_countdown() {
        let mut engine = TimerEngine::new(20, 5).unwrap();
        engine.start(t0());
        engine.tick(at(1));
        engine.bind("a", at(1));
        assert!(engine.is_running());
        assert_eq!(engine.remaining_secs(), 19);
    }

    #[test]
    fn reset_goes_to_full_focus() {
        let mut engine = TimerEngine::new(2, 1).unwrap();
        engine.start(t0());
        engine.tick(at(1));
        engine.tick(at(2));
        engine.reset(at(2));
        assert_eq!(engine.status(), TimerStatus::IdlePausedFocus);
        assert_eq!(engine.remaining_secs(), 2);
    }

    #[test]
    fn configure_rejects_zero_and_keeps_previous() {
        let mut engine = TimerEngine::new(60, 30).unwrap();
        assert!(engine.configure(0, 30, t0()).is_err());
        assert!(engine.configure(60, 0, t0()).is_err());
        assert_eq!(engine.focus_duration_secs(), 60);
        assert_eq!(engine.break_duration_secs(), 30);
    }

    #[test]
    fn configure_resets_idle_timer() {
        let mut engine = TimerEngine::new(60, 30).unwrap();
        engine.configure(120, 10, t0()).unwrap();
        assert_eq!(engine.remaining_secs(), 120);
        assert_eq!(engine.phase(), Phase::Focus);
    }

    #[test]
    fn configure_clamps_running_timer() {
        let mut engine = TimerEngine::new(600, 30).unwrap();
        engine.start(t0());
        engine.tick(at(1));
        engine.configure(100, 20, at(1)).unwrap();
        assert!(engine.is_running());
        assert_eq!(engine.remaining_secs(), 100);
        assert!(engine.invariants_hold());
    }

    #[test]
    fn normalize_repairs_corrupt_state() {
        let json = r#"{
            "phase": "break",
            "remaining_secs": 9999,
            "running": false,
            "focus_duration_secs": 0,
            "break_duration_secs": 60,
            "session_started_at": "2024-05-06T09:00:00Z"
        }"#;
        let engine: TimerEngine = serde_json::from_str(json).unwrap();
        let engine = engine.normalize();
        assert_eq!(engine.focus_duration_secs(), DEFAULT_FOCUS_SECS);
        assert_eq!(engine.remaining_secs(), DEFAULT_FOCUS_SECS);
        assert!(engine.session_started_at().is_none());
        assert!(engine.invariants_hold());
    }

    #[test]
    fn snapshot_returns_valid_event() {
        let engine = TimerEngine::new(100, 10).unwrap();
        match engine.snapshot(t0()) {
            Event::StateSnapshot {
                status,
                remaining_secs,
                total_secs,
                progress,
                ..
            } => {
                assert_eq!(status, TimerStatus::IdlePausedFocus);
                assert_eq!(remaining_secs, 100);
                assert_eq!(total_secs, 100);
                assert_eq!(progress, 0.0);
            }
            _ => panic!("Expected StateSnapshot"),
        }
    }
}
