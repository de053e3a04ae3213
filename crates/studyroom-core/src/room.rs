//! The composition root.
//!
//! [`StudyRoom`] owns the single timer, the session log, the statistics and
//! the store they persist to. Hosts construct one explicitly and hand it
//! around; nothing in the library reaches for a global.

use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::Result;
use crate::events::Event;
use crate::session::{SessionRecorder, StudySession};
use crate::sinks::CompletionListener;
use crate::stats::{
    self as stats, ArchiveSummary, Archiver, DailyArchive, OwnerShare, SeriesPoint, StudyStats,
    ValidationReport,
};
use crate::storage::{self, Config, KvStore, SESSIONS_KEY, STATS_KEY, TIMER_STATE_KEY};
use crate::timer::{
    self, Completion, PersistedTimer, Phase, RestoreOutcome, TickTarget, TimerEngine,
    DEFAULT_STALENESS_SECS,
};

/// Settings the root needs at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSettings {
    pub focus_duration_secs: u64,
    pub break_duration_secs: u64,
    pub staleness_secs: i64,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            focus_duration_secs: timer::DEFAULT_FOCUS_SECS,
            break_duration_secs: timer::DEFAULT_BREAK_SECS,
            staleness_secs: DEFAULT_STALENESS_SECS,
        }
    }
}

impl RoomSettings {
    pub fn from_config(config: &Config) -> Self {
        let (focus_duration_secs, break_duration_secs) = config.timer_durations();
        Self {
            focus_duration_secs,
            break_duration_secs,
            staleness_secs: i64::try_from(config.recovery.staleness_secs)
                .unwrap_or(DEFAULT_STALENESS_SECS),
        }
    }
}

pub struct StudyRoom<S: KvStore> {
    store: S,
    clock: Box<dyn Clock>,
    engine: TimerEngine,
    recorder: SessionRecorder,
    stats: StudyStats,
    listeners: Vec<Box<dyn CompletionListener>>,
    restore_outcome: Option<RestoreOutcome>,
}

impl<S: KvStore> StudyRoom<S> {
    /// Build the root from whatever the store holds.
    ///
    /// Missing or unreadable entries fall back to fresh state. A persisted
    /// timer is restored through [`timer::restore`].
    pub fn open(store: S, clock: impl Clock + 'static, settings: &RoomSettings) -> Self {
        let now = clock.now();
        let today = now.date_naive();

        let (engine, restore_outcome) =
            match storage::load_json::<_, PersistedTimer>(&store, TIMER_STATE_KEY) {
                Some(saved) => {
                    let window = Duration::seconds(settings.staleness_secs);
                    let (mut engine, outcome) = timer::restore(saved, now, window);
                    info!(?outcome, remaining_secs = engine.remaining_secs(), "timer restored");
                    adopt_settings(&mut engine, settings, now);
                    (engine, Some(outcome))
                }
                None => (
                    fresh_engine(settings.focus_duration_secs, settings.break_duration_secs),
                    None,
                ),
            };

        let recorder: SessionRecorder =
            storage::load_json(&store, SESSIONS_KEY).unwrap_or_default();
        let mut stats: StudyStats = storage::load_json(&store, STATS_KEY).unwrap_or_default();
        stats.refresh_streak(today);

        debug!(sessions = recorder.len(), "study room opened");
        Self {
            store,
            clock: Box::new(clock),
            engine,
            recorder,
            stats,
            listeners: Vec::new(),
            restore_outcome,
        }
    }

    /// Register a completion listener. Listeners run in subscription order.
    pub fn subscribe(&mut self, listener: impl CompletionListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn snapshot(&self) -> Event {
        self.engine.snapshot(self.clock.now())
    }

    pub fn stats(&self) -> &StudyStats {
        &self.stats
    }

    pub fn sessions(&self) -> &[StudySession] {
        self.recorder.sessions()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// How the timer came back at `open`, or `None` if nothing was saved.
    pub fn restore_outcome(&self) -> Option<&RestoreOutcome> {
        self.restore_outcome.as_ref()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    pub fn today_secs(&self) -> u64 {
        self.stats.day_secs(self.today())
    }

    pub fn week_secs(&self) -> u64 {
        self.stats.week_secs(self.today())
    }

    /// Per-day totals for the last `days` days, oldest first.
    pub fn daily_series(&self, days: usize) -> Vec<SeriesPoint> {
        self.stats.daily_series(self.today(), days)
    }

    /// Per-week totals for the last `weeks` Sunday weeks, oldest first.
    pub fn weekly_series(&self, weeks: usize) -> Vec<SeriesPoint> {
        self.stats.weekly_series(self.today(), weeks)
    }

    pub fn average_daily_hours(&self) -> f64 {
        self.stats.average_daily_hours()
    }

    pub fn owner_shares(&self) -> Vec<OwnerShare> {
        stats::owner_shares(self.recorder.sessions())
    }

    // ── Timer commands ───────────────────────────────────────────────

    pub fn bind(&mut self, owner_id: impl Into<String>) -> Option<Event> {
        let now = self.clock.now();
        let event = self.engine.bind(owner_id, now);
        if let Some(Event::TimerRebound {
            cancelled_remaining_secs: Some(remaining),
            ..
        }) = &event
        {
            warn!(remaining_secs = remaining, "rebind cancelled a running focus countdown");
        }
        self.persist_timer(now);
        event
    }

    pub fn start(&mut self) -> Option<Event> {
        let now = self.clock.now();
        let event = self.engine.start(now);
        self.persist_timer(now);
        event
    }

    pub fn pause(&mut self) -> Option<Event> {
        let now = self.clock.now();
        let event = self.engine.pause(now);
        self.persist_timer(now);
        event
    }

    pub fn reset(&mut self) -> Option<Event> {
        let now = self.clock.now();
        let event = self.engine.reset(now);
        self.persist_timer(now);
        event
    }

    /// # Errors
    /// Returns a validation error for a zero duration; nothing changes.
    pub fn configure(&mut self, focus_duration_secs: u64, break_duration_secs: u64) -> Result<Event> {
        let now = self.clock.now();
        let event = self
            .engine
            .configure(focus_duration_secs, break_duration_secs, now)?;
        self.persist_timer(now);
        Ok(event)
    }

    /// Advance the countdown by one second.
    ///
    /// Returns every event the tick produced: nothing for an ordinary
    /// second, or the phase completion followed by the recorded session and
    /// archive for a finished focus phase.
    pub fn tick(&mut self) -> Vec<Event> {
        if !self.engine.is_running() {
            return Vec::new();
        }
        let now = self.clock.now();
        let completion = self.engine.tick(now);
        self.persist_timer(now);

        let Some(completion) = completion else {
            return Vec::new();
        };
        info!(
            phase = completion.phase.label(),
            next = completion.next_phase.label(),
            "phase completed"
        );
        let mut events = vec![Event::PhaseCompleted {
            phase: completion.phase,
            owner_id: completion.owner_id.clone(),
            next_phase: completion.next_phase,
            next_running: completion.next_running,
            at: now,
        }];
        self.handle_completion(&completion, now, &mut events);
        events
    }

    // ── Statistics and archives ──────────────────────────────────────

    pub fn validate(&self) -> ValidationReport {
        let report = stats::validate(self.stats.daily_totals(), self.recorder.sessions());
        for error in &report.errors {
            warn!(%error, "statistics do not reconcile");
        }
        report
    }

    /// Recompute every counter from the session log and persist it.
    ///
    /// # Errors
    /// Returns an error if the store write fails; the in-memory stats are
    /// rebuilt regardless.
    pub fn rebuild_stats(&mut self) -> Result<&StudyStats> {
        self.stats = StudyStats::rebuild(self.recorder.sessions(), self.today());
        info!(total_secs = self.stats.total_secs(), "statistics rebuilt");
        storage::save_json(&self.store, STATS_KEY, &self.stats)?;
        Ok(&self.stats)
    }

    /// # Errors
    /// Returns an error if the store write fails.
    pub fn archive_today(&self) -> Result<DailyArchive> {
        let now = self.clock.now();
        self.archiver().archive_day(
            now.date_naive(),
            self.stats.daily_totals(),
            self.recorder.sessions(),
            now,
        )
    }

    /// # Errors
    /// Returns an error on the first failed store write.
    pub fn archive_recent(&self, days: u32) -> Result<Vec<DailyArchive>> {
        let now = self.clock.now();
        self.archiver().archive_recent(
            &self.stats,
            self.recorder.sessions(),
            now.date_naive(),
            days,
            now,
        )
    }

    pub fn load_archive(&self, date: NaiveDate) -> Option<DailyArchive> {
        self.archiver().load(date)
    }

    /// # Errors
    /// Returns an error if the store cannot list archives.
    pub fn summarize(&self, limit: usize) -> Result<Vec<ArchiveSummary>> {
        self.archiver().summarize(limit)
    }

    /// # Errors
    /// Returns an error if listing or removing archives fails.
    pub fn purge_archives(&self, days: u32) -> Result<usize> {
        self.archiver().purge_older_than(days, self.today())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn archiver(&self) -> Archiver<'_, S> {
        Archiver::new(&self.store)
    }

    fn handle_completion(&mut self, completion: &Completion, now: DateTime<Utc>, events: &mut Vec<Event>) {
        if let Some(session) = self.recorder.record(completion).cloned() {
            self.stats.record_completion(&session, now.date_naive());
            self.persist(SESSIONS_KEY, &self.recorder);
            self.persist(STATS_KEY, &self.stats);
            events.push(Event::SessionRecorded {
                session_id: session.id.clone(),
                owner_id: session.owner_id.clone(),
                duration_secs: session.duration_secs,
                at: now,
            });

            match self.archiver().archive_day(
                session.day(),
                self.stats.daily_totals(),
                self.recorder.sessions(),
                now,
            ) {
                Ok(archive) => {
                    if !archive.is_valid {
                        warn!(date = %archive.date, "archived day does not reconcile");
                    }
                    events.push(Event::ArchiveWritten {
                        date: archive.date,
                        total_secs: archive.total_secs,
                        session_count: archive.session_count,
                        is_valid: archive.is_valid,
                        at: now,
                    });
                }
                Err(e) => warn!(error = %e, "failed to archive day"),
            }
        }

        for listener in &mut self.listeners {
            listener.on_completed(completion);
        }
    }

    fn persist_timer(&self, now: DateTime<Utc>) {
        let saved = PersistedTimer::new(self.engine.clone(), now);
        self.persist(TIMER_STATE_KEY, &saved);
    }

    fn persist<T: serde::Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = storage::save_json(&self.store, key, value) {
            warn!(key, error = %e, "failed to persist state");
        }
    }
}

fn fresh_engine(focus_duration_secs: u64, break_duration_secs: u64) -> TimerEngine {
    TimerEngine::new(focus_duration_secs, break_duration_secs).unwrap_or_else(|e| {
        warn!(error = %e, "invalid timer durations, using defaults");
        TimerEngine::default()
    })
}

/// Apply configured durations to a restored timer that sits at a full,
/// stopped focus phase. A countdown in progress keeps its own lengths.
fn adopt_settings(engine: &mut TimerEngine, settings: &RoomSettings, now: DateTime<Utc>) {
    let untouched = !engine.is_running()
        && engine.phase() == Phase::Focus
        && engine.remaining_secs() == engine.focus_duration_secs();
    let changed = engine.focus_duration_secs() != settings.focus_duration_secs
        || engine.break_duration_secs() != settings.break_duration_secs;
    if !(untouched && changed) {
        return;
    }
    match engine.configure(settings.focus_duration_secs, settings.break_duration_secs, now) {
        Ok(_) => debug!(
            focus_secs = settings.focus_duration_secs,
            break_secs = settings.break_duration_secs,
            "restored timer picked up configured durations"
        ),
        Err(e) => warn!(error = %e, "ignoring invalid configured durations"),
    }
}

/// Lets a [`crate::timer::ClockDriver`] drive a shared room directly.
impl<S> TickTarget for Mutex<StudyRoom<S>>
where
    S: KvStore + Send + 'static,
{
    fn on_tick(&self) {
        let mut room = self.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for event in room.tick() {
            debug!(?event, "tick event");
        }
    }
}
