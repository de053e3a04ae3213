//! Running study counters.
//!
//! [`StudyStats`] is folded forward one session at a time. Every update
//! touches the daily bucket, the weekly bucket, the all-time total and the
//! streak together, so `total_secs` always equals the sum of the recorded
//! session durations.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::session::StudySession;

/// Length of the daily chart series.
pub const DAILY_SERIES_DAYS: usize = 7;
/// Length of the weekly chart series.
pub const WEEKLY_SERIES_WEEKS: usize = 4;

/// Hours rounded to one decimal.
pub(crate) fn round_hours(secs: u64) -> f64 {
    (secs as f64 / 3600.0 * 10.0).round() / 10.0
}

/// One bucket of a daily or weekly series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// The day, or the Sunday the week starts on.
    pub start: NaiveDate,
    pub secs: u64,
    pub hours: f64,
}

/// An owner's slice of all recorded study time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerShare {
    pub owner_id: String,
    pub secs: u64,
    pub hours: f64,
    /// Whole percent of all session time.
    pub percentage: u32,
}

/// All-time study time per owner, largest first.
///
/// Sessions without an owner are grouped under
/// [`UNATTRIBUTED`](crate::session::UNATTRIBUTED).
pub fn owner_shares(sessions: &[StudySession]) -> Vec<OwnerShare> {
    let mut per_owner: BTreeMap<&str, u64> = BTreeMap::new();
    for session in sessions {
        *per_owner.entry(session.owner_key()).or_insert(0) += session.duration_secs;
    }
    let total: u64 = per_owner.values().sum();

    let mut shares: Vec<OwnerShare> = per_owner
        .into_iter()
        .map(|(owner, secs)| OwnerShare {
            owner_id: owner.to_string(),
            secs,
            hours: round_hours(secs),
            percentage: if total == 0 {
                0
            } else {
                (secs as f64 / total as f64 * 100.0).round() as u32
            },
        })
        .collect();
    shares.sort_by(|a, b| b.secs.cmp(&a.secs).then_with(|| a.owner_id.cmp(&b.owner_id)));
    shares
}

/// First day (Sunday) of the week containing `day`.
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_sunday() as i64)
}

/// Consecutive days ending at `today` with a nonzero total.
///
/// A day without study time today means no current streak, whatever
/// happened yesterday.
pub fn streak_as_of(daily_totals: &BTreeMap<NaiveDate, u64>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut day = today;
    while daily_totals.get(&day).copied().unwrap_or(0) > 0 {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyStats {
    #[serde(default)]
    daily_totals: BTreeMap<NaiveDate, u64>,
    #[serde(default)]
    weekly_totals: BTreeMap<NaiveDate, u64>,
    #[serde(default)]
    total_secs: u64,
    #[serde(default)]
    streak_days: u32,
}

impl StudyStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute every counter from the session log.
    pub fn rebuild(sessions: &[StudySession], today: NaiveDate) -> Self {
        let mut stats = Self::default();
        for session in sessions {
            stats.add(session);
        }
        stats.refresh_streak(today);
        stats
    }

    /// Fold one completed session into the counters.
    pub fn record_completion(&mut self, session: &StudySession, today: NaiveDate) {
        self.add(session);
        self.refresh_streak(today);
        debug!(
            day = %session.day(),
            total_secs = self.total_secs,
            streak_days = self.streak_days,
            "stats updated"
        );
    }

    /// Recompute the streak, e.g. after the calendar day changed.
    pub fn refresh_streak(&mut self, today: NaiveDate) {
        self.streak_days = streak_as_of(&self.daily_totals, today);
    }

    pub fn daily_totals(&self) -> &BTreeMap<NaiveDate, u64> {
        &self.daily_totals
    }

    pub fn weekly_totals(&self) -> &BTreeMap<NaiveDate, u64> {
        &self.weekly_totals
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    pub fn streak_days(&self) -> u32 {
        self.streak_days
    }

    pub fn day_secs(&self, day: NaiveDate) -> u64 {
        self.daily_totals.get(&day).copied().unwrap_or(0)
    }

    pub fn week_secs(&self, day: NaiveDate) -> u64 {
        self.weekly_totals
            .get(&week_start(day))
            .copied()
            .unwrap_or(0)
    }

    /// The last `days` days ending at `today`, oldest first.
    pub fn daily_series(&self, today: NaiveDate, days: usize) -> Vec<SeriesPoint> {
        let mut series: Vec<SeriesPoint> = (0..days as u64)
            .map_while(|back| today.checked_sub_days(Days::new(back)))
            .map(|day| point(day, self.day_secs(day)))
            .collect();
        series.reverse();
        series
    }

    /// The last `weeks` Sunday-started weeks ending with the current one,
    /// oldest first.
    pub fn weekly_series(&self, today: NaiveDate, weeks: usize) -> Vec<SeriesPoint> {
        let current = week_start(today);
        let mut series: Vec<SeriesPoint> = (0..weeks as u64)
            .map_while(|back| current.checked_sub_days(Days::new(back.saturating_mul(7))))
            .map(|start| point(start, self.weekly_totals.get(&start).copied().unwrap_or(0)))
            .collect();
        series.reverse();
        series
    }

    /// All-time hours divided by the number of days with study time, rounded
    /// to one decimal. Zero before the first session.
    pub fn average_daily_hours(&self) -> f64 {
        let active_days = self.daily_totals.values().filter(|&&secs| secs > 0).count();
        if active_days == 0 {
            return 0.0;
        }
        (self.total_secs as f64 / 3600.0 / active_days as f64 * 10.0).round() / 10.0
    }

    fn add(&mut self, session: &StudySession) {
        let day = session.day();
        *self.daily_totals.entry(day).or_insert(0) += session.duration_secs;
        *self.weekly_totals.entry(week_start(day)).or_insert(0) += session.duration_secs;
        self.total_secs += session.duration_secs;
    }
}

fn point(start: NaiveDate, secs: u64) -> SeriesPoint {
    SeriesPoint {
        start,
        secs,
        hours: round_hours(secs),
    }
}
