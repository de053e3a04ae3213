//! Daily archives and reconciliation.
//!
//! An archive is a dated snapshot of one day's aggregated total next to what
//! the raw session log says about that day. A disagreement of more than one
//! second marks the snapshot invalid; it is still written, the flag is the
//! only consequence.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::aggregator::{round_hours, StudyStats};
use crate::error::Result;
use crate::session::StudySession;
use crate::storage::{self, KvStore, ARCHIVE_PREFIX};

/// Allowed difference between a daily total and its sessions, in seconds.
pub const RECONCILE_TOLERANCE_SECS: u64 = 1;
/// Archives older than this are eligible for removal.
pub const DEFAULT_RETENTION_DAYS: u32 = 90;
/// How far back `archive_recent` looks by default.
pub const DEFAULT_HISTORY_DAYS: u32 = 30;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Check every day in `daily_totals` against the sessions that started on it.
pub fn validate(daily_totals: &BTreeMap<NaiveDate, u64>, sessions: &[StudySession]) -> ValidationReport {
    let mut by_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for session in sessions {
        *by_day.entry(session.day()).or_insert(0) += session.duration_secs;
    }

    let errors: Vec<String> = daily_totals
        .iter()
        .filter_map(|(day, &recorded)| {
            let actual = by_day.get(day).copied().unwrap_or(0);
            (recorded.abs_diff(actual) > RECONCILE_TOLERANCE_SECS).then(|| {
                format!("{day}: recorded {recorded}s does not match session total {actual}s")
            })
        })
        .collect();

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// Immutable snapshot of one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyArchive {
    pub date: NaiveDate,
    pub total_secs: u64,
    pub session_count: usize,
    pub per_owner_secs: BTreeMap<String, u64>,
    pub created_at: DateTime<Utc>,
    pub is_valid: bool,
}

impl DailyArchive {
    /// Build the snapshot for `date` from the aggregated totals and the log.
    pub fn build(
        date: NaiveDate,
        daily_totals: &BTreeMap<NaiveDate, u64>,
        sessions: &[StudySession],
        created_at: DateTime<Utc>,
    ) -> Self {
        let day_sessions: Vec<StudySession> = sessions
            .iter()
            .filter(|s| s.day() == date)
            .cloned()
            .collect();

        let mut per_owner_secs = BTreeMap::new();
        for session in &day_sessions {
            *per_owner_secs
                .entry(session.owner_key().to_string())
                .or_insert(0) += session.duration_secs;
        }

        let total_secs = daily_totals.get(&date).copied().unwrap_or(0);
        let day_totals = BTreeMap::from([(date, total_secs)]);
        let report = validate(&day_totals, &day_sessions);
        for error in &report.errors {
            warn!(%date, error = %error, "daily archive does not reconcile");
        }

        Self {
            date,
            total_secs,
            session_count: day_sessions.len(),
            per_owner_secs,
            created_at,
            is_valid: report.is_valid,
        }
    }

    /// Equal in every field except `created_at`.
    pub fn same_content(&self, other: &DailyArchive) -> bool {
        self.date == other.date
            && self.total_secs == other.total_secs
            && self.session_count == other.session_count
            && self.per_owner_secs == other.per_owner_secs
            && self.is_valid == other.is_valid
    }

    pub fn summary(&self) -> ArchiveSummary {
        ArchiveSummary {
            date: self.date,
            total_hours: round_hours(self.total_secs),
            session_count: self.session_count,
            is_valid: self.is_valid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub date: NaiveDate,
    /// Rounded to one decimal.
    pub total_hours: f64,
    pub session_count: usize,
    pub is_valid: bool,
}

fn archive_key(date: NaiveDate) -> String {
    format!("{ARCHIVE_PREFIX}{date}")
}

fn date_from_key(key: &str) -> Option<NaiveDate> {
    key.strip_prefix(ARCHIVE_PREFIX)?.parse().ok()
}

/// Reads and writes archives in a key-value store, one key per day.
pub struct Archiver<'a, S: KvStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: KvStore + ?Sized> Archiver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Build and persist the archive for `date`, replacing any earlier one.
    ///
    /// # Errors
    /// Returns an error if the store write fails.
    pub fn archive_day(
        &self,
        date: NaiveDate,
        daily_totals: &BTreeMap<NaiveDate, u64>,
        sessions: &[StudySession],
        now: DateTime<Utc>,
    ) -> Result<DailyArchive> {
        let archive = DailyArchive::build(date, daily_totals, sessions, now);
        storage::save_json(self.store, &archive_key(date), &archive)?;
        info!(
            %date,
            total_secs = archive.total_secs,
            sessions = archive.session_count,
            is_valid = archive.is_valid,
            "daily archive written"
        );
        Ok(archive)
    }

    /// Archive every day of the last `days` days (today included) that has
    /// a daily total.
    ///
    /// # Errors
    /// Returns an error on the first failed store write.
    pub fn archive_recent(
        &self,
        stats: &StudyStats,
        sessions: &[StudySession],
        today: NaiveDate,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<DailyArchive>> {
        let Some(span) = days.checked_sub(1) else {
            return Ok(Vec::new());
        };
        let oldest = today
            .checked_sub_days(Days::new(span.into()))
            .unwrap_or(NaiveDate::MIN);
        let mut written = Vec::new();
        for (&date, _) in stats.daily_totals().range(oldest..=today).rev() {
            written.push(self.archive_day(date, stats.daily_totals(), sessions, now)?);
        }
        Ok(written)
    }

    /// Load one archive. Missing or unreadable entries read as `None`.
    pub fn load(&self, date: NaiveDate) -> Option<DailyArchive> {
        storage::load_json(self.store, &archive_key(date))
    }

    /// All readable archives, most recent first.
    ///
    /// # Errors
    /// Returns an error if the store cannot list its keys.
    pub fn list(&self) -> Result<Vec<DailyArchive>> {
        let mut archives: Vec<DailyArchive> = self
            .store
            .keys_with_prefix(ARCHIVE_PREFIX)?
            .iter()
            .filter_map(|key| date_from_key(key))
            .filter_map(|date| self.load(date))
            .collect();
        archives.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(archives)
    }

    /// Most-recent-first summaries, truncated to `limit`.
    ///
    /// # Errors
    /// Returns an error if the store cannot list its keys.
    pub fn summarize(&self, limit: usize) -> Result<Vec<ArchiveSummary>> {
        Ok(self
            .list()?
            .iter()
            .take(limit)
            .map(DailyArchive::summary)
            .collect())
    }

    /// Remove archives dated strictly before `today - days`. Returns how many
    /// were removed.
    ///
    /// # Errors
    /// Returns an error if listing or removing keys fails.
    pub fn purge_older_than(&self, days: u32, today: NaiveDate) -> Result<usize> {
        // A cutoff before the first representable date leaves nothing older.
        let Some(cutoff) = today.checked_sub_days(Days::new(days.into())) else {
            return Ok(0);
        };
        let mut removed = 0;
        for key in self.store.keys_with_prefix(ARCHIVE_PREFIX)? {
            match date_from_key(&key) {
                Some(date) if date < cutoff => {
                    if self.store.remove(&key)? {
                        removed += 1;
                    }
                }
                Some(_) => {}
                None => warn!(%key, "skipping archive key with unparseable date"),
            }
        }
        if removed > 0 {
            info!(removed, %cutoff, "purged old daily archives");
        }
        Ok(removed)
    }
}
