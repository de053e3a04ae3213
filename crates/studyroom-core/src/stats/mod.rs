//! Study statistics.
//!
//! Running daily/weekly/total/streak counters fed by completed sessions,
//! plus the daily archive that reconciles those counters against the raw
//! session log.

mod aggregator;
mod archive;

pub use aggregator::{
    owner_shares, streak_as_of, week_start, OwnerShare, SeriesPoint, StudyStats,
    DAILY_SERIES_DAYS, WEEKLY_SERIES_WEEKS,
};

pub use archive::{
    validate, ArchiveSummary, Archiver, DailyArchive, ValidationReport, DEFAULT_HISTORY_DAYS,
    DEFAULT_RETENTION_DAYS, RECONCILE_TOLERANCE_SECS,
};
