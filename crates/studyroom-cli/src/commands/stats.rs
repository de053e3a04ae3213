use clap::Subcommand;
use studyroom_core::stats::{DAILY_SERIES_DAYS, WEEKLY_SERIES_WEEKS};
use studyroom_core::Config;

use super::{open_room, print_json};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Totals, streak, recent daily/weekly series and per-companion shares
    Show,
    /// Reconcile daily totals against the session log
    Validate,
    /// Recompute all counters from the session log
    Rebuild,
}

pub fn run(action: StatsAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut room = open_room(config)?;

    match action {
        StatsAction::Show => {
            let stats = room.stats();
            print_json(&serde_json::json!({
                "today_secs": room.today_secs(),
                "week_secs": room.week_secs(),
                "total_secs": stats.total_secs(),
                "streak_days": stats.streak_days(),
                "session_count": room.sessions().len(),
                "average_daily_hours": room.average_daily_hours(),
                "last_7_days": room.daily_series(DAILY_SERIES_DAYS),
                "last_4_weeks": room.weekly_series(WEEKLY_SERIES_WEEKS),
                "owners": room.owner_shares(),
            }))?;
        }
        StatsAction::Validate => {
            let report = room.validate();
            print_json(&report)?;
            if !report.is_valid {
                return Err(format!("{} day(s) do not reconcile", report.errors.len()).into());
            }
        }
        StatsAction::Rebuild => {
            let stats = room.rebuild_stats()?;
            print_json(stats)?;
        }
    }
    Ok(())
}
