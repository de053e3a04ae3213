use clap::Subcommand;
use studyroom_core::Config;

use super::{open_room, print_json};

#[derive(Subcommand)]
pub enum ArchiveAction {
    /// Archive today
    Today,
    /// Archive every recent day that has study time
    Recent {
        /// How many days back, today included
        #[arg(long)]
        days: Option<u32>,
    },
    /// Summaries of archived days, most recent first
    List {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Remove archives older than the retention window
    Purge {
        #[arg(long)]
        days: Option<u32>,
    },
}

pub fn run(action: ArchiveAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let room = open_room(config)?;

    match action {
        ArchiveAction::Today => print_json(&room.archive_today()?)?,
        ArchiveAction::Recent { days } => {
            let written = room.archive_recent(days.unwrap_or(config.archive.history_days))?;
            print_json(&written)?;
        }
        ArchiveAction::List { limit } => {
            let limit = limit.unwrap_or(config.archive.summary_limit as usize);
            print_json(&room.summarize(limit)?)?;
        }
        ArchiveAction::Purge { days } => {
            let removed = room.purge_archives(days.unwrap_or(config.archive.retention_days))?;
            print_json(&serde_json::json!({ "removed": removed }))?;
        }
    }
    Ok(())
}
