mod config;
pub mod database;
pub mod kv;

pub use config::{ArchiveConfig, Config, LogConfig, NotificationsConfig, RecoveryConfig, TimerConfig};
pub use database::Database;
pub use kv::{
    load_json, save_json, KvStore, MemoryStore, ARCHIVE_PREFIX, SESSIONS_KEY, STATS_KEY,
    TIMER_STATE_KEY,
};

use std::path::PathBuf;

use crate::error::{Result, StorageError};

/// Returns `~/.config/studyroom[-dev]/` based on STUDYROOM_ENV.
///
/// Set STUDYROOM_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("STUDYROOM_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("studyroom-dev")
    } else {
        base_dir.join("studyroom")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
