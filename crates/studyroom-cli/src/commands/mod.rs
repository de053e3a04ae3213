pub mod archive;
pub mod config;
pub mod stats;
pub mod timer;

use serde::Serialize;
use studyroom_core::{Config, CoreError, Database, RoomSettings, StudyRoom, SystemClock};

/// Open the room on the default database with the wall clock.
pub fn open_room(config: &Config) -> Result<StudyRoom<Database>, CoreError> {
    let db = Database::open()?;
    Ok(StudyRoom::open(db, SystemClock, &RoomSettings::from_config(config)))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
