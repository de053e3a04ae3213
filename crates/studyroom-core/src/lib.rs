//! # Studyroom Core Library
//!
//! The engine behind a companion-themed Pomodoro study timer: a single
//! shared countdown that alternates focus and break phases, records every
//! completed focus phase as a study session, and folds sessions into
//! daily, weekly and streak statistics with a reconciling daily archive.
//!
//! ## Architecture
//!
//! - **Timer**: [`TimerEngine`] state machine plus the [`ClockDriver`] that
//!   ticks it once per second
//! - **Sessions & stats**: [`SessionRecorder`], [`StudyStats`] and the
//!   archive/validator in [`stats`]
//! - **Storage**: a small [`KvStore`] contract backed by SQLite
//!   ([`Database`]) or memory, plus TOML [`Config`]
//! - **Composition root**: [`StudyRoom`] wires all of the above together
//!   and is what hosts hold on to

pub mod clock;
pub mod error;
pub mod events;
pub mod room;
pub mod session;
pub mod sinks;
pub mod stats;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use events::Event;
pub use room::{RoomSettings, StudyRoom};
pub use session::{SessionRecorder, StudySession};
pub use sinks::{AlertListener, CompletionListener, NotificationSink, OwnerCatalog, SoundSink, ToneKind};
pub use stats::{
    ArchiveSummary, Archiver, DailyArchive, OwnerShare, SeriesPoint, StudyStats, ValidationReport,
};
pub use storage::{Config, Database, KvStore, MemoryStore};
pub use timer::{ClockDriver, Completion, Phase, TickTarget, TimerEngine, TimerStatus};
