mod driver;
mod engine;
mod phase;
mod recovery;

pub use driver::{ClockDriver, TickTarget};
pub use engine::{Completion, TimerEngine, DEFAULT_BREAK_SECS, DEFAULT_FOCUS_SECS};
pub use phase::{Phase, TimerStatus};
pub use recovery::{restore, should_resume, PersistedTimer, RestoreOutcome, DEFAULT_STALENESS_SECS};
