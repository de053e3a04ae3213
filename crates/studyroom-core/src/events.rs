use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Phase, TimerStatus};

/// Every state change in the system produces an Event.
/// Hosts print or forward them; nothing in the core depends on who reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        phase: Phase,
        remaining_secs: u64,
        owner_id: Option<String>,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    /// The timer moved to a new owner. `cancelled_remaining_secs` is set when
    /// a running countdown of the previous owner was discarded.
    TimerRebound {
        from: Option<String>,
        to: String,
        cancelled_remaining_secs: Option<u64>,
        at: DateTime<Utc>,
    },
    TimerConfigured {
        focus_duration_secs: u64,
        break_duration_secs: u64,
        at: DateTime<Utc>,
    },
    PhaseCompleted {
        phase: Phase,
        owner_id: Option<String>,
        /// Phase the timer switched to as part of the completion.
        next_phase: Phase,
        next_running: bool,
        at: DateTime<Utc>,
    },
    SessionRecorded {
        session_id: String,
        owner_id: Option<String>,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    ArchiveWritten {
        date: NaiveDate,
        total_secs: u64,
        session_count: usize,
        is_valid: bool,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        status: TimerStatus,
        phase: Phase,
        remaining_secs: u64,
        total_secs: u64,
        /// 0.0 .. 1.0 progress within the current phase.
        progress: f64,
        running: bool,
        owner_id: Option<String>,
        at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::TimerReset {
            at: DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TimerReset");
        assert_eq!(json["at"], "2024-03-01T10:00:00Z");
    }
}
