//! Completed study sessions and the append-only log that holds them.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::timer::{Completion, Phase};

/// Key used wherever sessions are grouped by owner and the owner is unknown.
pub const UNATTRIBUTED: &str = "unattributed";

/// One finished focus countdown. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySession {
    pub id: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Focus time only; always the configured focus length.
    pub duration_secs: u64,
}

impl StudySession {
    /// Calendar day the session counts towards.
    pub fn day(&self) -> NaiveDate {
        self.start_time.date_naive()
    }

    pub fn owner_key(&self) -> &str {
        self.owner_id.as_deref().unwrap_or(UNATTRIBUTED)
    }

    /// Build the session for a focus completion. Break completions yield
    /// nothing.
    ///
    /// The duration is the nominal focus length: completion only happens after
    /// exactly that many effective ticks, so paused time never inflates it.
    pub fn from_completion(completion: &Completion) -> Option<Self> {
        if completion.phase != Phase::Focus {
            return None;
        }
        let duration_secs = completion.focus_duration_secs;
        let start_time = completion.session_started_at.unwrap_or_else(|| {
            completion.completed_at - Duration::seconds(duration_secs as i64)
        });
        Some(Self {
            id: Uuid::new_v4().to_string(),
            owner_id: completion.owner_id.clone(),
            start_time,
            end_time: completion.completed_at,
            duration_secs,
        })
    }
}

/// Append-only session log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionRecorder {
    sessions: Vec<StudySession>,
}

impl SessionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn a completion into a session and append it. Returns the new
    /// session, or `None` for a break completion.
    pub fn record(&mut self, completion: &Completion) -> Option<&StudySession> {
        let session = StudySession::from_completion(completion)?;
        info!(
            session_id = %session.id,
            owner = session.owner_key(),
            duration_secs = session.duration_secs,
            "study session recorded"
        );
        self.sessions.push(session);
        self.sessions.last()
    }

    pub fn sessions(&self) -> &[StudySession] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
