use serde::{Deserialize, Serialize};

/// The two countdown modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Focus,
    Break,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Focus => "focus",
            Phase::Break => "break",
        }
    }
}

/// Coarse view of the engine used by hosts to pick what to render.
///
/// A stopped focus phase is reported as `IdlePausedFocus` whether or not it
/// was ever started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimerStatus {
    IdlePausedFocus,
    RunningFocus,
    PausedBreak,
    RunningBreak,
}

impl TimerStatus {
    pub fn from_parts(phase: Phase, running: bool) -> Self {
        match (phase, running) {
            (Phase::Focus, false) => TimerStatus::IdlePausedFocus,
            (Phase::Focus, true) => TimerStatus::RunningFocus,
            (Phase::Break, false) => TimerStatus::PausedBreak,
            (Phase::Break, true) => TimerStatus::RunningBreak,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_covers_all_combinations() {
        assert_eq!(
            TimerStatus::from_parts(Phase::Focus, false),
            TimerStatus::IdlePausedFocus
        );
        assert_eq!(
            TimerStatus::from_parts(Phase::Break, true),
            TimerStatus::RunningBreak
        );
    }

    #[test]
    fn status_serializes_kebab_case() {
        let json = serde_json::to_string(&TimerStatus::IdlePausedFocus).unwrap();
        assert_eq!(json, "\"idle-paused-focus\"");
        let json = serde_json::to_string(&Phase::Break).unwrap();
        assert_eq!(json, "\"break\"");
    }
}
