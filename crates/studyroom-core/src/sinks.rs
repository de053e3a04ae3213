//! Side-effect collaborators and completion listeners.
//!
//! The core only ever calls these fire-and-forget: a failing notification
//! or a missing sound device never affects timer or statistics state.

use crate::storage::NotificationsConfig;
use crate::timer::{Completion, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneKind {
    FocusComplete,
    BreakComplete,
}

pub trait NotificationSink: Send {
    fn notify(&self, title: &str, body: &str);
}

pub trait SoundSink: Send {
    fn play_tone(&self, kind: ToneKind);
}

/// Display metadata for companions.
pub trait OwnerCatalog: Send {
    fn display_name(&self, owner_id: &str) -> Option<String>;
}

/// Subscriber to phase completions.
///
/// Listeners run after the session (if any) has been recorded and the
/// statistics updated.
pub trait CompletionListener: Send {
    fn on_completed(&mut self, completion: &Completion);
}

impl<F> CompletionListener for F
where
    F: FnMut(&Completion) + Send,
{
    fn on_completed(&mut self, completion: &Completion) {
        self(completion)
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _title: &str, _body: &str) {}
}

impl SoundSink for NullSink {
    fn play_tone(&self, _kind: ToneKind) {}
}

impl OwnerCatalog for NullSink {
    fn display_name(&self, _owner_id: &str) -> Option<String> {
        None
    }
}

const FALLBACK_NAME: &str = "Your study buddy";

/// Turns completions into a notification and a tone, honoring the user's
/// notification preferences.
pub struct AlertListener<N, S, C> {
    notifier: N,
    sound: S,
    catalog: C,
    prefs: NotificationsConfig,
}

impl<N, S, C> AlertListener<N, S, C>
where
    N: NotificationSink,
    S: SoundSink,
    C: OwnerCatalog,
{
    pub fn new(notifier: N, sound: S, catalog: C, prefs: NotificationsConfig) -> Self {
        Self {
            notifier,
            sound,
            catalog,
            prefs,
        }
    }

    fn owner_name(&self, owner_id: Option<&str>) -> String {
        owner_id
            .and_then(|id| self.catalog.display_name(id))
            .unwrap_or_else(|| FALLBACK_NAME.to_string())
    }
}

impl<N, S, C> CompletionListener for AlertListener<N, S, C>
where
    N: NotificationSink,
    S: SoundSink,
    C: OwnerCatalog,
{
    fn on_completed(&mut self, completion: &Completion) {
        let name = self.owner_name(completion.owner_id.as_deref());
        let (tone, title, body) = match completion.phase {
            Phase::Focus => (
                ToneKind::FocusComplete,
                format!("{name}: focus complete"),
                "Time to take a break.",
            ),
            Phase::Break => (
                ToneKind::BreakComplete,
                format!("{name}: break over"),
                "Ready to continue studying.",
            ),
        };

        if self.prefs.sound_enabled {
            self.sound.play_tone(tone);
        }
        if self.prefs.enabled {
            self.notifier.notify(&title, body);
        }
    }
}
