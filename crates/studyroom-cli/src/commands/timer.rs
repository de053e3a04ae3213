use std::io::Write;
use std::sync::{Arc, Mutex};

use clap::Subcommand;
use studyroom_core::sinks::NullSink;
use studyroom_core::{
    AlertListener, ClockDriver, Config, Database, Event, NotificationSink, SoundSink, StudyRoom,
    TickTarget, ToneKind,
};

use super::{open_room, print_json};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Bind the timer to a companion
    Bind {
        /// Companion identifier
        owner: String,
    },
    /// Start or resume the countdown
    Start,
    /// Pause the countdown
    Pause,
    /// Stop and return to a full focus phase
    Reset,
    /// Print current timer state as JSON
    Status,
    /// Change focus/break lengths
    Configure {
        /// Focus length in minutes
        #[arg(long)]
        focus: u32,
        /// Break length in minutes
        #[arg(long = "break")]
        break_minutes: u32,
    },
    /// Drive the timer in the foreground until Ctrl-C
    Run {
        /// Start the countdown before driving it
        #[arg(long)]
        start: bool,
    },
}

/// Desktop notifications stand-in: writes to stderr.
struct TerminalNotifier;

impl NotificationSink for TerminalNotifier {
    fn notify(&self, title: &str, body: &str) {
        eprintln!("{title}: {body}");
    }
}

/// Rings the terminal bell.
struct TerminalBell;

impl SoundSink for TerminalBell {
    fn play_tone(&self, kind: ToneKind) {
        let bells = match kind {
            ToneKind::FocusComplete => "\x07\x07",
            ToneKind::BreakComplete => "\x07",
        };
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(bells.as_bytes());
        let _ = stderr.flush();
    }
}

/// Prints every event a tick produces as one JSON line.
struct Foreground {
    room: Mutex<StudyRoom<Database>>,
}

impl TickTarget for Foreground {
    fn on_tick(&self) {
        let mut room = self.room.lock().unwrap_or_else(|p| p.into_inner());
        for event in room.tick() {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "failed to encode event"),
            }
        }
    }
}

pub fn run(action: TimerAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut room = open_room(config)?;

    match action {
        TimerAction::Bind { owner } => {
            let event = room.bind(owner);
            print_event(&room, event.as_ref())?;
        }
        TimerAction::Start => {
            let event = room.start();
            print_event(&room, event.as_ref())?;
        }
        TimerAction::Pause => {
            let event = room.pause();
            print_event(&room, event.as_ref())?;
        }
        TimerAction::Reset => {
            let event = room.reset();
            print_event(&room, event.as_ref())?;
        }
        TimerAction::Status => print_json(&room.snapshot())?,
        TimerAction::Configure {
            focus,
            break_minutes,
        } => {
            // Nothing is written until both the config and the timer accept
            // the new lengths.
            let mut config = config.clone();
            config.apply("timer.focus_minutes", &focus.to_string())?;
            config.apply("timer.break_minutes", &break_minutes.to_string())?;
            let (focus_secs, break_secs) = config.timer_durations();
            let event = room.configure(focus_secs, break_secs)?;
            config.save()?;
            print_json(&event)?;
        }
        TimerAction::Run { start } => run_foreground(room, config, start)?,
    }
    Ok(())
}

fn print_event(
    room: &StudyRoom<Database>,
    event: Option<&Event>,
) -> Result<(), Box<dyn std::error::Error>> {
    match event {
        Some(event) => print_json(event),
        None => print_json(&room.snapshot()),
    }
}

fn run_foreground(
    mut room: StudyRoom<Database>,
    config: &Config,
    start: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    room.subscribe(AlertListener::new(
        TerminalNotifier,
        TerminalBell,
        NullSink,
        config.notifications.clone(),
    ));
    if start {
        if let Some(event) = room.start() {
            println!("{}", serde_json::to_string(&event)?);
        }
    }

    let host = Arc::new(Foreground {
        room: Mutex::new(room),
    });
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let driver = ClockDriver::new();
        driver.start(host.clone());
        tracing::info!("timer running, press Ctrl-C to stop");
        let signal = tokio::signal::ctrl_c().await;
        driver.stop();
        signal
    })?;

    let room = host.room.lock().unwrap_or_else(|p| p.into_inner());
    println!("{}", serde_json::to_string(&room.snapshot())?);
    Ok(())
}
