//! The clock driver ticking a shared room on a paused tokio clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use studyroom_core::{ClockDriver, ManualClock, MemoryStore, RoomSettings, StudyRoom, TimerStatus};

fn shared_room(focus: u64, brk: u64) -> Arc<Mutex<StudyRoom<MemoryStore>>> {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap());
    let settings = RoomSettings {
        focus_duration_secs: focus,
        break_duration_secs: brk,
        ..RoomSettings::default()
    };
    Arc::new(Mutex::new(StudyRoom::open(MemoryStore::new(), clock, &settings)))
}

#[tokio::test(start_paused = true)]
async fn driver_completes_a_focus_phase() {
    let room = shared_room(2, 1);
    room.lock().unwrap().start();

    let driver = ClockDriver::new();
    assert!(driver.start(room.clone()));
    tokio::time::sleep(Duration::from_millis(2500)).await;

    {
        let room = room.lock().unwrap();
        assert_eq!(room.sessions().len(), 1);
        assert_eq!(room.engine().status(), TimerStatus::RunningBreak);
    }

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(room.lock().unwrap().engine().status(), TimerStatus::IdlePausedFocus);
    driver.stop();
}

#[tokio::test(start_paused = true)]
async fn only_one_ticker_drains_the_countdown() {
    let room = shared_room(10, 5);
    room.lock().unwrap().start();

    let driver = ClockDriver::new();
    assert!(driver.start(room.clone()));
    assert!(!driver.start(room.clone()));
    tokio::time::sleep(Duration::from_millis(3500)).await;

    assert_eq!(room.lock().unwrap().engine().remaining_secs(), 7);
}

#[tokio::test(start_paused = true)]
async fn stopped_driver_leaves_countdown_alone() {
    let room = shared_room(10, 5);
    room.lock().unwrap().start();

    let driver = ClockDriver::new();
    driver.start(room.clone());
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(driver.stop());
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(room.lock().unwrap().engine().remaining_secs(), 9);
}
