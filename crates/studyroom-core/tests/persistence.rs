//! Persistence tests: timer recovery across restarts and the SQLite store.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use studyroom_core::timer::RestoreOutcome;
use studyroom_core::{Database, KvStore, ManualClock, MemoryStore, RoomSettings, StudyRoom, TimerStatus};

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
    ))
}

fn settings() -> RoomSettings {
    RoomSettings {
        focus_duration_secs: 60,
        break_duration_secs: 30,
        staleness_secs: 3600,
    }
}

fn run_for(room: &mut StudyRoom<Arc<MemoryStore>>, clock: &ManualClock, secs: usize) {
    for _ in 0..secs {
        clock.advance(Duration::seconds(1));
        room.tick();
    }
}

#[test]
fn fresh_running_timer_resumes() {
    let store = Arc::new(MemoryStore::new());
    let clock = clock();
    let mut room = StudyRoom::open(store.clone(), clock.clone(), &settings());
    room.start();
    run_for(&mut room, &clock, 5);
    drop(room);

    clock.advance(Duration::minutes(30));
    let room = StudyRoom::open(store, clock.clone(), &settings());
    assert_eq!(room.restore_outcome(), Some(&RestoreOutcome::Resumed));
    assert_eq!(room.engine().status(), TimerStatus::RunningFocus);
    // No catch-up for time spent closed.
    assert_eq!(room.engine().remaining_secs(), 55);
}

#[test]
fn stale_running_timer_is_restored_paused() {
    let store = Arc::new(MemoryStore::new());
    let clock = clock();
    let mut room = StudyRoom::open(store.clone(), clock.clone(), &settings());
    room.start();
    run_for(&mut room, &clock, 5);
    drop(room);

    clock.advance(Duration::hours(2));
    let room = StudyRoom::open(store, clock.clone(), &settings());
    assert!(matches!(
        room.restore_outcome(),
        Some(RestoreOutcome::Suspended { age_secs: 7200 })
    ));
    assert_eq!(room.engine().status(), TimerStatus::IdlePausedFocus);
    assert_eq!(room.engine().remaining_secs(), 55);
    assert!(room.engine().session_started_at().is_none());
}

#[test]
fn saved_in_the_future_is_stale() {
    let store = Arc::new(MemoryStore::new());
    let clock = clock();
    let mut room = StudyRoom::open(store.clone(), clock.clone(), &settings());
    room.start();
    drop(room);

    clock.advance(Duration::minutes(-5));
    let room = StudyRoom::open(store, clock, &settings());
    assert!(!room.engine().is_running());
}

#[test]
fn sqlite_store_round_trips_a_study_day() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("studyroom.db");
    let clock = clock();

    {
        let db = Database::open_at(&path).unwrap();
        let mut room = StudyRoom::open(db, clock.clone(), &settings());
        room.bind("kun");
        room.configure(2, 1).unwrap();
        room.start();
        for _ in 0..2 {
            clock.advance(Duration::seconds(1));
            room.tick();
        }
        assert_eq!(room.sessions().len(), 1);
    }

    let db = Database::open_at(&path).unwrap();
    assert!(!db.keys_with_prefix("daily-archive:").unwrap().is_empty());
    let room = StudyRoom::open(db, clock, &settings());
    assert_eq!(room.sessions().len(), 1);
    assert_eq!(room.stats().total_secs(), 2);
    assert_eq!(room.engine().focus_duration_secs(), 2);
    assert_eq!(room.engine().status(), TimerStatus::RunningBreak);
    let archive = room
        .load_archive(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap().date_naive())
        .unwrap();
    assert_eq!(archive.per_owner_secs.get("kun"), Some(&2));
    assert!(archive.is_valid);
}

#[test]
fn purge_removes_only_old_archives() {
    let store = Arc::new(MemoryStore::new());
    let clock = clock();
    let quick = RoomSettings {
        focus_duration_secs: 1,
        break_duration_secs: 1,
        ..settings()
    };
    let mut room = StudyRoom::open(store.clone(), clock.clone(), &quick);
    room.start();
    run_for(&mut room, &clock, 2);

    clock.advance(Duration::days(100));
    let mut room = StudyRoom::open(store, clock.clone(), &quick);
    room.start();
    run_for(&mut room, &clock, 2);

    assert_eq!(room.summarize(10).unwrap().len(), 2);
    assert_eq!(room.purge_archives(u32::MAX).unwrap(), 0);
    assert_eq!(room.archive_recent(u32::MAX).unwrap().len(), 2);
    assert_eq!(room.purge_archives(90).unwrap(), 1);
    let remaining = room.summarize(10).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].date, room.today());
}
