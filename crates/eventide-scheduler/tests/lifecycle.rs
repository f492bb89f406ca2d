//! Cross-component scenarios: user directory, event service and the
//! execution scheduler sharing one database.

use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{Duration, TimeZone, Utc};
use eventide_core::{Clock, ManualClock};
use eventide_scheduler::{
    EventPatch, EventService, EventStatus, ExecutionScheduler, SchedulerError, TickOutcome,
};
use eventide_users::{UserDirectory, UserError};
use rusqlite::Connection;

struct World {
    users: UserDirectory,
    events: EventService,
    scheduler: ExecutionScheduler,
    clock: Arc<ManualClock>,
}

fn world() -> World {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
    eventide_users::db::init_db(&conn).unwrap();
    eventide_scheduler::db::init_db(&conn).unwrap();
    let db = Arc::new(Mutex::new(conn));
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2031, 6, 1, 8, 30, 0).unwrap(),
    ));
    World {
        users: UserDirectory::new(db.clone()),
        events: EventService::new(db.clone(), clock.clone()),
        scheduler: ExecutionScheduler::new(db, clock.clone(), StdDuration::from_secs(1)),
        clock,
    }
}

#[test]
fn scheduled_event_executes_once_due() {
    let w = world();
    let user = w.users.create("alice", "Alice").unwrap();
    let at = w.clock.now() + Duration::hours(1);
    let ev = w.events.create(&user.id, "standup", at).unwrap();
    assert_eq!(w.events.list_pending().unwrap(), vec![ev.clone()]);

    w.clock.advance(Duration::hours(1) + Duration::seconds(1));
    let now = w.clock.now();
    assert_eq!(
        w.scheduler.tick().unwrap(),
        TickOutcome::Executed { count: 1, at: now }
    );

    assert!(w.events.list_pending().unwrap().is_empty());
    let executed = w.events.get(&ev.id).unwrap();
    assert_eq!(executed.status, EventStatus::Executed);
    assert_eq!(executed.executed_at, Some(now));
    assert_eq!(executed.scheduled_at, at);

    let owned = w.events.list_for_owner(&user.id).unwrap();
    assert_eq!(owned, vec![executed]);
}

#[test]
fn executed_event_is_frozen() {
    let w = world();
    let user = w.users.create("bob", "Bob").unwrap();
    let ev = w
        .events
        .create(&user.id, "deploy", w.clock.now() + Duration::minutes(5))
        .unwrap();
    w.clock.advance(Duration::minutes(10));
    w.scheduler.tick().unwrap();
    let snapshot = w.events.get(&ev.id).unwrap();

    let patch = EventPatch {
        name: Some("renamed".to_string()),
        scheduled_at: None,
    };
    assert!(matches!(
        w.events.update(&ev.id, patch),
        Err(SchedulerError::InvalidState(_))
    ));
    assert!(matches!(
        w.events.delete(&ev.id),
        Err(SchedulerError::InvalidState(_))
    ));
    assert_eq!(w.events.get(&ev.id).unwrap(), snapshot);
}

#[test]
fn rescheduled_event_follows_its_new_time() {
    let w = world();
    let user = w.users.create("carol", "Carol").unwrap();
    let ev = w
        .events
        .create(&user.id, "review", w.clock.now() + Duration::minutes(1))
        .unwrap();
    let later = w.clock.now() + Duration::hours(2);
    w.events
        .update(
            &ev.id,
            EventPatch {
                name: None,
                scheduled_at: Some(later),
            },
        )
        .unwrap();

    w.clock.advance(Duration::minutes(5));
    assert_eq!(w.scheduler.tick().unwrap(), TickOutcome::Idle);

    w.clock.set(later);
    assert!(matches!(
        w.scheduler.tick().unwrap(),
        TickOutcome::Executed { count: 1, .. }
    ));
}

#[test]
fn deleting_a_user_cascades_to_events() {
    let w = world();
    let gone = w.users.create("dave", "Dave").unwrap();
    let kept = w.users.create("erin", "Erin").unwrap();
    let at = w.clock.now() + Duration::hours(1);
    let a = w.events.create(&gone.id, "a", at).unwrap();
    let b = w.events.create(&gone.id, "b", at).unwrap();
    let c = w.events.create(&kept.id, "c", at).unwrap();

    w.users.delete(&gone.id).unwrap();

    assert!(matches!(w.users.get(&gone.id), Err(UserError::NotFound(_))));
    for id in [&a.id, &b.id] {
        assert!(matches!(
            w.events.get(id),
            Err(SchedulerError::NotFound { .. })
        ));
    }
    assert!(matches!(
        w.events.list_for_owner(&gone.id),
        Err(SchedulerError::NotFound { .. })
    ));
    assert_eq!(w.events.list_pending().unwrap(), vec![c]);
}

#[test]
fn scheduling_for_a_deleted_user_is_rejected() {
    let w = world();
    let user = w.users.create("frank", "Frank").unwrap();
    w.users.delete(&user.id).unwrap();

    let err = w
        .events
        .create(&user.id, "orphan", w.clock.now() + Duration::hours(1))
        .unwrap_err();
    assert_eq!(err.code(), "USER_NOT_FOUND");
    assert!(w.events.list_pending().unwrap().is_empty());
}
