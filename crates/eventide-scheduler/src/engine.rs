use std::sync::{Arc, Mutex};
use std::time::Duration;

use eventide_core::clock::{format_timestamp, truncate_millis, Clock};
use rusqlite::{Connection, TransactionBehavior};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::{
    error::{Result, SchedulerError},
    store,
    types::TickOutcome,
};

/// Single-flight poller that finalises due events.
///
/// Each tick captures `now` once, finds every pending event with
/// `execute_at <= now`, then flips exactly those ids to executed in one
/// transaction, all sharing the same `executed_at`.
pub struct ExecutionScheduler {
    db: Arc<Mutex<Connection>>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl ExecutionScheduler {
    /// Create a scheduler over an already-initialised connection.
    ///
    /// Production wiring gives it a connection of its own so polling never
    /// queues behind request handlers.
    pub fn new(db: Arc<Mutex<Connection>>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            db,
            clock,
            interval,
        }
    }

    /// Main loop. Ticks every `interval` until `shutdown` broadcasts `true`.
    ///
    /// Ticks run inline in the loop body, so a new one never starts while the
    /// previous one is in flight; ticks missed in the meantime are skipped.
    /// Shutdown is only observed between ticks.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.interval.as_millis() as u64, "execution scheduler started");

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    // Failed batches leave events pending; the next tick retries.
                    if let Err(e) = self.tick() {
                        error!("scheduler tick error: {e}");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("execution scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Run one scan-and-finalise cycle.
    pub fn tick(&self) -> Result<TickOutcome> {
        // Stored timestamps carry millis; the outcome must match them.
        let now = truncate_millis(self.clock.now());
        let mut conn = self.db.lock().map_err(|_| SchedulerError::LockPoisoned)?;

        let due = store::find_due(&conn, &now)?;
        if due.is_empty() {
            debug!("no due events");
            return Ok(TickOutcome::Idle);
        }

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let count = store::mark_executed(&tx, &due, &now)?;
        tx.commit()?;

        if count < due.len() {
            // Deleted between the scan and the update.
            warn!(found = due.len(), executed = count, "some due events vanished mid-tick");
        }
        info!(count, executed_at = %format_timestamp(&now), "events executed");
        Ok(TickOutcome::Executed { count, at: now })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::EventService;
    use crate::types::EventStatus;
    use chrono::{TimeZone, Utc};
    use eventide_core::ManualClock;

    struct Fixture {
        svc: EventService,
        sched: ExecutionScheduler,
        clock: Arc<ManualClock>,
        db: Arc<Mutex<Connection>>,
        owner: String,
    }

    fn fixture() -> Fixture {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
        eventide_users::db::init_db(&conn).unwrap();
        crate::db::init_db(&conn).unwrap();
        let owner = eventide_users::store::create_user(&conn, "owner", "Owner")
            .unwrap()
            .id;
        let db = Arc::new(Mutex::new(conn));
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap(),
        ));
        Fixture {
            svc: EventService::new(db.clone(), clock.clone()),
            sched: ExecutionScheduler::new(db.clone(), clock.clone(), Duration::from_millis(10)),
            clock,
            db,
            owner,
        }
    }

    fn total_changes(db: &Mutex<Connection>) -> i64 {
        db.lock()
            .unwrap()
            .query_row("SELECT total_changes()", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn idle_when_nothing_is_due() {
        let f = fixture();
        f.svc
            .create(&f.owner, "later", f.clock.now() + chrono::Duration::hours(1))
            .unwrap();
        assert_eq!(f.sched.tick().unwrap(), TickOutcome::Idle);
        assert_eq!(f.svc.list_pending().unwrap().len(), 1);
    }

    #[test]
    fn due_events_share_the_tick_timestamp() {
        let f = fixture();
        let a = f.svc.create(&f.owner, "a", f.clock.now() + chrono::Duration::seconds(1)).unwrap();
        let b = f.svc.create(&f.owner, "b", f.clock.now() + chrono::Duration::seconds(30)).unwrap();
        let later = f.svc.create(&f.owner, "c", f.clock.now() + chrono::Duration::hours(1)).unwrap();

        f.clock.advance(chrono::Duration::minutes(1));
        let tick_at = f.clock.now();
        assert_eq!(
            f.sched.tick().unwrap(),
            TickOutcome::Executed { count: 2, at: tick_at }
        );

        for id in [&a.id, &b.id] {
            let ev = f.svc.get(id).unwrap();
            assert_eq!(ev.status, EventStatus::Executed);
            assert_eq!(ev.executed_at, Some(tick_at));
        }
        let ev = f.svc.get(&later.id).unwrap();
        assert_eq!(ev.status, EventStatus::Pending);
        assert_eq!(ev.executed_at, None);
    }

    #[test]
    fn event_due_exactly_now_is_executed() {
        let f = fixture();
        let at = f.clock.now() + chrono::Duration::seconds(5);
        let ev = f.svc.create(&f.owner, "edge", at).unwrap();
        f.clock.set(at);
        f.sched.tick().unwrap();
        assert_eq!(f.svc.get(&ev.id).unwrap().executed_at, Some(at));
    }

    #[test]
    fn reported_tick_time_matches_stored_precision() {
        let f = fixture();
        let ev = f
            .svc
            .create(&f.owner, "precise", f.clock.now() + chrono::Duration::seconds(1))
            .unwrap();
        f.clock.advance(chrono::Duration::seconds(2) + chrono::Duration::nanoseconds(1_234_567));

        let TickOutcome::Executed { at, .. } = f.sched.tick().unwrap() else {
            panic!("due event was not executed");
        };
        assert_eq!(at.timestamp_subsec_nanos() % 1_000_000, 0);
        assert_eq!(f.svc.get(&ev.id).unwrap().executed_at, Some(at));
    }

    #[test]
    fn future_event_waits_across_many_ticks() {
        let f = fixture();
        let at = f.clock.now() + chrono::Duration::seconds(10);
        let ev = f.svc.create(&f.owner, "patient", at).unwrap();

        for _ in 0..9 {
            f.clock.advance(chrono::Duration::seconds(1));
            assert_eq!(f.sched.tick().unwrap(), TickOutcome::Idle);
            assert!(f.svc.get(&ev.id).unwrap().is_pending());
        }
        f.clock.advance(chrono::Duration::seconds(1));
        assert!(matches!(
            f.sched.tick().unwrap(),
            TickOutcome::Executed { count: 1, .. }
        ));
    }

    #[test]
    fn second_tick_performs_no_writes() {
        let f = fixture();
        f.svc
            .create(&f.owner, "once", f.clock.now() + chrono::Duration::seconds(1))
            .unwrap();
        f.clock.advance(chrono::Duration::seconds(2));

        assert!(matches!(f.sched.tick().unwrap(), TickOutcome::Executed { .. }));
        let before = total_changes(&f.db);
        assert_eq!(f.sched.tick().unwrap(), TickOutcome::Idle);
        assert_eq!(total_changes(&f.db), before);
    }

    #[test]
    fn executed_at_is_never_rewritten() {
        let f = fixture();
        let ev = f
            .svc
            .create(&f.owner, "once", f.clock.now() + chrono::Duration::seconds(1))
            .unwrap();
        f.clock.advance(chrono::Duration::seconds(2));
        let first = f.clock.now();
        f.sched.tick().unwrap();
        f.clock.advance(chrono::Duration::hours(3));
        f.sched.tick().unwrap();
        assert_eq!(f.svc.get(&ev.id).unwrap().executed_at, Some(first));
    }

    #[test]
    fn failed_tick_leaves_events_pending_for_retry() {
        let f = fixture();
        let ev = f
            .svc
            .create(&f.owner, "retry", f.clock.now() + chrono::Duration::seconds(1))
            .unwrap();
        f.clock.advance(chrono::Duration::seconds(2));

        f.db.lock()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER block_exec BEFORE UPDATE OF status ON events
                 BEGIN SELECT RAISE(ABORT, 'store unavailable'); END;",
            )
            .unwrap();
        assert!(matches!(f.sched.tick(), Err(SchedulerError::Database(_))));
        assert!(f.svc.get(&ev.id).unwrap().is_pending());

        f.db.lock().unwrap().execute_batch("DROP TRIGGER block_exec;").unwrap();
        assert!(matches!(f.sched.tick().unwrap(), TickOutcome::Executed { count: 1, .. }));
    }

    #[tokio::test]
    async fn run_loop_executes_and_stops_on_shutdown() {
        let f = fixture();
        let ev = f
            .svc
            .create(&f.owner, "looped", f.clock.now() + chrono::Duration::seconds(1))
            .unwrap();
        f.clock.advance(chrono::Duration::seconds(2));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(f.sched.run(shutdown_rx));

        let mut executed = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if !f.svc.get(&ev.id).unwrap().is_pending() {
                executed = true;
                break;
            }
        }
        assert!(executed, "run loop never executed the due event");

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }
}
