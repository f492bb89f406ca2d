use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use eventide_core::clock::{format_timestamp, is_storable, truncate_millis, Clock};
use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{
    error::{Result, SchedulerError},
    store,
    types::{Event, EventPatch, EventStatus},
};

/// Event lifecycle: creation and the pending-only mutation rules.
///
/// The only writer of event content. Status flips belong to
/// [`crate::engine::ExecutionScheduler`]; this service never sets `Executed`.
pub struct EventService {
    db: Arc<Mutex<Connection>>,
    clock: Arc<dyn Clock>,
}

impl EventService {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(db: Arc<Mutex<Connection>>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Schedule a new pending event for `owner_id`.
    #[instrument(skip(self, scheduled_at), fields(scheduled_at = %format_timestamp(&scheduled_at)))]
    pub fn create(&self, owner_id: &str, name: &str, scheduled_at: DateTime<Utc>) -> Result<Event> {
        check_name(name)?;
        check_scheduled_at(&scheduled_at)?;
        let now = self.clock.now();
        let scheduled_at = truncate_millis(scheduled_at);
        if scheduled_at <= now {
            return Err(SchedulerError::InvalidArgument(
                "execute_at must be a future date".to_string(),
            ));
        }

        let conn = self.conn()?;
        if !eventide_users::store::user_exists(&conn, owner_id)? {
            return Err(SchedulerError::user_not_found(owner_id));
        }

        let event = Event {
            id: Uuid::now_v7().to_string(),
            name: name.to_string(),
            scheduled_at,
            status: EventStatus::Pending,
            executed_at: None,
            owner_id: owner_id.to_string(),
        };
        store::insert_event(&conn, &event, &now)?;
        info!(event_id = %event.id, "event scheduled");
        Ok(event)
    }

    /// Every pending event, soonest first.
    pub fn list_pending(&self) -> Result<Vec<Event>> {
        let conn = self.conn()?;
        store::list_by_status(&conn, EventStatus::Pending)
    }

    /// Every event owned by `owner_id`, any status.
    ///
    /// An empty result is reported as `NotFound`, so "unknown owner" and
    /// "owner without events" look the same to the caller.
    pub fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Event>> {
        let conn = self.conn()?;
        let events = store::list_by_owner(&conn, owner_id)?;
        if events.is_empty() {
            return Err(SchedulerError::NotFound {
                what: "Events for user",
                id: owner_id.to_string(),
            });
        }
        Ok(events)
    }

    /// Single event by id, any status.
    pub fn get(&self, event_id: &str) -> Result<Event> {
        let conn = self.conn()?;
        store::get_event(&conn, event_id)?.ok_or_else(|| SchedulerError::event_not_found(event_id))
    }

    /// Apply `patch` to a pending event.
    ///
    /// A new `scheduled_at` is not re-checked against the clock; only
    /// creation requires a future time.
    #[instrument(skip(self, patch))]
    pub fn update(&self, event_id: &str, patch: EventPatch) -> Result<Event> {
        if let Some(ref name) = patch.name {
            check_name(name)?;
        }
        if let Some(ref at) = patch.scheduled_at {
            check_scheduled_at(at)?;
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut event = pending_event(&tx, event_id, "updated")?;
        if patch.is_empty() {
            debug!(event_id, "empty patch; nothing to write");
            return Ok(event);
        }
        if let Some(name) = patch.name {
            event.name = name;
        }
        if let Some(at) = patch.scheduled_at {
            event.scheduled_at = truncate_millis(at);
        }
        store::update_event(&tx, &event, &self.clock.now())?;
        tx.commit()?;

        info!(event_id, "event updated");
        Ok(event)
    }

    /// Permanently remove a pending event and return its last state.
    #[instrument(skip(self))]
    pub fn delete(&self, event_id: &str) -> Result<Event> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let event = pending_event(&tx, event_id, "deleted")?;
        store::delete_event(&tx, event_id)?;
        tx.commit()?;

        info!(event_id, "event deleted");
        Ok(event)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| SchedulerError::LockPoisoned)
    }
}

/// Load `event_id` and require it to still be pending.
fn pending_event(conn: &Connection, event_id: &str, verb: &str) -> Result<Event> {
    let event =
        store::get_event(conn, event_id)?.ok_or_else(|| SchedulerError::event_not_found(event_id))?;
    if !event.is_pending() {
        return Err(SchedulerError::InvalidState(format!(
            "only pending events can be {verb}"
        )));
    }
    Ok(event)
}

fn check_scheduled_at(at: &DateTime<Utc>) -> Result<()> {
    if !is_storable(at) {
        return Err(SchedulerError::InvalidArgument(
            "execute_at must fall between years 0000 and 9999".to_string(),
        ));
    }
    Ok(())
}

fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(SchedulerError::InvalidArgument(
            "event_name should not be empty".to_string(),
        ));
    }
    Ok(())
}
