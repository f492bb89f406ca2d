//! Event store: plain functions over a `rusqlite::Connection`.
//!
//! Callers own locking and transactions; every function here is a single
//! statement (or a chunked batch of one statement) so it composes inside
//! whatever transaction the caller has open.

use chrono::{DateTime, Utc};
use eventide_core::clock::{format_timestamp, parse_timestamp};
use rusqlite::{params, params_from_iter, types::Type, Connection};

use crate::error::Result;
use crate::types::{Event, EventStatus};

/// Column order shared by every SELECT; see [`row_to_event`].
const EVENT_COLUMNS: &str = "event_id, event_name, execute_at, status, executed_at, user_id";

/// Max ids bound into one `IN (...)` list. Well under SQLite's variable limit.
const BATCH_CHUNK: usize = 500;

/// Map a SELECT row (column order from [`EVENT_COLUMNS`]) to an Event.
pub(crate) fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<Event> {
    let status: String = row.get(3)?;
    let executed_at: Option<String> = row.get(4)?;
    Ok(Event {
        id: row.get(0)?,
        name: row.get(1)?,
        scheduled_at: timestamp_column(row, 2)?,
        status: status
            .parse()
            .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into()))?,
        executed_at: match executed_at {
            Some(_) => Some(timestamp_column(row, 4)?),
            None => None,
        },
        owner_id: row.get(5)?,
    })
}

fn timestamp_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("bad timestamp: {raw}").into(),
        )
    })
}

/// Insert a new event row. `now` stamps created_at/updated_at.
pub fn insert_event(conn: &Connection, event: &Event, now: &DateTime<Utc>) -> Result<()> {
    let now = format_timestamp(now);
    conn.execute(
        "INSERT INTO events
         (event_id, event_name, execute_at, status, executed_at, user_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            event.id,
            event.name,
            format_timestamp(&event.scheduled_at),
            event.status.as_str(),
            event.executed_at.as_ref().map(format_timestamp),
            event.owner_id,
            now,
        ],
    )?;
    Ok(())
}

/// Load one event by id; `None` when absent.
pub fn get_event(conn: &Connection, event_id: &str) -> Result<Option<Event>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = ?1");
    let mut stmt = conn.prepare_cached(&sql)?;
    match stmt.query_row(params![event_id], row_to_event) {
        Ok(e) => Ok(Some(e)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All events with the given status, soonest first.
pub fn list_by_status(conn: &Connection, status: EventStatus) -> Result<Vec<Event>> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE status = ?1 ORDER BY execute_at, event_id"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map(params![status.as_str()], row_to_event)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// All events (any status) owned by `owner_id`, soonest first.
pub fn list_by_owner(conn: &Connection, owner_id: &str) -> Result<Vec<Event>> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE user_id = ?1 ORDER BY execute_at, event_id"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map(params![owner_id], row_to_event)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Ids of pending events whose execute_at is at or before `threshold`.
pub fn find_due(conn: &Connection, threshold: &DateTime<Utc>) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT event_id FROM events
         WHERE status = 'pending' AND execute_at <= ?1",
    )?;
    let ids = stmt
        .query_map(params![format_timestamp(threshold)], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(ids)
}

/// Overwrite the mutable content columns of an existing event.
/// Returns false when no row matched.
pub fn update_event(conn: &Connection, event: &Event, now: &DateTime<Utc>) -> Result<bool> {
    let n = conn.execute(
        "UPDATE events SET event_name = ?2, execute_at = ?3, updated_at = ?4
         WHERE event_id = ?1",
        params![
            event.id,
            event.name,
            format_timestamp(&event.scheduled_at),
            format_timestamp(now),
        ],
    )?;
    Ok(n > 0)
}

/// Delete one event. Returns false when no row matched.
pub fn delete_event(conn: &Connection, event_id: &str) -> Result<bool> {
    let n = conn.execute("DELETE FROM events WHERE event_id = ?1", params![event_id])?;
    Ok(n > 0)
}

/// Flip exactly the given ids to executed at `at`.
///
/// Filters by id only. Ids that no longer exist are silent no-ops, so the
/// returned count may be smaller than `ids.len()`. Run inside a transaction
/// to make the whole batch all-or-nothing.
pub fn mark_executed(conn: &Connection, ids: &[String], at: &DateTime<Utc>) -> Result<usize> {
    let at = format_timestamp(at);
    let mut changed = 0;
    for chunk in ids.chunks(BATCH_CHUNK) {
        let placeholders = (2..chunk.len() + 2)
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE events SET status = 'executed', executed_at = ?1, updated_at = ?1
             WHERE event_id IN ({placeholders})"
        );
        let args = std::iter::once(&at).chain(chunk.iter());
        changed += conn.execute(&sql, params_from_iter(args))?;
    }
    Ok(changed)
}
