use rusqlite::Connection;

use crate::error::Result;

/// Initialise the events schema in `conn`.
///
/// Requires the `users` table (see `eventide_users::db::init_db`) for the
/// foreign key. Idempotent.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS events (
            event_id    TEXT    NOT NULL PRIMARY KEY,
            event_name  TEXT    NOT NULL,
            execute_at  TEXT    NOT NULL,   -- RFC 3339, fixed-width millis, UTC
            status      TEXT    NOT NULL DEFAULT 'pending'
                                CHECK (status IN ('pending', 'executed')),
            executed_at TEXT,               -- NULL while pending
            user_id     TEXT    NOT NULL
                                REFERENCES users(user_id) ON DELETE CASCADE,
            created_at  TEXT    NOT NULL,
            updated_at  TEXT    NOT NULL,
            CHECK ((status = 'executed') = (executed_at IS NOT NULL))
        ) STRICT;

        -- Polling: SELECT … WHERE status = 'pending' AND execute_at <= ?
        CREATE INDEX IF NOT EXISTS idx_events_due ON events (status, execute_at);
        CREATE INDEX IF NOT EXISTS idx_events_user ON events (user_id);
        ",
    )?;
    Ok(())
}
