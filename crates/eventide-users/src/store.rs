use chrono::Utc;
use eventide_core::clock::format_timestamp;
use rusqlite::{params, Connection, ErrorCode};
use uuid::Uuid;

use crate::db::{row_to_user, USER_COLUMNS};
use crate::error::{Result, UserError};
use crate::types::User;

/// Insert a brand-new user row. The id is generated here so the caller
/// immediately has the canonical id without a follow-up query.
pub fn create_user(conn: &Connection, username: &str, display_name: &str) -> Result<User> {
    let now = format_timestamp(&Utc::now());
    let user = User {
        id: Uuid::now_v7().to_string(),
        username: username.to_string(),
        display_name: display_name.to_string(),
        created_at: now.clone(),
        updated_at: now,
    };
    conn.execute(
        "INSERT INTO users (user_id, username, name, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user.id,
            user.username,
            user.display_name,
            user.created_at,
            user.updated_at
        ],
    )
    .map_err(|e| unique_violation(e, username))?;
    Ok(user)
}

/// Load a user by primary key. Returns None instead of an error when absent
/// so callers decide whether missing is exceptional in their context.
pub fn get_user(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1");
    let mut stmt = conn.prepare_cached(&sql)?;
    match stmt.query_row(params![user_id], row_to_user) {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(UserError::DatabaseError(e)),
    }
}

/// Cheap existence probe used by the event lifecycle before inserting.
pub fn user_exists(conn: &Connection, user_id: &str) -> Result<bool> {
    let mut stmt = conn.prepare_cached("SELECT 1 FROM users WHERE user_id = ?1")?;
    Ok(stmt.exists(params![user_id])?)
}

/// Persist the mutable fields of an existing user. Always bumps updated_at.
pub fn update_user(conn: &Connection, user: &User) -> Result<User> {
    let now = format_timestamp(&Utc::now());
    let n = conn
        .execute(
            "UPDATE users SET username = ?2, name = ?3, updated_at = ?4 WHERE user_id = ?1",
            params![user.id, user.username, user.display_name, now],
        )
        .map_err(|e| unique_violation(e, &user.username))?;
    if n == 0 {
        return Err(UserError::NotFound(user.id.clone()));
    }
    Ok(User {
        updated_at: now,
        ..user.clone()
    })
}

/// Delete a user row. Owned events go with it via the foreign-key cascade.
/// Returns false when no row matched.
pub fn delete_user(conn: &Connection, user_id: &str) -> Result<bool> {
    let n = conn.execute("DELETE FROM users WHERE user_id = ?1", params![user_id])?;
    Ok(n > 0)
}

/// The only UNIQUE column besides the primary key is `username`.
fn unique_violation(e: rusqlite::Error, username: &str) -> UserError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, _) if err.code == ErrorCode::ConstraintViolation => {
            UserError::AlreadyExists(username.to_string())
        }
        other => UserError::DatabaseError(other),
    }
}
