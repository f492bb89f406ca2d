use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::{info, instrument};

use crate::error::{Result, UserError};
use crate::store;
use crate::types::{User, UserPatch, MIN_USERNAME_LEN};

/// Shared handle over the `users` table.
///
/// Holds its own connection so request handlers never contend with the
/// event scheduler's polling queries for the same SQLite handle.
pub struct UserDirectory {
    db: Arc<Mutex<Connection>>,
}

impl UserDirectory {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub fn create(&self, username: &str, display_name: &str) -> Result<User> {
        check_username(username)?;
        check_display_name(display_name)?;
        let conn = self.conn()?;
        let user = store::create_user(&conn, username, display_name)?;
        info!(user_id = %user.id, %username, "user created");
        Ok(user)
    }

    pub fn get(&self, user_id: &str) -> Result<User> {
        let conn = self.conn()?;
        store::get_user(&conn, user_id)?.ok_or_else(|| UserError::NotFound(user_id.to_string()))
    }

    /// Apply the provided fields; an empty patch returns the user unchanged.
    #[instrument(skip(self))]
    pub fn update(&self, user_id: &str, patch: UserPatch) -> Result<User> {
        if let Some(ref username) = patch.username {
            check_username(username)?;
        }
        if let Some(ref name) = patch.display_name {
            check_display_name(name)?;
        }

        let conn = self.conn()?;
        let mut user = store::get_user(&conn, user_id)?
            .ok_or_else(|| UserError::NotFound(user_id.to_string()))?;
        if patch.is_empty() {
            return Ok(user);
        }
        if let Some(username) = patch.username {
            user.username = username;
        }
        if let Some(name) = patch.display_name {
            user.display_name = name;
        }
        let user = store::update_user(&conn, &user)?;
        info!(user_id = %user.id, "user updated");
        Ok(user)
    }

    /// Remove a user and, through the foreign-key cascade, all of its events.
    /// Returns the pre-deletion record.
    #[instrument(skip(self))]
    pub fn delete(&self, user_id: &str) -> Result<User> {
        let conn = self.conn()?;
        let user = store::get_user(&conn, user_id)?
            .ok_or_else(|| UserError::NotFound(user_id.to_string()))?;
        if !store::delete_user(&conn, user_id)? {
            // Raced with another delete between the read and the write.
            return Err(UserError::NotFound(user_id.to_string()));
        }
        info!(user_id, "user deleted");
        Ok(user)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| UserError::LockPoisoned)
    }
}

fn check_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(UserError::InvalidArgument(
            "username should not be empty".to_string(),
        ));
    }
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(UserError::InvalidArgument(format!(
            "username must be longer than or equal to {MIN_USERNAME_LEN} characters"
        )));
    }
    Ok(())
}

fn check_display_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(UserError::InvalidArgument(
            "name should not be empty".to_string(),
        ));
    }
    Ok(())
}
