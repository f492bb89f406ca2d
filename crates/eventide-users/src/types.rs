use serde::{Deserialize, Serialize};

/// Minimum accepted username length, in characters.
pub const MIN_USERNAME_LEN: usize = 3;

/// A user record as stored in the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// UUIDv7, time-sortable, useful for log correlation.
    pub id: String,
    /// Unique login-style handle, at least [`MIN_USERNAME_LEN`] characters.
    pub username: String,
    pub display_name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub username: Option<String>,
    pub display_name: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.display_name.is_none()
    }
}
