use eventide_users::UserError;
use thiserror::Error;

/// Errors raised by the event lifecycle and the execution scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Referenced event or owner does not exist.
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// Malformed or semantically invalid input (empty name, past timestamp).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation not permitted for the event's current status.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failure bubbled up from the user directory.
    #[error(transparent)]
    Users(#[from] UserError),

    #[error("Event store lock poisoned")]
    LockPoisoned,
}

impl SchedulerError {
    pub(crate) fn event_not_found(id: &str) -> Self {
        SchedulerError::NotFound {
            what: "Event",
            id: id.to_string(),
        }
    }

    pub(crate) fn user_not_found(id: &str) -> Self {
        SchedulerError::NotFound {
            what: "User",
            id: id.to_string(),
        }
    }

    /// Short machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            SchedulerError::NotFound { what: "User", .. } => "USER_NOT_FOUND",
            SchedulerError::NotFound { .. } => "EVENT_NOT_FOUND",
            SchedulerError::InvalidArgument(_) => "INVALID_ARGUMENT",
            SchedulerError::InvalidState(_) => "INVALID_STATE",
            SchedulerError::Database(_) => "DATABASE_ERROR",
            SchedulerError::Users(e) => e.code(),
            SchedulerError::LockPoisoned => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
