use thiserror::Error;

/// All user-layer errors. Kept separate from the scheduler's errors so the
/// gateway can map each to an HTTP status without coupling layers.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Username already taken: {0}")]
    AlreadyExists(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("User store lock poisoned")]
    LockPoisoned,
}

impl UserError {
    pub fn code(&self) -> &'static str {
        match self {
            UserError::NotFound(_) => "USER_NOT_FOUND",
            UserError::AlreadyExists(_) => "USER_ALREADY_EXISTS",
            UserError::InvalidArgument(_) => "INVALID_ARGUMENT",
            UserError::DatabaseError(_) => "DATABASE_ERROR",
            UserError::LockPoisoned => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, UserError>;
