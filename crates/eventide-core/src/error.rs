use thiserror::Error;

/// Process-level faults: configuration and startup plumbing.
///
/// Request-local failures live in the subsystem crates (`UserError`,
/// `SchedulerError`) so the gateway can map them to HTTP statuses directly.
#[derive(Debug, Error)]
pub enum EventideError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EventideError {
    /// Short machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            EventideError::Config(_) => "CONFIG_ERROR",
            EventideError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, EventideError>;
