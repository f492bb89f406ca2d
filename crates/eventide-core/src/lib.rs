//! `eventide-core`: configuration, error type, and the clock shared by every
//! Eventide crate.

pub mod clock;
pub mod config;
pub mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EventideConfig;
pub use error::{EventideError, Result};
