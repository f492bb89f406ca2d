//! `eventide-scheduler`: scheduled events with SQLite persistence.
//!
//! # Overview
//!
//! Events live in the `events` table. [`service::EventService`] creates them
//! and enforces that only pending events may be edited or deleted.
//! [`engine::ExecutionScheduler`] polls the table on a fixed interval and
//! flips every due pending event to executed.
//!
//! | Status     | Set by                 | Mutable |
//! |------------|------------------------|---------|
//! | `pending`  | `EventService::create` | yes     |
//! | `executed` | `ExecutionScheduler`   | no      |

pub mod db;
pub mod engine;
pub mod error;
pub mod service;
pub mod store;
pub mod types;

pub use engine::ExecutionScheduler;
pub use error::{Result, SchedulerError};
pub use service::EventService;
pub use types::{Event, EventPatch, EventStatus, TickOutcome};
