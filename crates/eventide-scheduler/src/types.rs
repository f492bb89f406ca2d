use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a scheduled event.
///
/// The only transition is `Pending -> Executed`, performed by the execution
/// scheduler. There is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Waiting for its execute_at time.
    Pending,
    /// Finalised by a scheduler tick. Terminal.
    Executed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Executed => "executed",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EventStatus::Pending),
            "executed" => Ok(EventStatus::Executed),
            other => Err(format!("unknown event status: {other}")),
        }
    }
}

/// A persisted event record.
///
/// `executed_at` is `Some` exactly when `status` is `Executed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// UUIDv7 string, primary key.
    pub id: String,
    /// Human-readable label.
    pub name: String,
    /// When the event becomes due.
    pub scheduled_at: DateTime<Utc>,
    pub status: EventStatus,
    /// Set once, by the tick that executed the event.
    pub executed_at: Option<DateTime<Utc>>,
    /// Owning user; immutable.
    pub owner_id: String,
}

impl Event {
    pub fn is_pending(&self) -> bool {
        self.status == EventStatus::Pending
    }
}

/// Partial update for a pending event; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub name: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.scheduled_at.is_none()
    }
}

/// What a single scheduler tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No pending event was due; nothing was written.
    Idle,
    /// `count` events were flipped to executed with `executed_at = at`.
    Executed { count: usize, at: DateTime<Utc> },
}
