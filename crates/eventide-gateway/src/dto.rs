//! Wire shapes. Domain structs map one way into these; nothing reads them back.

use eventide_core::clock::format_timestamp;
use eventide_scheduler::{Event, EventStatus};
use eventide_users::User;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub event_id: String,
    pub event_name: String,
    pub execute_at: String,
    pub status: EventStatus,
    pub executed_at: Option<String>,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user_id: String,
    pub username: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<EventResponse>>,
}

pub fn event_response(event: &Event) -> EventResponse {
    EventResponse {
        event_id: event.id.clone(),
        event_name: event.name.clone(),
        execute_at: format_timestamp(&event.scheduled_at),
        status: event.status,
        executed_at: event.executed_at.as_ref().map(format_timestamp),
        user_id: event.owner_id.clone(),
    }
}

pub fn event_list(events: &[Event]) -> Vec<EventResponse> {
    events.iter().map(event_response).collect()
}

/// `events` is embedded only when given.
pub fn user_response(user: &User, events: Option<&[Event]>) -> UserResponse {
    UserResponse {
        user_id: user.id.clone(),
        username: user.username.clone(),
        name: user.display_name.clone(),
        events: events.map(event_list),
    }
}
