//! Boundary validation: raw request bodies and path segments in, sanitized
//! commands out. Handlers never pass unchecked input to the services.

use chrono::{DateTime, Utc};
use eventide_core::clock::parse_timestamp;
use eventide_scheduler::EventPatch;
use eventide_users::UserPatch;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

/// Rejected request input. Always surfaces as 400.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

type Result<T> = std::result::Result<T, ValidationError>;

// ── Request bodies ────────────────────────────────────────────────────────────

/// POST /events/schedule. Every field is optional here so a missing field
/// gets a named error instead of a generic deserialization failure.
#[derive(Debug, Default, Deserialize)]
pub struct ScheduleEventBody {
    pub user_id: Option<String>,
    pub event_name: Option<String>,
    pub execute_at: Option<String>,
}

/// PATCH /events/{event_id}
#[derive(Debug, Default, Deserialize)]
pub struct UpdateEventBody {
    pub event_name: Option<String>,
    pub execute_at: Option<String>,
}

/// POST /users
#[derive(Debug, Default, Deserialize)]
pub struct CreateUserBody {
    pub username: Option<String>,
    pub name: Option<String>,
}

/// PATCH /users/{user_id}
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserBody {
    pub username: Option<String>,
    pub name: Option<String>,
}

// ── Sanitized commands ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEvent {
    pub owner_id: String,
    pub name: String,
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub display_name: String,
}

// ── Validators ────────────────────────────────────────────────────────────────

/// Require `raw` to be a UUID; returns its canonical lowercase form.
pub fn id(raw: &str, field: &str) -> Result<String> {
    Uuid::parse_str(raw.trim())
        .map(|u| u.to_string())
        .map_err(|_| ValidationError(format!("{field} must be a valid UUID")))
}

pub fn schedule_event(body: ScheduleEventBody) -> Result<ScheduleEvent> {
    let owner_id = id(&required(body.user_id, "user_id")?, "user_id")?;
    let name = non_blank(required(body.event_name, "event_name")?, "event_name")?;
    let scheduled_at = timestamp(&required(body.execute_at, "execute_at")?, "execute_at")?;
    Ok(ScheduleEvent {
        owner_id,
        name,
        scheduled_at,
    })
}

pub fn event_patch(body: UpdateEventBody) -> Result<EventPatch> {
    let name = body
        .event_name
        .map(|n| non_blank(n, "event_name"))
        .transpose()?;
    let scheduled_at = body
        .execute_at
        .map(|raw| timestamp(&raw, "execute_at"))
        .transpose()?;
    Ok(EventPatch { name, scheduled_at })
}

pub fn new_user(body: CreateUserBody) -> Result<NewUser> {
    Ok(NewUser {
        username: required(body.username, "username")?.trim().to_string(),
        display_name: required(body.name, "name")?,
    })
}

pub fn user_patch(body: UpdateUserBody) -> UserPatch {
    UserPatch {
        username: body.username.map(|u| u.trim().to_string()),
        display_name: body.name,
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value.ok_or_else(|| ValidationError(format!("{field} is required")))
}

fn non_blank(value: String, field: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(ValidationError(format!("{field} should not be empty")));
    }
    Ok(value)
}

fn timestamp(raw: &str, field: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(raw.trim())
        .ok_or_else(|| ValidationError(format!("{field} must be a valid ISO 8601 date")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const USER: &str = "0190a1b2-c3d4-7e5f-8a9b-0c1d2e3f4a5b";

    fn body(user_id: Option<&str>, name: Option<&str>, at: Option<&str>) -> ScheduleEventBody {
        ScheduleEventBody {
            user_id: user_id.map(String::from),
            event_name: name.map(String::from),
            execute_at: at.map(String::from),
        }
    }

    #[test]
    fn schedule_event_accepts_well_formed_body() {
        let cmd = schedule_event(body(Some(USER), Some("Standup"), Some("2030-01-01T09:00:00Z")))
            .unwrap();
        assert_eq!(cmd.owner_id, USER);
        assert_eq!(cmd.name, "Standup");
        assert_eq!(
            cmd.scheduled_at,
            Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn schedule_event_names_the_missing_field() {
        let err = schedule_event(body(Some(USER), None, Some("2030-01-01T09:00:00Z"))).unwrap_err();
        assert_eq!(err.0, "event_name is required");
        let err = schedule_event(body(None, Some("x"), Some("2030-01-01T09:00:00Z"))).unwrap_err();
        assert_eq!(err.0, "user_id is required");
        let err = schedule_event(body(Some(USER), Some("x"), None)).unwrap_err();
        assert_eq!(err.0, "execute_at is required");
    }

    #[test]
    fn schedule_event_rejects_bad_values() {
        assert!(schedule_event(body(Some("42"), Some("x"), Some("2030-01-01"))).is_err());
        assert!(schedule_event(body(Some(USER), Some("  "), Some("2030-01-01"))).is_err());
        assert!(schedule_event(body(Some(USER), Some("x"), Some("next tuesday"))).is_err());
    }

    #[test]
    fn id_canonicalises_case() {
        assert_eq!(id(&USER.to_uppercase(), "event_id").unwrap(), USER);
        assert_eq!(
            id("nope", "event_id").unwrap_err().0,
            "event_id must be a valid UUID"
        );
    }

    #[test]
    fn event_patch_keeps_absent_fields_absent() {
        let patch = event_patch(UpdateEventBody::default()).unwrap();
        assert!(patch.is_empty());

        let patch = event_patch(UpdateEventBody {
            event_name: None,
            execute_at: Some("2030-02-03T04:05:06.789Z".into()),
        })
        .unwrap();
        assert_eq!(patch.name, None);
        assert!(patch.scheduled_at.is_some());

        assert!(event_patch(UpdateEventBody {
            event_name: Some("".into()),
            execute_at: None,
        })
        .is_err());
    }

    #[test]
    fn new_user_requires_both_fields() {
        assert!(new_user(CreateUserBody {
            username: Some("alice".into()),
            name: None,
        })
        .is_err());
        let user = new_user(CreateUserBody {
            username: Some(" alice ".into()),
            name: Some("Alice".into()),
        })
        .unwrap();
        assert_eq!(user.username, "alice");
    }
}
