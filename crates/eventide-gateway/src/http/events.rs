//! Event endpoints under `/events`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::app::AppState;
use crate::dto::{event_list, event_response, EventResponse};
use crate::http::error::ApiError;
use crate::validate::{self, ScheduleEventBody, UpdateEventBody};

type ApiResult<T> = Result<T, ApiError>;

/// POST /events/schedule
pub async fn schedule_event(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ScheduleEventBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<EventResponse>)> {
    let Json(body) = body?;
    let cmd = validate::schedule_event(body)?;
    let event = state
        .events
        .create(&cmd.owner_id, &cmd.name, cmd.scheduled_at)?;
    Ok((StatusCode::CREATED, Json(event_response(&event))))
}

/// GET /events/pending
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<EventResponse>>> {
    let events = state.events.list_pending()?;
    debug!(count = events.len(), "listing pending events");
    Ok(Json(event_list(&events)))
}

/// GET /events/user/{user_id}
///
/// A valid UUID is canonicalised like every other id; anything else is used
/// as given and simply has no events.
pub async fn list_for_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<EventResponse>>> {
    let user_id = validate::id(&user_id, "user_id").unwrap_or(user_id);
    let events = state.events.list_for_owner(&user_id)?;
    Ok(Json(event_list(&events)))
}

/// GET /events/{event_id}
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> ApiResult<Json<EventResponse>> {
    let event_id = validate::id(&event_id, "event_id")?;
    let event = state.events.get(&event_id)?;
    Ok(Json(event_response(&event)))
}

/// PATCH /events/{event_id}
pub async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
    body: Result<Json<UpdateEventBody>, JsonRejection>,
) -> ApiResult<Json<EventResponse>> {
    let event_id = validate::id(&event_id, "event_id")?;
    let Json(body) = body?;
    let patch = validate::event_patch(body)?;
    let event = state.events.update(&event_id, patch)?;
    Ok(Json(event_response(&event)))
}

/// DELETE /events/{event_id}: responds with the deleted snapshot.
pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> ApiResult<Json<EventResponse>> {
    let event_id = validate::id(&event_id, "event_id")?;
    let event = state.events.delete(&event_id)?;
    Ok(Json(event_response(&event)))
}
