//! User endpoints under `/users`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use eventide_scheduler::SchedulerError;
use std::sync::Arc;

use crate::app::AppState;
use crate::dto::{event_list, user_response, EventResponse, UserResponse};
use crate::http::error::ApiError;
use crate::validate::{self, CreateUserBody, UpdateUserBody};

type ApiResult<T> = Result<T, ApiError>;

/// POST /users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateUserBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let Json(body) = body?;
    let cmd = validate::new_user(body)?;
    let user = state.users.create(&cmd.username, &cmd.display_name)?;
    Ok((StatusCode::CREATED, Json(user_response(&user, None))))
}

/// GET /users/{user_id}: the user with every event it owns embedded.
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserResponse>> {
    let user_id = validate::id(&user_id, "user_id")?;
    let user = state.users.get(&user_id)?;
    let events = match state.events.list_for_owner(&user.id) {
        Ok(events) => events,
        Err(SchedulerError::NotFound { .. }) => Vec::new(),
        Err(e) => return Err(e.into()),
    };
    Ok(Json(user_response(&user, Some(&events))))
}

/// GET /users/{user_id}/events
pub async fn list_user_events(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<EventResponse>>> {
    let user_id = validate::id(&user_id, "user_id")?;
    let user = state.users.get(&user_id)?;
    let events = state.events.list_for_owner(&user.id)?;
    Ok(Json(event_list(&events)))
}

/// PATCH /users/{user_id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    body: Result<Json<UpdateUserBody>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let user_id = validate::id(&user_id, "user_id")?;
    let Json(body) = body?;
    let user = state.users.update(&user_id, validate::user_patch(body))?;
    Ok(Json(user_response(&user, None)))
}

/// DELETE /users/{user_id}: also removes every event the user owns.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserResponse>> {
    let user_id = validate::id(&user_id, "user_id")?;
    let user = state.users.delete(&user_id)?;
    Ok(Json(user_response(&user, None)))
}
