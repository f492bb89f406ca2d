use axum::{
    routing::{get, post},
    Router,
};
use eventide_core::config::EventideConfig;
use eventide_scheduler::EventService;
use eventide_users::UserDirectory;
use std::sync::Arc;

use crate::http::{events, health, users};

/// Shared state, passed as Arc<AppState> to all Axum handlers.
///
/// The execution scheduler is not here: it runs as its own task with its own
/// connection and never serves requests.
pub struct AppState {
    pub config: EventideConfig,
    pub users: UserDirectory,
    pub events: EventService,
}

impl AppState {
    pub fn new(config: EventideConfig, users: UserDirectory, events: EventService) -> Self {
        Self {
            config,
            users,
            events,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/events/schedule", post(events::schedule_event))
        .route("/events/pending", get(events::list_pending))
        .route("/events/user/{user_id}", get(events::list_for_user))
        .route(
            "/events/{event_id}",
            get(events::get_event)
                .patch(events::update_event)
                .delete(events::delete_event),
        )
        .route("/users", post(users::create_user))
        .route(
            "/users/{user_id}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/{user_id}/events", get(users::list_user_events))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
