//! Health checks and account routes.

pub mod auth;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Creates the router for health checks, login, registration and password change.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .with_state(state)
}
