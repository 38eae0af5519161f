pub mod activities;
pub mod admin;
pub mod auth;
pub mod family;
pub mod health;
pub mod me;

use axum::Router;

use crate::state::AppState;

/// Assemble the full router with all route groups.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(me::routes())
        .merge(activities::routes())
        .merge(family::routes())
        .merge(admin::routes())
        .with_state(state)
}
