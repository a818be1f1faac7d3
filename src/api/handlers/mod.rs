//! REST endpoint handlers organized by resource.

pub mod events;
pub mod genres;
pub mod system;
pub mod users;

use std::sync::Arc;

use axum::Router;

use crate::api::rate_limit::RateLimiter;
use crate::app_state::AppState;

/// Composes all resource routes under `/api`.
pub fn routes(limiter: &Arc<RateLimiter>) -> Router<AppState> {
    Router::new()
        .merge(events::routes(limiter))
        .merge(genres::routes())
        .merge(users::routes(limiter))
}
