//! REST API layer: route handlers, DTOs, rate limits and router
//! composition.
//!
//! Resource endpoints are mounted under `/api`; `/health` sits at the
//! root. With the `swagger-ui` feature the OpenAPI document is served at
//! `/api-docs/openapi.json` and browsable at `/swagger-ui`.

pub mod dto;
pub mod handlers;
pub mod openapi;
pub mod rate_limit;

use std::sync::Arc;

use axum::Router;

use crate::app_state::AppState;
use rate_limit::RateLimiter;

/// Builds the complete API router with all REST endpoints.
pub fn build_router(limiter: &Arc<RateLimiter>) -> Router<AppState> {
    let router = Router::new()
        .nest("/api", handlers::routes(limiter))
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
    };

    router
}
