//! # crowdsync
//!
//! REST API behind a DJ event app: DJs create events, guests join them by
//! scanning a QR code and pick a music genre, and the DJ polls live
//! per-genre counters.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, polling)
//!     │
//!     ├── REST Handlers + rate limits (api/)
//!     ├── Auth extractors (auth/)
//!     │
//!     ├── EventService / UserService / ActivationService (service/)
//!     ├── apply_genre_change (domain/)
//!     │
//!     ├── Store: per-document locked registries (store/)
//!     │
//!     └── PostgreSQL write-through (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod store;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use app_state::AppState;

/// Builds the full application: routes, tracing and CORS layers, state.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(api::build_router(&state.limiter))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
