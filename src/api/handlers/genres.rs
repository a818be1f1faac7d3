//! Genre handlers: the DJ's per-genre breakdown.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::auth::DjUser;
use crate::error::{ApiError, ErrorResponse};
use crate::service::GenreStat;

/// `GET /genres/genre-stats`: Genre breakdown of the DJ's audience.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] for non-DJs.
#[utoipa::path(
    get,
    path = "/api/genres/genre-stats",
    tag = "Genres",
    summary = "Genre statistics",
    description = "Per-genre choice counts at the calling DJ's events, split by gender, with each genre's share in percent. Most popular first.",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Genre breakdown", body = Vec<GenreStat>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Caller is not a DJ", body = ErrorResponse),
    )
)]
pub async fn genre_stats(
    State(state): State<AppState>,
    DjUser(dj): DjUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.user_service.genre_stats(&dj).await))
}

/// Genre routes, relative to `/api`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/genres/genre-stats", get(genre_stats))
}
