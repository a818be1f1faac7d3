//! User handlers: accounts, session, profile, QR join and DJ reporting.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, SET_COOKIE};
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{
    AuthResponse, CheckAdminResponse, CheckAuthResponse, DjNameResponse, LoginRequest,
    MessageResponse, RegisterRequest, ScanQrRequest, ScanQrResponse, UpdateGenreRequest,
    UpdateProfileRequest, UserMessageResponse, UserQrResponse, parse_user_id,
};
use crate::api::rate_limit::{self, Limited, RateLimiter};
use crate::app_state::AppState;
use crate::auth::{CurrentUser, DjUser};
use crate::domain::User;
use crate::error::{ApiError, ErrorResponse};
use crate::service::{DjSummary, UserStats};

/// `POST /user/register`: Create a guest account and sign in.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] or [`ApiError::EmailTaken`].
#[utoipa::path(
    post,
    path = "/api/user/register",
    tag = "Users",
    summary = "Register",
    description = "Creates a guest account. The token is returned in the body and set as the `token` cookie.",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = AuthResponse),
        (status = 400, description = "Invalid fields", body = ErrorResponse),
        (status = 409, description = "E-mail already in use", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new = req.validate()?;
    let user = state.user_service.register(new).await?;
    let token = state.tokens.issue(user.id)?;
    let cookie = state.tokens.session_cookie(&token);
    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, cookie)],
        Json(AuthResponse {
            message: "Registration successful".to_string(),
            user,
            token,
        }),
    ))
}

/// `POST /user/login`: Sign in by e-mail.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] for malformed or unknown
/// addresses.
#[utoipa::path(
    post,
    path = "/api/user/login",
    tag = "Users",
    summary = "Log in",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Invalid email", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.validate()?;
    let user = state.user_service.login(&email).await?;
    let token = state.tokens.issue(user.id)?;
    let cookie = state.tokens.session_cookie(&token);
    Ok((
        [(SET_COOKIE, cookie)],
        Json(AuthResponse {
            message: "Login successful".to_string(),
            user,
            token,
        }),
    ))
}

/// `POST /user/logout`: Clear the session cookie.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] without a valid token.
#[utoipa::path(
    post,
    path = "/api/user/logout",
    tag = "Users",
    summary = "Log out",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Cookie cleared", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(user_id = %user.id, "user logged out");
    Ok((
        [(SET_COOKIE, state.tokens.removal_cookie())],
        Json(MessageResponse::new("Logout successful")),
    ))
}

/// `GET /user/check-auth`: Reports whether the session cookie is valid.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] without a valid token.
#[utoipa::path(
    get,
    path = "/api/user/check-auth",
    tag = "Users",
    summary = "Check authentication",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Authenticated", body = CheckAuthResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
    )
)]
pub async fn check_auth(CurrentUser(user): CurrentUser) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(CheckAuthResponse {
        is_authenticated: true,
        is_admin: user.is_dj(),
        user,
    }))
}

/// `GET /user/check-admin`: Whether the caller is a DJ.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] without a valid token.
#[utoipa::path(
    get,
    path = "/api/user/check-admin",
    tag = "Users",
    summary = "Check DJ role",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Role flag", body = CheckAdminResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
    )
)]
pub async fn check_admin(CurrentUser(user): CurrentUser) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(CheckAdminResponse {
        is_admin: user.is_dj(),
    }))
}

/// `GET /user/current-user`: The caller's record.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] without a valid token.
#[utoipa::path(
    get,
    path = "/api/user/current-user",
    tag = "Users",
    summary = "Current user",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User record", body = User),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
    )
)]
pub async fn current_user(CurrentUser(user): CurrentUser) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(user))
}

/// `POST /user/update-profile`: Set phone and gender.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] on bad fields.
#[utoipa::path(
    post,
    path = "/api/user/update-profile",
    tag = "Users",
    summary = "Complete profile",
    request_body = UpdateProfileRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Profile updated", body = UserMessageResponse),
        (status = 400, description = "Invalid fields", body = ErrorResponse),
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (phone_number, gender) = req.validate()?;
    let user = state
        .user_service
        .update_profile(user.id, phone_number, gender)
        .await?;
    Ok(Json(UserMessageResponse::new(
        "Profile updated successfully",
        user,
    )))
}

/// `POST /user/update-genre`: Set the caller's current genre.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] on a blank genre or a non-YouTube
/// link.
#[utoipa::path(
    post,
    path = "/api/user/update-genre",
    tag = "Genres",
    summary = "Update current genre",
    description = "Stores the caller's genre and re-applies it to every event they are registered for.",
    request_body = UpdateGenreRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Genre updated", body = UserMessageResponse),
        (status = 400, description = "Invalid genre or link", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
    )
)]
pub async fn update_genre(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<UpdateGenreRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (genre, media_link) = req.validate()?;
    let user = state
        .user_service
        .update_genre(user.id, &genre, media_link.as_deref())
        .await?;
    Ok(Json(UserMessageResponse::new(
        "Genre and media link updated successfully",
        user,
    )))
}

/// `POST /user/scan-qr`: Join a DJ's live event.
///
/// # Errors
///
/// Returns [`ApiError::DjNotFound`], [`ApiError::NoLiveEvent`] or
/// [`ApiError::AlreadyRegistered`].
#[utoipa::path(
    post,
    path = "/api/user/scan-qr",
    tag = "Users",
    summary = "Join via DJ QR code",
    description = "Registers the caller for the DJ's first event today and counts their current genre.",
    request_body = ScanQrRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Joined", body = ScanQrResponse),
        (status = 404, description = "DJ or live event not found", body = ErrorResponse),
        (status = 409, description = "Already registered", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
    )
)]
pub async fn scan_qr(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ScanQrRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let dj_id = parse_user_id(&req.qr_code_identifier)?;
    let event = state
        .event_service
        .join_live_event(&user, dj_id, Utc::now())
        .await?;
    let dj_name = event.dj_name.clone();
    Ok(Json(ScanQrResponse::new(&dj_name, event)))
}

/// `GET /user/user-stats`: Audience counters for the DJ's events.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] for non-DJs.
#[utoipa::path(
    get,
    path = "/api/user/user-stats",
    tag = "Users",
    summary = "Audience statistics",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Counters", body = UserStats),
        (status = 403, description = "Caller is not a DJ", body = ErrorResponse),
    )
)]
pub async fn user_stats(
    State(state): State<AppState>,
    DjUser(dj): DjUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.user_service.stats(&dj).await))
}

/// `GET /user/download-user-details`: CSV of the DJ's guests.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] for non-DJs.
#[utoipa::path(
    get,
    path = "/api/user/download-user-details",
    tag = "Users",
    summary = "Export guests as CSV",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv", body = String),
        (status = 403, description = "Caller is not a DJ", body = ErrorResponse),
    )
)]
pub async fn download_user_details(
    State(state): State<AppState>,
    DjUser(dj): DjUser,
) -> Result<impl IntoResponse, ApiError> {
    let csv = state.user_service.export_csv(&dj).await?;
    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                CONTENT_DISPOSITION,
                "attachment; filename=\"user-details.csv\"",
            ),
        ],
        csv,
    ))
}

/// `GET /user/dj-info/{id}`: A DJ's display name.
///
/// # Errors
///
/// Returns [`ApiError::InvalidId`] or [`ApiError::DjNotFound`].
#[utoipa::path(
    get,
    path = "/api/user/dj-info/{id}",
    tag = "Users",
    summary = "DJ info",
    params(("id" = String, Path, description = "DJ user UUID")),
    responses(
        (status = 200, description = "DJ name", body = DjNameResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "DJ not found", body = ErrorResponse),
    )
)]
pub async fn dj_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let dj_id = parse_user_id(&id)?;
    let dj_name = state.user_service.dj_info(dj_id).await?;
    Ok(Json(DjNameResponse { dj_name }))
}

/// `GET /user/djs`: List DJs.
///
/// # Errors
///
/// Never fails; the `Result` keeps the handler signature uniform.
#[utoipa::path(
    get,
    path = "/api/user/djs",
    tag = "Users",
    summary = "List DJs",
    responses(
        (status = 200, description = "DJs", body = Vec<DjSummary>),
    )
)]
pub async fn list_djs(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.user_service.list_djs().await))
}

/// `GET /user/generate-qr/{id}`: A user's QR payload.
///
/// # Errors
///
/// Returns [`ApiError::InvalidId`] or [`ApiError::UserNotFound`].
#[utoipa::path(
    get,
    path = "/api/user/generate-qr/{id}",
    tag = "Users",
    summary = "User QR payload",
    params(("id" = String, Path, description = "User UUID")),
    responses(
        (status = 200, description = "QR payload", body = UserQrResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn generate_qr(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_user_id(&id)?;
    let qr_code = state.user_service.qr_payload(user_id).await?;
    Ok(Json(UserQrResponse { qr_code }))
}

/// User routes, relative to `/api`.
pub fn routes(limiter: &Arc<RateLimiter>) -> Router<AppState> {
    Router::new()
        .route(
            "/user/register",
            post(register).route_layer(from_fn_with_state(
                Limited::new(limiter, rate_limit::REGISTER),
                rate_limit::enforce,
            )),
        )
        .route(
            "/user/login",
            post(login).route_layer(from_fn_with_state(
                Limited::new(limiter, rate_limit::LOGIN),
                rate_limit::enforce,
            )),
        )
        .route("/user/logout", post(logout))
        .route("/user/check-auth", get(check_auth))
        .route("/user/check-admin", get(check_admin))
        .route("/user/current-user", get(current_user))
        .route("/user/update-profile", post(update_profile))
        .route(
            "/user/update-genre",
            post(update_genre).route_layer(from_fn_with_state(
                Limited::new(limiter, rate_limit::GENRE),
                rate_limit::enforce,
            )),
        )
        .route(
            "/user/scan-qr",
            post(scan_qr).route_layer(from_fn_with_state(
                Limited::new(limiter, rate_limit::SCAN_QR),
                rate_limit::enforce,
            )),
        )
        .route("/user/user-stats", get(user_stats))
        .route("/user/download-user-details", get(download_user_details))
        .route("/user/dj-info/{id}", get(dj_info))
        .route("/user/djs", get(list_djs))
        .route("/user/generate-qr/{id}", get(generate_qr))
}
