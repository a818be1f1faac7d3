//! Event handlers: CRUD, views, registration, genre selection, serials.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{
    AssignUserRequest, CreateEventRequest, DjNameResponse, EventListResponse,
    EventMessageResponse, GenreSelectRequest, GenreUpdateRequest, MessageResponse,
    PaginationParams, QrCodeResponse, UpdateEventRequest, UserMessageResponse,
    ValidateSerialRequest, parse_event_id, parse_user_id,
};
use crate::api::rate_limit::{self, Limited, RateLimiter};
use crate::app_state::AppState;
use crate::auth::{CurrentUser, DjUser};
use crate::domain::Event;
use crate::error::{ApiError, ErrorResponse};
use crate::service::EventView;

/// `GET /events`: List all events.
///
/// # Errors
///
/// Never fails; the `Result` keeps the handler signature uniform.
#[utoipa::path(
    get,
    path = "/api/events",
    tag = "Events",
    summary = "List events",
    description = "Returns a page of all events, ascending by date.",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated event list", body = EventListResponse),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let events = state.event_service.list_events().await;
    let (data, pagination) = params.paginate(events);
    Ok(Json(EventListResponse { data, pagination }))
}

/// `POST /events`: Create an event.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] for non-DJs or
/// [`ApiError::InvalidRequest`] on bad fields.
#[utoipa::path(
    post,
    path = "/api/events",
    tag = "Events",
    summary = "Create an event",
    description = "Creates an event owned by the calling DJ. Guests get 403 and nothing is stored.",
    request_body = CreateEventRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Event created", body = EventMessageResponse),
        (status = 400, description = "Invalid fields", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Caller is not a DJ", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    DjUser(dj): DjUser,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new = req.validate()?;
    let event = state.event_service.create_event(&dj, new).await?;
    Ok((
        StatusCode::CREATED,
        Json(EventMessageResponse::new("Event created successfully!", event)),
    ))
}

/// `GET /events/live`: Today's events.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] without a valid token.
#[utoipa::path(
    get,
    path = "/api/events/live",
    tag = "Events",
    summary = "Live events",
    description = "Events dated today in the service time zone. DJs see their own events, everyone else sees all. Always 200, possibly with an empty array.",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Today's events", body = Vec<EventView>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
    )
)]
pub async fn live_events(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.event_service.live_events(&user, Utc::now()).await))
}

/// `GET /events/history`: The DJ's past events.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] for non-DJs.
#[utoipa::path(
    get,
    path = "/api/events/history",
    tag = "Events",
    summary = "Event history",
    description = "The calling DJ's events dated before today, newest first.",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Past events", body = Vec<EventView>),
        (status = 403, description = "Caller is not a DJ", body = ErrorResponse),
    )
)]
pub async fn history_events(
    State(state): State<AppState>,
    DjUser(dj): DjUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.event_service.history_events(&dj, Utc::now()).await))
}

/// `GET /events/mine`: All of the DJ's events.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] for non-DJs.
#[utoipa::path(
    get,
    path = "/api/events/mine",
    tag = "Events",
    summary = "Own events",
    description = "Every event owned by the calling DJ, ascending by date.",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Own events", body = Vec<EventView>),
        (status = 403, description = "Caller is not a DJ", body = ErrorResponse),
    )
)]
pub async fn my_events(
    State(state): State<AppState>,
    DjUser(dj): DjUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.event_service.my_events(&dj).await))
}

/// `GET /events/{id}`: Event details.
///
/// # Errors
///
/// Returns [`ApiError::InvalidId`] or [`ApiError::EventNotFound`].
#[utoipa::path(
    get,
    path = "/api/events/{id}",
    tag = "Events",
    summary = "Get an event",
    params(("id" = String, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Event document", body = Event),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id = parse_event_id(&id)?;
    Ok(Json(state.event_service.get_event(event_id).await?))
}

/// `GET /events/user/{id}`: Events owned by one DJ.
///
/// # Errors
///
/// Returns [`ApiError::InvalidId`] on a malformed id.
#[utoipa::path(
    get,
    path = "/api/events/user/{id}",
    tag = "Events",
    summary = "Events by owner",
    description = "Every event owned by the given user, ascending by date. Empty for unknown users and guests.",
    params(("id" = String, Path, description = "Owner UUID")),
    responses(
        (status = 200, description = "Owned events", body = Vec<Event>),
        (status = 400, description = "Malformed id", body = ErrorResponse),
    )
)]
pub async fn events_by_owner(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let owner_id = parse_user_id(&id)?;
    Ok(Json(state.event_service.events_by_owner(owner_id).await))
}

/// `PUT /events/{id}`: Partially update an owned event.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] unless the caller owns the event.
#[utoipa::path(
    put,
    path = "/api/events/{id}",
    tag = "Events",
    summary = "Update an event",
    description = "Changes any of name, location, date and DJ name. Only the owning DJ may do this.",
    params(("id" = String, Path, description = "Event UUID")),
    request_body = UpdateEventRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated event", body = Event),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Concurrent modification", body = ErrorResponse),
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    DjUser(dj): DjUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id = parse_event_id(&id)?;
    let patch = req.validate()?;
    Ok(Json(
        state.event_service.update_event(&dj, event_id, patch).await?,
    ))
}

/// `DELETE /events/{id}`: Delete an owned event.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] unless the caller owns the event.
#[utoipa::path(
    delete,
    path = "/api/events/{id}",
    tag = "Events",
    summary = "Delete an event",
    params(("id" = String, Path, description = "Event UUID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Event deleted", body = MessageResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn delete_event(
    State(state): State<AppState>,
    DjUser(dj): DjUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id = parse_event_id(&id)?;
    state.event_service.delete_event(&dj, event_id).await?;
    Ok(Json(MessageResponse::new("Event deleted")))
}

/// `GET /events/{id}/dj`: Name of the event's DJ.
///
/// # Errors
///
/// Returns [`ApiError::EventNotFound`] or [`ApiError::DjNotFound`].
#[utoipa::path(
    get,
    path = "/api/events/{id}/dj",
    tag = "Events",
    summary = "Event DJ",
    params(("id" = String, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "DJ name", body = DjNameResponse),
        (status = 404, description = "Event or DJ not found", body = ErrorResponse),
    )
)]
pub async fn event_dj(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id = parse_event_id(&id)?;
    let dj_name = state.event_service.event_dj_name(event_id).await?;
    Ok(Json(DjNameResponse { dj_name }))
}

/// `GET /events/{id}/qr-code`: Registration link for the event QR code.
///
/// # Errors
///
/// Returns [`ApiError::EventNotFound`].
#[utoipa::path(
    get,
    path = "/api/events/{id}/qr-code",
    tag = "Events",
    summary = "Event QR payload",
    description = "Returns the registration URL to render as a QR image.",
    params(("id" = String, Path, description = "Event UUID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "QR payload", body = QrCodeResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn event_qr_code(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id = parse_event_id(&id)?;
    let qr_code = state.event_service.qr_payload(event_id).await?;
    Ok(Json(QrCodeResponse { qr_code }))
}

/// `PUT /events/{id}/genre-update`: Change a registered guest's genre.
///
/// # Errors
///
/// Returns [`ApiError::GuestNotRegistered`] or [`ApiError::Forbidden`].
#[utoipa::path(
    put,
    path = "/api/events/{id}/genre-update",
    tag = "Genres",
    summary = "Update a guest's genre",
    description = "The guest must already be registered. The caller must be that guest or the event owner.",
    params(("id" = String, Path, description = "Event UUID")),
    request_body = GenreUpdateRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Genre updated", body = EventMessageResponse),
        (status = 403, description = "Caller may not change this choice", body = ErrorResponse),
        (status = 404, description = "Event not found or guest not registered", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
    )
)]
pub async fn genre_update(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<GenreUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id = parse_event_id(&id)?;
    let update = req.validate()?;
    let event = state
        .event_service
        .update_guest_genre(
            &caller,
            event_id,
            update.guest_id,
            &update.genre,
            update.media_link.as_deref(),
        )
        .await?;
    Ok(Json(EventMessageResponse::new(
        "Genre updated successfully",
        event,
    )))
}

/// `POST /events/{id}/genre-select`: Pick a genre for yourself.
///
/// # Errors
///
/// Returns [`ApiError::EventNotFound`] or [`ApiError::InvalidRequest`].
#[utoipa::path(
    post,
    path = "/api/events/{id}/genre-select",
    tag = "Genres",
    summary = "Select a genre",
    description = "Registers the caller if needed, then records their genre and updates the counters.",
    params(("id" = String, Path, description = "Event UUID")),
    request_body = GenreSelectRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Genre recorded", body = EventMessageResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
    )
)]
pub async fn genre_select(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<GenreSelectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id = parse_event_id(&id)?;
    let (genre, media_link) = req.validate()?;
    let event = state
        .event_service
        .select_genre(&caller, event_id, &genre, media_link.as_deref())
        .await?;
    Ok(Json(EventMessageResponse::new(
        "Genre updated successfully",
        event,
    )))
}

/// `POST /events/assign-user`: Register a guest for an event.
///
/// # Errors
///
/// Returns [`ApiError::AlreadyRegistered`], [`ApiError::EventNotFound`]
/// or [`ApiError::UserNotFound`].
#[utoipa::path(
    post,
    path = "/api/events/assign-user",
    tag = "Events",
    summary = "Assign a guest",
    description = "Appends the guest to the event with no genre yet. Used right after QR registration.",
    request_body = AssignUserRequest,
    responses(
        (status = 200, description = "Guest assigned", body = EventMessageResponse),
        (status = 404, description = "Event or user not found", body = ErrorResponse),
        (status = 409, description = "Already registered", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
    )
)]
pub async fn assign_user(
    State(state): State<AppState>,
    Json(req): Json<AssignUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (event_id, guest_id) = req.validate()?;
    let event = state.event_service.assign(event_id, guest_id).await?;
    Ok(Json(EventMessageResponse::new(
        "User successfully assigned to event",
        event,
    )))
}

/// `POST /events/validate-serial`: Redeem a serial for the DJ role.
///
/// # Errors
///
/// Returns [`ApiError::SerialUnavailable`] for unknown or used codes.
#[utoipa::path(
    post,
    path = "/api/events/validate-serial",
    tag = "Events",
    summary = "Redeem an activation serial",
    description = "Consumes an unused serial and promotes the caller to DJ. Unknown and used codes fail identically.",
    request_body = ValidateSerialRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller promoted", body = UserMessageResponse),
        (status = 400, description = "Invalid or already used serial", body = ErrorResponse),
    )
)]
pub async fn validate_serial(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ValidateSerialRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let code = req.validate()?;
    let user = state.activation_service.activate(&code, user.id).await?;
    Ok(Json(UserMessageResponse::new(
        "You are now registered as a DJ",
        user,
    )))
}

/// Event routes, relative to `/api`.
pub fn routes(limiter: &Arc<RateLimiter>) -> Router<AppState> {
    let genre_limit = || from_fn_with_state(Limited::new(limiter, rate_limit::GENRE), rate_limit::enforce);

    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/live", get(live_events))
        .route("/events/history", get(history_events))
        .route("/events/mine", get(my_events))
        .route("/events/user/{id}", get(events_by_owner))
        .route(
            "/events/assign-user",
            post(assign_user).route_layer(from_fn_with_state(
                Limited::new(limiter, rate_limit::ASSIGN_USER),
                rate_limit::enforce,
            )),
        )
        .route("/events/validate-serial", post(validate_serial))
        .route(
            "/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/events/{id}/dj", get(event_dj))
        .route("/events/{id}/qr-code", get(event_qr_code))
        .route(
            "/events/{id}/genre-update",
            put(genre_update).route_layer(genre_limit()),
        )
        .route(
            "/events/{id}/genre-select",
            post(genre_select).route_layer(genre_limit()),
        )
}
