//! Event, registration and genre DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::{
    PaginationMeta, parse_event_id, parse_user_id, validate_genre, validate_media_link,
};
use crate::domain::{Event, EventId, UserId};
use crate::error::ApiError;
use crate::service::{EventPatch, NewEvent};

/// Request body for `POST /events`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    /// Display name; defaults to the caller's name.
    #[serde(default)]
    pub dj_name: Option<String>,
    /// Event title.
    #[serde(alias = "eventName")]
    pub name: String,
    /// Venue.
    #[serde(alias = "eventLocation")]
    pub location: String,
    /// Scheduled start (RFC 3339).
    #[serde(alias = "eventDate")]
    pub date: DateTime<Utc>,
}

impl CreateEventRequest {
    /// Checks required fields and converts to a [`NewEvent`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] if the name or location is
    /// blank.
    pub fn validate(self) -> Result<NewEvent, ApiError> {
        Ok(NewEvent {
            dj_name: self.dj_name.map(|n| n.trim().to_string()),
            name: required("event name", &self.name)?,
            location: required("event location", &self.location)?,
            date: self.date,
        })
    }
}

/// Request body for `PUT /events/{id}`. Absent fields stay unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    /// New display name.
    #[serde(default)]
    pub dj_name: Option<String>,
    /// New title.
    #[serde(default, alias = "eventName")]
    pub name: Option<String>,
    /// New venue.
    #[serde(default, alias = "eventLocation")]
    pub location: Option<String>,
    /// New start.
    #[serde(default, alias = "eventDate")]
    pub date: Option<DateTime<Utc>>,
}

impl UpdateEventRequest {
    /// Checks supplied fields and converts to an [`EventPatch`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] if a supplied text field is
    /// blank.
    pub fn validate(self) -> Result<EventPatch, ApiError> {
        Ok(EventPatch {
            dj_name: self.dj_name.map(|n| required("DJ name", &n)).transpose()?,
            name: self.name.map(|n| required("event name", &n)).transpose()?,
            location: self
                .location
                .map(|l| required("event location", &l))
                .transpose()?,
            date: self.date,
        })
    }
}

/// Request body for `PUT /events/{id}/genre-update`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenreUpdateRequest {
    /// Guest whose choice changes.
    pub user_id: String,
    /// New genre.
    pub genre_choice: String,
    /// Optional http(s) media link.
    #[serde(default, alias = "youtubeLink")]
    pub media_link: Option<String>,
}

/// Validated [`GenreUpdateRequest`].
#[derive(Debug, Clone)]
pub struct GenreUpdate {
    /// Guest whose choice changes.
    pub guest_id: UserId,
    /// Trimmed genre.
    pub genre: String,
    /// Media link, if one was given.
    pub media_link: Option<String>,
}

impl GenreUpdateRequest {
    /// Parses the id and checks genre and link.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidId`] or [`ApiError::InvalidRequest`].
    pub fn validate(self) -> Result<GenreUpdate, ApiError> {
        Ok(GenreUpdate {
            guest_id: parse_user_id(&self.user_id)?,
            genre: validate_genre(&self.genre_choice)?,
            media_link: validate_media_link(self.media_link.as_deref())?,
        })
    }
}

/// Request body for `POST /events/{id}/genre-select`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenreSelectRequest {
    /// Genre for the caller.
    pub genre_choice: String,
    /// Optional http(s) media link.
    #[serde(default, alias = "youtubeLink")]
    pub media_link: Option<String>,
}

impl GenreSelectRequest {
    /// Returns the trimmed genre and the optional link.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] on a blank genre or bad link.
    pub fn validate(self) -> Result<(String, Option<String>), ApiError> {
        Ok((
            validate_genre(&self.genre_choice)?,
            validate_media_link(self.media_link.as_deref())?,
        ))
    }
}

/// Request body for `POST /events/assign-user`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignUserRequest {
    /// Target event.
    pub event_id: String,
    /// Guest to register.
    pub user_id: String,
    /// DJ from the scanned QR link; checked for shape only.
    #[serde(default)]
    pub dj_id: Option<String>,
}

impl AssignUserRequest {
    /// Parses the identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidId`] if any id is malformed.
    pub fn validate(self) -> Result<(EventId, UserId), ApiError> {
        if let Some(dj_id) = self.dj_id.as_deref().filter(|d| !d.trim().is_empty()) {
            parse_user_id(dj_id)?;
        }
        Ok((parse_event_id(&self.event_id)?, parse_user_id(&self.user_id)?))
    }
}

/// Request body for `POST /events/validate-serial`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateSerialRequest {
    /// Activation code.
    pub serial: String,
}

impl ValidateSerialRequest {
    /// Returns the trimmed code.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] if the code is blank.
    pub fn validate(self) -> Result<String, ApiError> {
        required("serial", &self.serial)
    }
}

/// Response body wrapping a changed event.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventMessageResponse {
    /// Human-readable outcome.
    pub message: String,
    /// The event after the change.
    pub event: Event,
}

impl EventMessageResponse {
    /// Pairs `message` with `event`.
    #[must_use]
    pub fn new(message: impl Into<String>, event: Event) -> Self {
        Self {
            message: message.into(),
            event,
        }
    }
}

/// Response body for `GET /events`.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventListResponse {
    /// Events on this page, ascending by date.
    pub data: Vec<Event>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Response body carrying a DJ's display name.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DjNameResponse {
    /// DJ display name.
    pub dj_name: String,
}

/// Response body for `GET /events/{id}/qr-code`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeResponse {
    /// Registration URL to encode in the QR image.
    pub qr_code: String,
}

fn required(field: &str, raw: &str) -> Result<String, ApiError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ApiError::InvalidRequest(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn create_accepts_legacy_field_names() {
        let raw = r#"{"eventName":"Night","eventLocation":"Club","eventDate":"2024-06-01T20:00:00Z"}"#;
        let Ok(req) = serde_json::from_str::<CreateEventRequest>(raw) else {
            panic!("should deserialize");
        };
        let Ok(new) = req.validate() else {
            panic!("should validate");
        };
        assert_eq!(new.name, "Night");
        assert!(new.dj_name.is_none());
    }

    #[test]
    fn blank_patch_field_is_rejected() {
        let req = UpdateEventRequest {
            location: Some("  ".to_string()),
            ..UpdateEventRequest::default()
        };
        assert!(matches!(req.validate(), Err(ApiError::InvalidRequest(_))));
    }

    #[test]
    fn genre_update_parses_user_id() {
        let req = GenreUpdateRequest {
            user_id: "not-a-uuid".to_string(),
            genre_choice: "Techno".to_string(),
            media_link: None,
        };
        assert!(matches!(req.validate(), Err(ApiError::InvalidId(_))));
    }

    #[test]
    fn assign_checks_optional_dj_id() {
        let event_id = EventId::new().to_string();
        let user_id = UserId::new().to_string();
        let bad = AssignUserRequest {
            event_id: event_id.clone(),
            user_id: user_id.clone(),
            dj_id: Some("zzz".to_string()),
        };
        assert!(bad.validate().is_err());

        let good = AssignUserRequest {
            event_id,
            user_id,
            dj_id: None,
        };
        assert!(good.validate().is_ok());
    }
}
