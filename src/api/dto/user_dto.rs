//! Account, profile and QR DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::{
    validate_email, validate_gender, validate_genre, validate_name, validate_phone,
    validate_youtube_link,
};
use crate::domain::{Event, Gender, User};
use crate::error::ApiError;
use crate::service::NewUser;

/// Request body for `POST /user/register`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Display name (2 to 100 characters).
    pub name: String,
    /// E-mail address.
    pub email: String,
    /// Optional ten-digit phone number.
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Optional `male`, `female` or `other`.
    #[serde(default)]
    pub gender: Option<String>,
}

impl RegisterRequest {
    /// Checks every field and converts to a [`NewUser`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] naming the first bad field.
    pub fn validate(self) -> Result<NewUser, ApiError> {
        Ok(NewUser {
            name: validate_name(&self.name)?,
            email: validate_email(&self.email)?,
            phone_number: validate_phone(self.phone_number.as_deref())?,
            gender: validate_gender(self.gender.as_deref())?,
        })
    }
}

/// Request body for `POST /user/login`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// E-mail address of an existing account.
    pub email: String,
}

impl LoginRequest {
    /// Checks the address shape.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] if the address is malformed.
    pub fn validate(self) -> Result<String, ApiError> {
        validate_email(&self.email)
    }
}

/// Response body for register and login. The token is also set as the
/// `token` cookie.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// Human-readable outcome.
    pub message: String,
    /// The signed-in user.
    pub user: User,
    /// Bearer token.
    pub token: String,
}

/// Response body for `GET /user/check-auth`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckAuthResponse {
    /// Always `true`; unauthenticated callers get a 401.
    pub is_authenticated: bool,
    /// `true` for DJs.
    pub is_admin: bool,
    /// The caller.
    pub user: User,
}

/// Response body for `GET /user/check-admin`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckAdminResponse {
    /// `true` for DJs.
    pub is_admin: bool,
}

/// Request body for `POST /user/update-profile`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    /// Ten-digit phone number; blank clears it.
    #[serde(default)]
    pub phone_number: Option<String>,
    /// `male`, `female` or `other`; blank clears it.
    #[serde(default)]
    pub gender: Option<String>,
}

impl UpdateProfileRequest {
    /// Checks both fields.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] naming the bad field.
    pub fn validate(self) -> Result<(Option<String>, Option<Gender>), ApiError> {
        Ok((
            validate_phone(self.phone_number.as_deref())?,
            validate_gender(self.gender.as_deref())?,
        ))
    }
}

/// Response body wrapping an updated user.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserMessageResponse {
    /// Human-readable outcome.
    pub message: String,
    /// The user after the change.
    pub user: User,
    /// Whether the profile is complete.
    pub profile_completed: bool,
}

impl UserMessageResponse {
    /// Pairs `message` with `user`.
    #[must_use]
    pub fn new(message: impl Into<String>, user: User) -> Self {
        Self {
            message: message.into(),
            profile_completed: user.profile_completed,
            user,
        }
    }
}

/// Request body for `POST /user/update-genre`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGenreRequest {
    /// New current genre.
    pub genre: String,
    /// Optional YouTube link.
    #[serde(default, alias = "youtubeLink")]
    pub media_link: Option<String>,
}

impl UpdateGenreRequest {
    /// Returns the trimmed genre and the optional YouTube link.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] on a blank genre or a link
    /// that is not a YouTube URL.
    pub fn validate(self) -> Result<(String, Option<String>), ApiError> {
        Ok((
            validate_genre(&self.genre)?,
            validate_youtube_link(self.media_link.as_deref())?,
        ))
    }
}

/// Request body for `POST /user/scan-qr`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanQrRequest {
    /// The DJ id encoded in the scanned QR code.
    pub qr_code_identifier: String,
}

/// Response body for `POST /user/scan-qr`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanQrResponse {
    /// Human-readable outcome.
    pub message: String,
    /// Title of the joined event.
    pub event_name: String,
    /// Venue of the joined event.
    pub event_location: String,
    /// Start of the joined event.
    pub event_date: DateTime<Utc>,
}

impl ScanQrResponse {
    /// Summarizes the joined `event` hosted by `dj_name`.
    #[must_use]
    pub fn new(dj_name: &str, event: Event) -> Self {
        Self {
            message: format!("Successfully joined DJ {dj_name}'s event!"),
            event_name: event.name,
            event_location: event.location,
            event_date: event.date,
        }
    }
}

/// Response body for `GET /user/generate-qr/{id}`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserQrResponse {
    /// Payload to encode in the user's QR image.
    pub qr_code: String,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn register_normalizes_optional_fields() {
        let req = RegisterRequest {
            name: " Ada ".to_string(),
            email: "ada@example.com".to_string(),
            phone_number: Some(String::new()),
            gender: Some("female".to_string()),
        };
        let Ok(new) = req.validate() else {
            panic!("should validate");
        };
        assert_eq!(new.name, "Ada");
        assert!(new.phone_number.is_none());
        assert_eq!(new.gender, Some(Gender::Female));
    }

    #[test]
    fn register_rejects_bad_phone() {
        let req = RegisterRequest {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone_number: Some("12345".to_string()),
            gender: None,
        };
        assert!(matches!(req.validate(), Err(ApiError::InvalidRequest(_))));
    }

    #[test]
    fn update_genre_requires_youtube_host() {
        let req = UpdateGenreRequest {
            genre: "Techno".to_string(),
            media_link: Some("https://soundcloud.com/x".to_string()),
        };
        assert!(req.validate().is_err());
    }
}
