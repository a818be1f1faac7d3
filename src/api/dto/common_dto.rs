//! Shared DTO types and field validators used across endpoints.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::{IntoParams, ToSchema};

use crate::domain::{EventId, Gender, UserId};
use crate::error::ApiError;

/// Hosts accepted for user-level media links.
const YOUTUBE_HOSTS: [&str; 4] = ["youtube.com", "www.youtube.com", "m.youtube.com", "youtu.be"];

/// Pagination query parameters for list endpoints.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (max 100). Defaults to 20.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

/// Pagination metadata included in list responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
    /// Total number of items.
    pub total: u32,
    /// Total number of pages.
    pub total_pages: u32,
}

/// Plain acknowledgement body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    /// Human-readable outcome.
    pub message: String,
}

impl MessageResponse {
    /// Wraps `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

impl PaginationParams {
    /// Clamps `per_page` to the allowed maximum of 100.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, 100),
        }
    }

    /// Returns the requested page of `items` with its metadata.
    #[must_use]
    pub fn paginate<T>(&self, items: Vec<T>) -> (Vec<T>, PaginationMeta) {
        let params = self.clamped();
        let total = u32::try_from(items.len()).unwrap_or(u32::MAX);
        let total_pages = if total == 0 {
            0
        } else {
            total.div_ceil(params.per_page)
        };
        let start = usize::try_from(
            u64::from(params.page - 1).saturating_mul(u64::from(params.per_page)),
        )
        .unwrap_or(usize::MAX);
        let data = items
            .into_iter()
            .skip(start)
            .take(params.per_page as usize)
            .collect();
        let meta = PaginationMeta {
            page: params.page,
            per_page: params.per_page,
            total,
            total_pages,
        };
        (data, meta)
    }
}

/// Parses a user id from a path or body field.
///
/// # Errors
///
/// Returns [`ApiError::InvalidId`] if `raw` is not a UUID.
pub fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    UserId::from_str(raw.trim()).map_err(|_| ApiError::InvalidId(format!("invalid user id: {raw}")))
}

/// Parses an event id from a path or body field.
///
/// # Errors
///
/// Returns [`ApiError::InvalidId`] if `raw` is not a UUID.
pub fn parse_event_id(raw: &str) -> Result<EventId, ApiError> {
    EventId::from_str(raw.trim())
        .map_err(|_| ApiError::InvalidId(format!("invalid event id: {raw}")))
}

/// Trims a display name and checks it is 2 to 100 characters.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] if the length is out of range.
pub fn validate_name(raw: &str) -> Result<String, ApiError> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(2..=100).contains(&len) {
        return Err(ApiError::InvalidRequest(
            "name must be between 2 and 100 characters".to_string(),
        ));
    }
    Ok(name.to_string())
}

/// Checks the shape `local@domain.tld` with no whitespace.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] if the address is malformed.
pub fn validate_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim();
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        })
        && !email.chars().any(char::is_whitespace);
    if !well_formed {
        return Err(ApiError::InvalidRequest(
            "email must be a valid address".to_string(),
        ));
    }
    Ok(email.to_string())
}

/// Blank means absent; otherwise exactly ten ASCII digits.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] for any other value.
pub fn validate_phone(raw: Option<&str>) -> Result<Option<String>, ApiError> {
    let Some(phone) = raw.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(None);
    };
    if phone.len() != 10 || !phone.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::InvalidRequest(
            "phone number must be exactly 10 digits".to_string(),
        ));
    }
    Ok(Some(phone.to_string()))
}

/// Blank means absent; otherwise `male`, `female` or `other`.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] for any other value.
pub fn validate_gender(raw: Option<&str>) -> Result<Option<Gender>, ApiError> {
    raw.map(str::trim)
        .filter(|g| !g.is_empty())
        .map(Gender::from_str)
        .transpose()
        .map_err(ApiError::InvalidRequest)
}

/// Trims a genre and rejects blanks.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] if nothing is left after trimming.
pub fn validate_genre(raw: &str) -> Result<String, ApiError> {
    let genre = raw.trim();
    if genre.is_empty() {
        return Err(ApiError::InvalidRequest(
            "genre choice must not be empty".to_string(),
        ));
    }
    Ok(genre.to_string())
}

/// Blank means absent; otherwise an absolute `http(s)` URL with a host.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] for anything else.
pub fn validate_media_link(raw: Option<&str>) -> Result<Option<String>, ApiError> {
    let Some(link) = raw.map(str::trim).filter(|l| !l.is_empty()) else {
        return Ok(None);
    };
    if web_host(link).is_none() {
        return Err(ApiError::InvalidRequest(
            "media link must be an http(s) URL".to_string(),
        ));
    }
    Ok(Some(link.to_string()))
}

/// Like [`validate_media_link`], restricted to YouTube hosts.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] if the link is not a YouTube URL.
pub fn validate_youtube_link(raw: Option<&str>) -> Result<Option<String>, ApiError> {
    let link = validate_media_link(raw)?;
    if let Some(link) = &link {
        let allowed = web_host(link).is_some_and(|host| YOUTUBE_HOSTS.contains(&host.as_str()));
        if !allowed {
            return Err(ApiError::InvalidRequest(
                "invalid YouTube URL provided".to_string(),
            ));
        }
    }
    Ok(link)
}

/// Lowercased host of an absolute `http(s)` URL with a domain or IP
/// host. Domains with empty labels are rejected.
fn web_host(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.to_ascii_lowercase();
    let labels_ok = match url.domain() {
        Some(domain) => domain.split('.').all(|label| !label.is_empty()),
        None => true,
    };
    labels_ok.then_some(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps_and_slices() {
        let params = PaginationParams {
            page: 2,
            per_page: 2,
        };
        let (page, meta) = params.paginate(vec![1, 2, 3, 4, 5]);
        assert_eq!(page, vec![3, 4]);
        assert_eq!(meta.total, 5);
        assert_eq!(meta.total_pages, 3);

        let wild = PaginationParams {
            page: 0,
            per_page: 1000,
        }
        .clamped();
        assert_eq!(wild.page, 1);
        assert_eq!(wild.per_page, 100);
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert!(validate_name(" A ").is_err());
        assert!(matches!(validate_name(" Ada "), Ok(n) if n == "Ada"));
        assert!(validate_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn email_shape() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("ada@example").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a da@example.com").is_err());
    }

    #[test]
    fn phone_is_optional_but_strict() {
        assert!(matches!(validate_phone(None), Ok(None)));
        assert!(matches!(validate_phone(Some("  ")), Ok(None)));
        assert!(validate_phone(Some("5551234567")).is_ok());
        assert!(validate_phone(Some("555-123-4567")).is_err());
        assert!(validate_phone(Some("555123456")).is_err());
    }

    #[test]
    fn gender_values() {
        assert!(matches!(validate_gender(Some("female")), Ok(Some(Gender::Female))));
        assert!(matches!(validate_gender(Some("")), Ok(None)));
        assert!(validate_gender(Some("robot")).is_err());
    }

    #[test]
    fn genre_must_not_be_blank() {
        assert!(validate_genre("   ").is_err());
        assert!(matches!(validate_genre(" Techno "), Ok(g) if g == "Techno"));
    }

    #[test]
    fn media_links() {
        assert!(matches!(validate_media_link(Some("")), Ok(None)));
        assert!(validate_media_link(Some("https://soundcloud.com/x")).is_ok());
        assert!(validate_media_link(Some("ftp://example.com/x")).is_err());
        assert!(validate_media_link(Some("https://exa mple.com")).is_err());
    }

    #[test]
    fn malformed_links_are_rejected() {
        for link in [
            "https://[",
            "https://exa%mple",
            "https://a..b/",
            "https://",
            "not a url",
            "mailto:dj@example.com",
        ] {
            assert!(validate_media_link(Some(link)).is_err(), "{link} accepted");
        }
        assert!(validate_youtube_link(Some("https://youtube.com:abc/watch")).is_err());
        assert!(validate_youtube_link(Some("https://YouTube.com/watch?v=abc")).is_ok());
        assert!(validate_youtube_link(Some("https://youtube.com.evil.net/watch")).is_err());
    }

    #[test]
    fn youtube_links() {
        assert!(validate_youtube_link(Some("https://www.youtube.com/watch?v=abc")).is_ok());
        assert!(validate_youtube_link(Some("https://youtu.be/abc")).is_ok());
        assert!(validate_youtube_link(Some("https://vimeo.com/abc")).is_err());
        assert!(matches!(validate_youtube_link(None), Ok(None)));
    }

    #[test]
    fn ids_reject_garbage() {
        assert!(matches!(parse_user_id("nope"), Err(ApiError::InvalidId(_))));
        let id = UserId::new();
        assert!(matches!(parse_user_id(&id.to_string()), Ok(parsed) if parsed == id));
    }
}
