//! User records: guests and DJs.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{EventId, UserId};

/// Role flag distinguishing guests from DJs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular attendee. Registers for events and picks a genre.
    #[default]
    Guest,
    /// Elevated user who owns events.
    Dj,
}

/// Self-declared gender, used only for the DJ statistics page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
    /// Any other answer.
    Other,
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            other => Err(format!("gender must be one of male, female, other (got {other:?})")),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        })
    }
}

/// Third-party identity provider a user was first created through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// Google sign-in.
    Google,
    /// Facebook login.
    Facebook,
}

/// Genre chosen for a specific event, kept on the user for history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventPreference {
    /// Event the preference belongs to.
    pub event_id: EventId,
    /// Genre at the time the guest joined.
    pub genre_choice: String,
}

/// A persisted user document.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Unique, lower-cased e-mail address.
    pub email: String,
    /// Ten-digit phone number.
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Optional gender.
    #[serde(default)]
    pub gender: Option<Gender>,
    /// Guest or DJ.
    #[serde(default)]
    pub role: Role,
    /// Cached current genre choice (empty when none picked yet).
    #[serde(default)]
    pub genre_choice: String,
    /// Cached media link attached to the genre choice.
    #[serde(default)]
    pub media_link: String,
    /// External identity provider, if the account came from one.
    #[serde(default)]
    pub auth_provider: Option<AuthProvider>,
    /// Account id at the external identity provider.
    #[serde(default)]
    pub external_id: Option<String>,
    /// Set once phone and gender have been supplied.
    #[serde(default)]
    pub profile_completed: bool,
    /// Cached QR payload identifying this user.
    #[serde(default)]
    pub qr_payload: Option<String>,
    /// Per-event genre history recorded on QR joins.
    #[serde(default)]
    pub event_preferences: Vec<EventPreference>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a guest from a manual registration. Manual registrations
    /// count as complete profiles because phone and gender are optional.
    #[must_use]
    pub fn register(
        name: String,
        email: &str,
        phone_number: Option<String>,
        gender: Option<Gender>,
    ) -> Self {
        let now = Utc::now();
        let id = UserId::new();
        Self {
            id,
            name,
            email: normalize_email(email),
            phone_number,
            gender,
            role: Role::Guest,
            genre_choice: String::new(),
            media_link: String::new(),
            auth_provider: None,
            external_id: None,
            profile_completed: true,
            qr_payload: Some(id.to_string()),
            event_preferences: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` if this user holds the DJ role.
    #[must_use]
    pub fn is_dj(&self) -> bool {
        self.role == Role::Dj
    }

    /// Grants the DJ role.
    pub fn promote_to_dj(&mut self) {
        self.role = Role::Dj;
        self.touch();
    }

    /// Records a genre choice. The media link is only overwritten when a
    /// non-empty one is supplied.
    pub fn set_genre(&mut self, genre: &str, media_link: Option<&str>) {
        genre.clone_into(&mut self.genre_choice);
        if let Some(link) = media_link.filter(|l| !l.is_empty()) {
            link.clone_into(&mut self.media_link);
        }
        self.touch();
    }

    /// Stores phone and gender and marks the profile complete.
    pub fn complete_profile(&mut self, phone_number: Option<String>, gender: Option<Gender>) {
        self.phone_number = phone_number;
        self.gender = gender;
        self.profile_completed = true;
        self.touch();
    }

    /// Appends an event preference entry.
    pub fn record_event_preference(&mut self, event_id: EventId, genre_choice: String) {
        self.event_preferences.push(EventPreference {
            event_id,
            genre_choice,
        });
        self.touch();
    }

    /// Returns the QR payload, generating and caching it on first use.
    pub fn ensure_qr_payload(&mut self) -> &str {
        let id = self.id;
        self.qr_payload.get_or_insert_with(|| id.to_string())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Canonical form used for the unique e-mail index.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guest() -> User {
        User::register("Ada".to_string(), " Ada@Example.COM ", None, None)
    }

    #[test]
    fn register_creates_complete_guest_with_normalized_email() {
        let user = guest();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.role, Role::Guest);
        assert!(user.profile_completed);
        assert_eq!(user.qr_payload.as_deref(), Some(user.id.to_string().as_str()));
    }

    #[test]
    fn set_genre_keeps_media_link_when_none_given() {
        let mut user = guest();
        user.set_genre("Techno", Some("https://youtu.be/abc"));
        user.set_genre("House", None);
        assert_eq!(user.genre_choice, "House");
        assert_eq!(user.media_link, "https://youtu.be/abc");
    }

    #[test]
    fn promote_sets_dj_role() {
        let mut user = guest();
        assert!(!user.is_dj());
        user.promote_to_dj();
        assert!(user.is_dj());
    }

    #[test]
    fn gender_parsing_rejects_unknown_values() {
        assert_eq!("female".parse::<Gender>(), Ok(Gender::Female));
        assert!("robot".parse::<Gender>().is_err());
    }

    #[test]
    fn ensure_qr_payload_is_cached() {
        let mut user = guest();
        user.qr_payload = None;
        let first = user.ensure_qr_payload().to_string();
        assert_eq!(first, user.id.to_string());
        assert_eq!(user.qr_payload.as_deref(), Some(first.as_str()));
    }
}
