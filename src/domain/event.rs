//! Event documents with their embedded guest list and genre aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{EventId, UserId};
use crate::error::ApiError;

/// A guest's registration inside an event document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredGuest {
    /// Reference into the identity store.
    pub guest_id: UserId,
    /// Genre picked for this event; empty until the guest chooses.
    #[serde(default)]
    pub genre_choice: String,
    /// Optional media link (e.g. a YouTube track) attached to the choice.
    #[serde(default)]
    pub media_link: String,
}

impl RegisteredGuest {
    /// Fresh registration with no genre and no media link.
    #[must_use]
    pub fn new(guest_id: UserId) -> Self {
        Self {
            guest_id,
            genre_choice: String::new(),
            media_link: String::new(),
        }
    }
}

/// Denormalized per-genre counter embedded in the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenreAggregate {
    /// Genre name, matched exactly.
    pub genre_name: String,
    /// Number of registered guests currently on this genre.
    pub count: u32,
}

/// A persisted event document.
///
/// Holds two embedded collections that must stay consistent with each
/// other: every guest with a non-empty genre is counted exactly once in
/// `genre_stats`. Mutate them only through [`Event::assign`] and
/// [`super::apply_genre_change`].
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unique identifier.
    pub id: EventId,
    /// DJ owning the event.
    pub owner_id: UserId,
    /// DJ display name shown to guests.
    pub dj_name: String,
    /// Event title.
    pub name: String,
    /// Venue.
    pub location: String,
    /// Scheduled start.
    pub date: DateTime<Utc>,
    /// Registered guests, each at most once.
    #[serde(default)]
    pub registered_guests: Vec<RegisteredGuest>,
    /// Genre counters.
    #[serde(default)]
    pub genre_stats: Vec<GenreAggregate>,
    /// Document version, bumped on every persisted write.
    #[serde(default)]
    pub version: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Creates an empty event owned by `owner_id`.
    #[must_use]
    pub fn new(
        owner_id: UserId,
        dj_name: String,
        name: String,
        location: String,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EventId::new(),
            owner_id,
            dj_name,
            name,
            location,
            date,
            registered_guests: Vec::new(),
            genre_stats: Vec::new(),
            version: 0,
            created_at: Utc::now(),
        }
    }

    /// Returns `true` if `guest_id` is already in the guest list.
    #[must_use]
    pub fn is_registered(&self, guest_id: UserId) -> bool {
        self.registered_guests.iter().any(|g| g.guest_id == guest_id)
    }

    /// Returns the guest's registration, if any.
    #[must_use]
    pub fn registration(&self, guest_id: UserId) -> Option<&RegisteredGuest> {
        self.registered_guests.iter().find(|g| g.guest_id == guest_id)
    }

    /// Appends a fresh registration for `guest_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::AlreadyRegistered`] if the guest is already in
    /// the list; the list is left untouched.
    pub fn assign(&mut self, guest_id: UserId) -> Result<(), ApiError> {
        if self.is_registered(guest_id) {
            return Err(ApiError::AlreadyRegistered {
                event_id: self.id,
                guest_id,
            });
        }
        self.registered_guests.push(RegisteredGuest::new(guest_id));
        Ok(())
    }

    /// Count stored for `genre`, or 0 if the genre has no aggregate.
    #[must_use]
    pub fn genre_count(&self, genre: &str) -> u32 {
        self.genre_stats
            .iter()
            .find(|s| s.genre_name == genre)
            .map_or(0, |s| s.count)
    }

    /// Sum of all genre counters.
    #[must_use]
    pub fn aggregate_total(&self) -> u64 {
        self.genre_stats.iter().map(|s| u64::from(s.count)).sum()
    }

    /// Number of guests that have picked a genre.
    #[must_use]
    pub fn guests_with_genre(&self) -> u64 {
        self.registered_guests
            .iter()
            .filter(|g| !g.genre_choice.is_empty())
            .count() as u64
    }

    /// Returns `true` if the event's date falls in `[start, end]`.
    #[must_use]
    pub fn is_within(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.date >= start && self.date <= end
    }
}
