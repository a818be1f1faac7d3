//! User service: identity, profile, user-level genre and DJ reporting.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Gender, User, UserId, apply_genre_change};
use crate::error::ApiError;
use crate::store::Store;

/// Audience counters for a DJ's events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    /// Distinct guests registered across the DJ's events.
    pub total_users: u64,
    /// Of those, guests who picked a genre in at least one event.
    pub genre_choices: u64,
    /// Guests declaring `male`.
    pub males: u64,
    /// Guests declaring `female`.
    pub females: u64,
}

/// Per-genre breakdown of the choices made at a DJ's events.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenreStat {
    /// Genre name.
    pub name: String,
    /// Registrations that picked this genre.
    pub total_choices: u64,
    /// Of those, guests declaring `male`.
    pub choices_by_males: u64,
    /// Of those, guests declaring `female`.
    pub choices_by_females: u64,
    /// Share of all choices, in percent.
    pub percentage_distribution: f64,
}

/// Public DJ listing entry.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DjSummary {
    /// DJ id.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// E-mail address.
    pub email: String,
}

/// Validated input of a manual registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// E-mail address; normalized on storage.
    pub email: String,
    /// Optional phone number.
    pub phone_number: Option<String>,
    /// Optional gender.
    pub gender: Option<Gender>,
}

/// Orchestration layer for user-centric operations.
#[derive(Debug, Clone)]
pub struct UserService {
    store: Arc<Store>,
}

impl UserService {
    /// Creates a new `UserService`.
    #[must_use]
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Creates a guest account.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EmailTaken`] or a persistence error.
    pub async fn register(&self, new: NewUser) -> Result<User, ApiError> {
        let user = User::register(new.name, &new.email, new.phone_number, new.gender);
        let user = self.store.insert_user(user).await?;
        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Resolves an e-mail login.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] if no account uses `email`.
    pub async fn login(&self, email: &str) -> Result<User, ApiError> {
        let user = self
            .store
            .user_by_email(email)
            .await
            .ok_or_else(|| ApiError::InvalidRequest("invalid email".to_string()))?;
        tracing::info!(user_id = %user.id, "user logged in");
        Ok(user)
    }

    /// Returns the user, if it exists.
    pub async fn find(&self, id: UserId) -> Option<User> {
        self.store.user(id).await
    }

    /// Returns the user.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::UserNotFound`] if the user does not exist.
    pub async fn get(&self, id: UserId) -> Result<User, ApiError> {
        self.find(id).await.ok_or(ApiError::UserNotFound(id))
    }

    /// Stores phone and gender and marks the profile complete.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::UserNotFound`] or a persistence error.
    pub async fn update_profile(
        &self,
        id: UserId,
        phone_number: Option<String>,
        gender: Option<Gender>,
    ) -> Result<User, ApiError> {
        let (user, ()) = self
            .store
            .update_user(id, |user| {
                user.complete_profile(phone_number, gender);
                Ok(())
            })
            .await?;
        tracing::info!(user_id = %id, "profile completed");
        Ok(user)
    }

    /// Sets the user's current genre and re-applies it to every event the
    /// user is registered for, keeping those events' counters in step.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::UserNotFound`] or a persistence error. Events
    /// updated before a failure keep the new choice.
    pub async fn update_genre(
        &self,
        id: UserId,
        genre: &str,
        media_link: Option<&str>,
    ) -> Result<User, ApiError> {
        let (user, ()) = self
            .store
            .update_user(id, |user| {
                user.set_genre(genre, media_link);
                Ok(())
            })
            .await?;

        let events = self.store.events_where(|e| e.is_registered(id)).await;
        for event in &events {
            self.store
                .update_event(event.id, |e| {
                    Ok(apply_genre_change(e, id, genre, media_link))
                })
                .await?;
        }

        tracing::info!(user_id = %id, genre, events = events.len(), "user genre updated");
        Ok(user)
    }

    /// Audience counters over the distinct guests of `dj`'s events.
    pub async fn stats(&self, dj: &User) -> UserStats {
        let mut has_genre: BTreeMap<UserId, bool> = BTreeMap::new();
        for event in self.store.events_where(|e| e.owner_id == dj.id).await {
            for guest in &event.registered_guests {
                let entry = has_genre.entry(guest.guest_id).or_insert(false);
                *entry |= !guest.genre_choice.trim().is_empty();
            }
        }

        let mut stats = UserStats {
            total_users: has_genre.len() as u64,
            genre_choices: has_genre.values().filter(|chose| **chose).count() as u64,
            ..UserStats::default()
        };
        for guest_id in has_genre.keys() {
            match self.store.user(*guest_id).await.and_then(|u| u.gender) {
                Some(Gender::Male) => stats.males += 1,
                Some(Gender::Female) => stats.females += 1,
                _ => {}
            }
        }
        stats
    }

    /// Genre breakdown over every registration with a genre at `dj`'s
    /// events, most popular first. A guest at two events counts once per
    /// event.
    pub async fn genre_stats(&self, dj: &User) -> Vec<GenreStat> {
        let mut genders: HashMap<UserId, Option<Gender>> = HashMap::new();
        let mut by_genre: BTreeMap<String, GenreStat> = BTreeMap::new();
        let mut total = 0_u64;

        for event in self.store.events_where(|e| e.owner_id == dj.id).await {
            for guest in &event.registered_guests {
                let genre = guest.genre_choice.trim();
                if genre.is_empty() {
                    continue;
                }
                let gender = match genders.get(&guest.guest_id) {
                    Some(gender) => *gender,
                    None => {
                        let gender = self.store.user(guest.guest_id).await.and_then(|u| u.gender);
                        genders.insert(guest.guest_id, gender);
                        gender
                    }
                };
                let stat = by_genre.entry(genre.to_string()).or_insert_with(|| GenreStat {
                    name: genre.to_string(),
                    total_choices: 0,
                    choices_by_males: 0,
                    choices_by_females: 0,
                    percentage_distribution: 0.0,
                });
                stat.total_choices += 1;
                match gender {
                    Some(Gender::Male) => stat.choices_by_males += 1,
                    Some(Gender::Female) => stat.choices_by_females += 1,
                    _ => {}
                }
                total += 1;
            }
        }

        let mut stats: Vec<GenreStat> = by_genre.into_values().collect();
        for stat in &mut stats {
            stat.percentage_distribution = stat.total_choices as f64 * 100.0 / total as f64;
        }
        stats.sort_by(|a, b| {
            b.total_choices
                .cmp(&a.total_choices)
                .then_with(|| a.name.cmp(&b.name))
        });
        stats
    }

    /// CSV export of the distinct guests of `dj`'s events: a header row
    /// then one fully quoted row per guest still on record.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if the CSV writer fails.
    pub async fn export_csv(&self, dj: &User) -> Result<String, ApiError> {
        let mut seen = HashSet::new();
        let mut guest_ids = Vec::new();
        for event in self.store.events_where(|e| e.owner_id == dj.id).await {
            for guest in event.registered_guests {
                if seen.insert(guest.guest_id) {
                    guest_ids.push(guest.guest_id);
                }
            }
        }

        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .from_writer(Vec::new());
        writer
            .write_record(["Name", "Email", "Phone Number", "Gender"])
            .map_err(csv_error)?;
        for id in guest_ids {
            let Some(user) = self.store.user(id).await else {
                continue;
            };
            let gender = user.gender.map(|g| g.to_string()).unwrap_or_default();
            writer
                .write_record([
                    user.name.as_str(),
                    user.email.as_str(),
                    user.phone_number.as_deref().unwrap_or_default(),
                    gender.as_str(),
                ])
                .map_err(csv_error)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ApiError::Internal(format!("csv flush failed: {e}")))?;
        String::from_utf8(bytes).map_err(|e| ApiError::Internal(format!("csv encoding: {e}")))
    }

    /// Returns the DJ's display name.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::DjNotFound`] if `id` is unknown or not a DJ.
    pub async fn dj_info(&self, id: UserId) -> Result<String, ApiError> {
        self.find(id)
            .await
            .filter(User::is_dj)
            .map(|dj| dj.name)
            .ok_or(ApiError::DjNotFound(id))
    }

    /// Lists every DJ, ordered by name.
    pub async fn list_djs(&self) -> Vec<DjSummary> {
        let mut djs: Vec<DjSummary> = self
            .store
            .users_where(User::is_dj)
            .await
            .into_iter()
            .map(|u| DjSummary {
                id: u.id,
                name: u.name,
                email: u.email,
            })
            .collect();
        djs.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        djs
    }

    /// Returns the user's QR payload, generating and storing it on first
    /// request.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::UserNotFound`] or a persistence error.
    pub async fn qr_payload(&self, id: UserId) -> Result<String, ApiError> {
        let user = self.get(id).await?;
        if let Some(payload) = user.qr_payload {
            return Ok(payload);
        }
        let (_, payload) = self
            .store
            .update_user(id, |user| Ok(user.ensure_qr_payload().to_string()))
            .await?;
        Ok(payload)
    }
}

fn csv_error(e: csv::Error) -> ApiError {
    ApiError::Internal(format!("csv write failed: {e}"))
}
