//! Document store: in-memory registries with optional PostgreSQL
//! write-through.
//!
//! Every mutation follows the same pattern: acquire the document's write
//! lock, mutate a clone, persist the clone, then commit it in memory. A
//! failed write leaves the in-memory document untouched.
//!
//! With persistence on, event reads go to the database so that every
//! instance sees the others' writes. The event registry then only
//! serializes local writers and supplies the base version for the
//! compare-and-swap; a lost swap reloads the stored row.

pub mod registry;

use std::collections::HashMap;

use tokio::sync::RwLock;

pub use registry::{Document, DocumentLock, DocumentRegistry};

use crate::domain::user::normalize_email;
use crate::domain::{ActivationSerial, Event, EventId, User, UserId};
use crate::error::ApiError;
use crate::persistence::PostgresPersistence;

/// Identity, event and serial documents behind one handle.
#[derive(Debug)]
pub struct Store {
    users: DocumentRegistry<User>,
    email_index: RwLock<HashMap<String, UserId>>,
    events: DocumentRegistry<Event>,
    serials: DocumentRegistry<ActivationSerial>,
    persistence: Option<PostgresPersistence>,
}

impl Store {
    /// Creates an empty store, writing through to `persistence` if given.
    #[must_use]
    pub fn new(persistence: Option<PostgresPersistence>) -> Self {
        Self {
            users: DocumentRegistry::new(),
            email_index: RwLock::new(HashMap::new()),
            events: DocumentRegistry::new(),
            serials: DocumentRegistry::new(),
            persistence,
        }
    }

    /// Creates an empty memory-only store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Fills the registries from the database. No-op for a memory-only
    /// store.
    ///
    /// # Errors
    ///
    /// Returns a [`ApiError::PersistenceError`] if loading fails.
    pub async fn load(&self) -> Result<(), ApiError> {
        let Some(db) = &self.persistence else {
            return Ok(());
        };

        let users = db.load_users().await?;
        let events = db.load_events().await?;
        let serials = db.load_serials().await?;
        let (user_count, event_count, serial_count) = (users.len(), events.len(), serials.len());

        {
            let mut index = self.email_index.write().await;
            for user in users {
                index.insert(user.email.clone(), user.id);
                self.users.put(user).await;
            }
        }
        for event in events {
            self.events.put(event).await;
        }
        for serial in serials {
            self.serials.put(serial).await;
        }

        tracing::info!(
            users = user_count,
            events = event_count,
            serials = serial_count,
            "documents loaded"
        );
        Ok(())
    }

    // ── Users ───────────────────────────────────────────────────────────

    /// Stores a new user.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EmailTaken`] if the e-mail address is in use, or
    /// a persistence error.
    pub async fn insert_user(&self, user: User) -> Result<User, ApiError> {
        let mut index = self.email_index.write().await;
        if index.contains_key(&user.email) {
            return Err(ApiError::EmailTaken(user.email));
        }
        if let Some(db) = &self.persistence {
            db.save_user(&user).await?;
        }
        index.insert(user.email.clone(), user.id);
        self.users.insert(user.clone()).await?;
        Ok(user)
    }

    /// Returns a snapshot of the user.
    pub async fn user(&self, id: UserId) -> Option<User> {
        self.users.get(&id).await
    }

    /// Looks a user up by e-mail (case-insensitive).
    pub async fn user_by_email(&self, email: &str) -> Option<User> {
        let id = self
            .email_index
            .read()
            .await
            .get(&normalize_email(email))
            .copied()?;
        self.user(id).await
    }

    /// Returns snapshots of all users matching `predicate`.
    pub async fn users_where<F>(&self, predicate: F) -> Vec<User>
    where
        F: FnMut(&User) -> bool,
    {
        self.users.filter(predicate).await
    }

    /// Applies `mutate` to the user under its write lock and persists the
    /// result.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::UserNotFound`], any error raised by `mutate`,
    /// or a persistence error. On error the stored user is unchanged.
    pub async fn update_user<F, T>(&self, id: UserId, mutate: F) -> Result<(User, T), ApiError>
    where
        F: FnOnce(&mut User) -> Result<T, ApiError>,
    {
        let entry = self
            .users
            .lock(&id)
            .await
            .ok_or(ApiError::UserNotFound(id))?;
        let mut guard = entry.write().await;

        let mut next = guard.clone();
        let output = mutate(&mut next)?;
        if let Some(db) = &self.persistence {
            db.save_user(&next).await?;
        }
        *guard = next.clone();
        Ok((next, output))
    }

    // ── Events ──────────────────────────────────────────────────────────

    /// Stores a new event at version 1.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the write fails.
    pub async fn insert_event(&self, mut event: Event) -> Result<Event, ApiError> {
        event.version = 1;
        if let Some(db) = &self.persistence {
            db.insert_event(&event).await?;
        }
        self.events.insert(event.clone()).await?;
        Ok(event)
    }

    /// Returns a snapshot of the event, read from the database when
    /// persistence is on.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EventNotFound`] if the event does not exist, or
    /// a persistence error.
    pub async fn event(&self, id: EventId) -> Result<Event, ApiError> {
        let found = match &self.persistence {
            Some(db) => db.load_event(id).await?,
            None => self.events.get(&id).await,
        };
        found.ok_or(ApiError::EventNotFound(id))
    }

    /// Returns snapshots of all events matching `predicate`, read from the
    /// database when persistence is on. A failed read falls back to the
    /// local registry.
    pub async fn events_where<F>(&self, mut predicate: F) -> Vec<Event>
    where
        F: FnMut(&Event) -> bool,
    {
        if let Some(db) = &self.persistence {
            match db.load_events().await {
                Ok(events) => return events.into_iter().filter(|e| predicate(e)).collect(),
                Err(e) => tracing::warn!(error = %e, "event read failed, serving local registry"),
            }
        }
        self.events.filter(predicate).await
    }

    /// Applies `mutate` to the event under its write lock, bumps the
    /// version and persists with a compare-and-swap on the old version.
    ///
    /// Writes to one event are serialized in-process by the lock; the
    /// version check catches writers in other processes. After a lost
    /// swap the stored row replaces the local copy, so a retry starts
    /// from the current version.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EventNotFound`] (also when the event was
    /// deleted while this call waited for the lock), any error raised by
    /// `mutate`, [`ApiError::VersionConflict`], or a persistence error.
    /// On error the stored event is unchanged.
    pub async fn update_event<F, T>(&self, id: EventId, mutate: F) -> Result<(Event, T), ApiError>
    where
        F: FnOnce(&mut Event) -> Result<T, ApiError>,
    {
        let entry = self.event_entry(id).await?;
        let mut guard = entry.write().await;
        if !self.events.is_current(&id, &entry).await {
            return Err(ApiError::EventNotFound(id));
        }

        let mut next = guard.clone();
        let output = mutate(&mut next)?;
        next.version = guard.version.saturating_add(1);
        if let Some(db) = &self.persistence {
            match db.update_event(&next, guard.version).await {
                Ok(()) => {}
                Err(ApiError::VersionConflict(_)) => {
                    let stored = db.load_event(id).await?;
                    let err = resync_after_conflict(&mut guard, stored);
                    if matches!(err, ApiError::EventNotFound(_)) {
                        self.events.remove_entry(&id, &entry).await;
                    }
                    tracing::warn!(event_id = %id, error = %err, "event write lost a version race");
                    return Err(err);
                }
                Err(e) => return Err(e),
            }
        }
        *guard = next.clone();
        Ok((next, output))
    }

    /// Deletes an event.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EventNotFound`] or a persistence error.
    pub async fn delete_event(&self, id: EventId) -> Result<(), ApiError> {
        let entry = self.event_entry(id).await?;
        let _guard = entry.write().await;
        if !self.events.is_current(&id, &entry).await {
            return Err(ApiError::EventNotFound(id));
        }
        if let Some(db) = &self.persistence {
            db.delete_event(id).await?;
        }
        self.events.remove_entry(&id, &entry).await;
        Ok(())
    }

    /// Lock handle for the event, pulling it from the database if another
    /// instance created it.
    async fn event_entry(&self, id: EventId) -> Result<DocumentLock<Event>, ApiError> {
        if let Some(entry) = self.events.lock(&id).await {
            return Ok(entry);
        }
        if let Some(db) = &self.persistence
            && let Some(event) = db.load_event(id).await?
        {
            self.events.insert_if_absent(event).await;
        }
        self.events.lock(&id).await.ok_or(ApiError::EventNotFound(id))
    }

    // ── Activation serials ──────────────────────────────────────────────

    /// Seeds serials that are not yet known. Returns how many were added.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if a write fails.
    pub async fn seed_serials(&self, codes: &[String]) -> Result<usize, ApiError> {
        let mut added = 0;
        for code in codes {
            if self.serials.get(code).await.is_some() {
                continue;
            }
            let serial = ActivationSerial::new(code.clone());
            let inserted = match &self.persistence {
                Some(db) => db.insert_serial_if_absent(&serial).await?,
                None => true,
            };
            if inserted {
                self.serials.insert(serial).await?;
                added += 1;
            }
        }
        Ok(added)
    }

    /// Returns a snapshot of the serial with this code.
    pub async fn serial(&self, code: &str) -> Option<ActivationSerial> {
        self.serials.get(&code.to_string()).await
    }

    /// Consumes an unused serial for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::SerialUnavailable`] if the code is unknown or
    /// already consumed (here or by another instance), or a persistence
    /// error.
    pub async fn activate_serial(
        &self,
        code: &str,
        user_id: UserId,
    ) -> Result<ActivationSerial, ApiError> {
        let entry = self
            .serials
            .lock(&code.to_string())
            .await
            .ok_or(ApiError::SerialUnavailable)?;
        let mut guard = entry.write().await;

        let mut next = guard.clone();
        next.activate(user_id)?;
        if let Some(db) = &self.persistence
            && !db.activate_serial(code, user_id).await?
        {
            // Consumed elsewhere; mirror that locally.
            guard.active = true;
            return Err(ApiError::SerialUnavailable);
        }
        *guard = next.clone();
        Ok(next)
    }
}

/// Replaces the local copy with the stored row after a lost
/// compare-and-swap and returns the error to report: a conflict when the
/// row still exists, not-found when it was deleted.
fn resync_after_conflict(cached: &mut Event, stored: Option<Event>) -> ApiError {
    match stored {
        Some(stored) => {
            let id = stored.id;
            *cached = stored;
            ApiError::VersionConflict(id)
        }
        None => ApiError::EventNotFound(cached.id),
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::apply_genre_change;

    fn guest(name: &str) -> User {
        User::register(name.to_string(), &format!("{name}@example.com"), None, None)
    }

    async fn stored_event(store: &Store) -> Event {
        let dj = guest("dj");
        let owner = dj.id;
        let _ = store.insert_user(dj).await;
        let event = Event::new(
            owner,
            "DJ".to_string(),
            "Night".to_string(),
            "Club".to_string(),
            Utc::now(),
        );
        let Ok(event) = store.insert_event(event).await else {
            panic!("insert failed");
        };
        event
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let store = Store::in_memory();
        assert!(store.insert_user(guest("ada")).await.is_ok());

        let dup = User::register("Other".to_string(), "ADA@example.com", None, None);
        let result = store.insert_user(dup).await;
        assert!(matches!(result, Err(ApiError::EmailTaken(_))));
        assert!(store.user_by_email("Ada@Example.com").await.is_some());
    }

    #[tokio::test]
    async fn update_event_bumps_version() {
        let store = Store::in_memory();
        let event = stored_event(&store).await;
        assert_eq!(event.version, 1);

        let guest_id = UserId::new();
        let Ok((updated, ())) = store.update_event(event.id, |e| e.assign(guest_id)).await else {
            panic!("update failed");
        };
        assert_eq!(updated.version, 2);
        assert!(updated.is_registered(guest_id));
    }

    #[tokio::test]
    async fn failed_mutation_leaves_event_untouched() {
        let store = Store::in_memory();
        let event = stored_event(&store).await;
        let guest_id = UserId::new();
        let _ = store.update_event(event.id, |e| e.assign(guest_id)).await;

        let second = store.update_event(event.id, |e| e.assign(guest_id)).await;
        assert!(matches!(second, Err(ApiError::AlreadyRegistered { .. })));

        let Ok(current) = store.event(event.id).await else {
            panic!("event missing");
        };
        assert_eq!(current.version, 2);
        assert_eq!(current.registered_guests.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_genre_selections_lose_no_updates() {
        let store = std::sync::Arc::new(Store::in_memory());
        let event = stored_event(&store).await;

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = std::sync::Arc::clone(&store);
            let event_id = event.id;
            handles.push(tokio::spawn(async move {
                let genre = if i % 2 == 0 { "Techno" } else { "House" };
                store
                    .update_event(event_id, |e| {
                        Ok(apply_genre_change(e, UserId::new(), genre, None))
                    })
                    .await
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }

        let Ok(current) = store.event(event.id).await else {
            panic!("event missing");
        };
        assert_eq!(current.registered_guests.len(), 32);
        assert_eq!(current.aggregate_total(), 32);
        assert_eq!(current.genre_count("Techno"), 16);
        assert_eq!(current.version, 33);
    }

    #[tokio::test]
    async fn serial_activates_once() {
        let store = Store::in_memory();
        let Ok(added) = store.seed_serials(&["CODE-1".to_string()]).await else {
            panic!("seeding failed");
        };
        assert_eq!(added, 1);

        let user = UserId::new();
        assert!(store.activate_serial("CODE-1", user).await.is_ok());
        let again = store.activate_serial("CODE-1", UserId::new()).await;
        assert!(matches!(again, Err(ApiError::SerialUnavailable)));

        let Some(serial) = store.serial("CODE-1").await else {
            panic!("serial missing");
        };
        assert!(serial.active);
        assert_eq!(serial.dj_id, Some(user));
    }

    #[tokio::test]
    async fn unknown_serial_is_unavailable() {
        let store = Store::in_memory();
        let result = store.activate_serial("NOPE", UserId::new()).await;
        assert!(matches!(result, Err(ApiError::SerialUnavailable)));
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = Store::in_memory();
        let codes = vec!["A".to_string(), "B".to_string()];
        let _ = store.seed_serials(&codes).await;
        let Ok(added) = store.seed_serials(&codes).await else {
            panic!("seeding failed");
        };
        assert_eq!(added, 0);
    }

    #[tokio::test]
    async fn update_queued_behind_delete_reports_not_found() {
        let store = std::sync::Arc::new(Store::in_memory());
        let event = stored_event(&store).await;
        let Some(entry) = store.events.lock(&event.id).await else {
            panic!("event missing");
        };
        let held = entry.write().await;

        let deleter = {
            let store = std::sync::Arc::clone(&store);
            tokio::spawn(async move { store.delete_event(event.id).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let updater = {
            let store = std::sync::Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .update_event(event.id, |e| {
                        e.name = "Renamed".to_string();
                        Ok(())
                    })
                    .await
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        drop(held);

        let (Ok(deleted), Ok(updated)) = (deleter.await, updater.await) else {
            panic!("task panicked");
        };
        assert!(deleted.is_ok());
        assert!(matches!(updated, Err(ApiError::EventNotFound(_))));
        assert!(matches!(
            store.event(event.id).await,
            Err(ApiError::EventNotFound(_))
        ));
        assert!(store.events_where(|_| true).await.is_empty());
    }

    #[test]
    fn lost_swap_adopts_the_stored_version() {
        let owner = UserId::new();
        let mut cached = Event::new(
            owner,
            "DJ".to_string(),
            "Night".to_string(),
            "Club".to_string(),
            Utc::now(),
        );
        cached.version = 1;
        let mut stored = cached.clone();
        stored.version = 2;
        stored.name = "Renamed elsewhere".to_string();

        let err = resync_after_conflict(&mut cached, Some(stored));
        assert!(matches!(err, ApiError::VersionConflict(_)));
        assert_eq!(cached.version, 2);
        assert_eq!(cached.name, "Renamed elsewhere");

        let err = resync_after_conflict(&mut cached, None);
        assert!(matches!(err, ApiError::EventNotFound(_)));
    }

    #[tokio::test]
    async fn delete_event_removes_it() {
        let store = Store::in_memory();
        let event = stored_event(&store).await;
        assert!(store.delete_event(event.id).await.is_ok());
        assert!(matches!(
            store.event(event.id).await,
            Err(ApiError::EventNotFound(_))
        ));
    }
}
