//! Event service: event lifecycle, guest registration and genre selection.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::calendar::day_bounds;
use crate::domain::{
    Event, EventId, GenreAggregate, GenreChange, User, UserId, apply_genre_change,
};
use crate::error::ApiError;
use crate::store::Store;

/// Display name used for guests whose user record no longer exists.
pub const UNKNOWN_USER: &str = "Unknown User";

/// Fields supplied when a DJ creates an event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    /// Display name; defaults to the DJ's own name.
    pub dj_name: Option<String>,
    /// Event title.
    pub name: String,
    /// Venue.
    pub location: String,
    /// Scheduled start.
    pub date: DateTime<Utc>,
}

/// Partial update of an event. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    /// New display name.
    pub dj_name: Option<String>,
    /// New title.
    pub name: Option<String>,
    /// New venue.
    pub location: Option<String>,
    /// New start.
    pub date: Option<DateTime<Utc>>,
}

/// A guest row in an [`EventView`], with the name joined in.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GuestView {
    /// Guest id.
    pub guest_id: UserId,
    /// Guest name, or `"Unknown User"`.
    pub user_name: String,
    /// Genre picked for this event (may be empty).
    pub genre_choice: String,
    /// Media link attached to the choice (may be empty).
    pub media_link: String,
}

/// Denormalized event read model served by the live, history and mine
/// views.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    /// Event id.
    pub id: EventId,
    /// Event title.
    pub name: String,
    /// Venue.
    pub location: String,
    /// Scheduled start.
    pub date: DateTime<Utc>,
    /// Owning DJ.
    pub dj_id: UserId,
    /// DJ display name.
    pub dj_name: String,
    /// QR payload of the owning DJ, if the DJ still exists.
    pub dj_qr_code: Option<String>,
    /// Registered guests.
    pub registered_guests: Vec<GuestView>,
    /// Genre counters.
    pub genre_stats: Vec<GenreAggregate>,
}

/// Orchestration layer for event operations.
///
/// Every mutation goes through [`Store::update_event`], so the whole
/// read-modify-write of one event runs under that event's write lock.
#[derive(Debug, Clone)]
pub struct EventService {
    store: Arc<Store>,
    utc_offset: FixedOffset,
    client_url: String,
}

impl EventService {
    /// Creates a new `EventService`. `utc_offset` defines the calendar
    /// day for the live and history views; `client_url` is the base of QR
    /// registration links.
    #[must_use]
    pub fn new(store: Arc<Store>, utc_offset: FixedOffset, client_url: String) -> Self {
        Self {
            store,
            utc_offset,
            client_url,
        }
    }

    /// Returns a reference to the underlying [`Store`].
    #[must_use]
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Creates an event owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Forbidden`] if `owner` is not a DJ, or a
    /// persistence error.
    pub async fn create_event(&self, owner: &User, new: NewEvent) -> Result<Event, ApiError> {
        if !owner.is_dj() {
            return Err(ApiError::dj_only());
        }
        let dj_name = new
            .dj_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| owner.name.clone());
        let event = Event::new(owner.id, dj_name, new.name, new.location, new.date);
        let event = self.store.insert_event(event).await?;

        tracing::info!(event_id = %event.id, owner_id = %owner.id, "event created");
        Ok(event)
    }

    /// Applies `patch` to an event owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EventNotFound`], [`ApiError::Forbidden`] if
    /// `owner` does not own the event, or a persistence error.
    pub async fn update_event(
        &self,
        owner: &User,
        event_id: EventId,
        patch: EventPatch,
    ) -> Result<Event, ApiError> {
        let (event, ()) = self
            .store
            .update_event(event_id, |event| {
                ensure_owner(event, owner)?;
                if let Some(dj_name) = patch.dj_name {
                    event.dj_name = dj_name;
                }
                if let Some(name) = patch.name {
                    event.name = name;
                }
                if let Some(location) = patch.location {
                    event.location = location;
                }
                if let Some(date) = patch.date {
                    event.date = date;
                }
                Ok(())
            })
            .await?;

        tracing::info!(%event_id, version = event.version, "event updated");
        Ok(event)
    }

    /// Deletes an event owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EventNotFound`], [`ApiError::Forbidden`] if
    /// `owner` does not own the event, or a persistence error.
    pub async fn delete_event(&self, owner: &User, event_id: EventId) -> Result<(), ApiError> {
        let event = self.store.event(event_id).await?;
        ensure_owner(&event, owner)?;
        self.store.delete_event(event_id).await?;

        tracing::info!(%event_id, "event deleted");
        Ok(())
    }

    /// Returns a single event.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EventNotFound`] if the event does not exist.
    pub async fn get_event(&self, event_id: EventId) -> Result<Event, ApiError> {
        self.store.event(event_id).await
    }

    /// Returns every event, ascending by date.
    pub async fn list_events(&self) -> Vec<Event> {
        let mut events = self.store.events_where(|_| true).await;
        sort_ascending(&mut events);
        events
    }

    /// Returns every event owned by `owner_id`, ascending by date. An
    /// unknown owner simply has no events.
    pub async fn events_by_owner(&self, owner_id: UserId) -> Vec<Event> {
        let mut events = self.store.events_where(|e| e.owner_id == owner_id).await;
        sort_ascending(&mut events);
        events
    }

    /// Returns the name of the DJ owning the event.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EventNotFound`], or [`ApiError::DjNotFound`] if
    /// the owner's user record is gone.
    pub async fn event_dj_name(&self, event_id: EventId) -> Result<String, ApiError> {
        let event = self.store.event(event_id).await?;
        self.store
            .user(event.owner_id)
            .await
            .map(|dj| dj.name)
            .ok_or(ApiError::DjNotFound(event.owner_id))
    }

    /// Returns the registration URL encoded in the event's QR code.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EventNotFound`] if the event does not exist.
    pub async fn qr_payload(&self, event_id: EventId) -> Result<String, ApiError> {
        let event = self.store.event(event_id).await?;
        Ok(format!(
            "{}/register?eventId={}&djId={}",
            self.client_url, event.id, event.owner_id
        ))
    }

    /// Registers `guest_id` for the event with no genre yet.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::UserNotFound`], [`ApiError::EventNotFound`],
    /// [`ApiError::AlreadyRegistered`] (the guest list is unchanged), or
    /// a persistence error.
    pub async fn assign(&self, event_id: EventId, guest_id: UserId) -> Result<Event, ApiError> {
        if self.store.user(guest_id).await.is_none() {
            return Err(ApiError::UserNotFound(guest_id));
        }
        let (event, ()) = self
            .store
            .update_event(event_id, |event| event.assign(guest_id))
            .await?;

        tracing::info!(%event_id, %guest_id, "guest assigned");
        Ok(event)
    }

    /// Changes the genre of a guest already registered for the event.
    ///
    /// `caller` must be the guest or the event's owner.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EventNotFound`],
    /// [`ApiError::GuestNotRegistered`], [`ApiError::Forbidden`], or a
    /// persistence error.
    pub async fn update_guest_genre(
        &self,
        caller: &User,
        event_id: EventId,
        guest_id: UserId,
        genre: &str,
        media_link: Option<&str>,
    ) -> Result<Event, ApiError> {
        let (event, change) = self
            .store
            .update_event(event_id, |event| {
                if !event.is_registered(guest_id) {
                    return Err(ApiError::GuestNotRegistered { event_id, guest_id });
                }
                if caller.id != guest_id && caller.id != event.owner_id {
                    return Err(ApiError::Forbidden(
                        "only the guest or the event owner may change this choice".to_string(),
                    ));
                }
                Ok(apply_genre_change(event, guest_id, genre, media_link))
            })
            .await?;

        log_genre_change(event_id, guest_id, genre, &change);
        self.sync_user_genre(guest_id, genre, media_link).await;
        Ok(event)
    }

    /// Records the caller's own genre for the event, registering them
    /// first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EventNotFound`] or a persistence error.
    pub async fn select_genre(
        &self,
        caller: &User,
        event_id: EventId,
        genre: &str,
        media_link: Option<&str>,
    ) -> Result<Event, ApiError> {
        let guest_id = caller.id;
        let (event, change) = self
            .store
            .update_event(event_id, |event| {
                Ok(apply_genre_change(event, guest_id, genre, media_link))
            })
            .await?;

        log_genre_change(event_id, guest_id, genre, &change);
        self.sync_user_genre(guest_id, genre, media_link).await;
        Ok(event)
    }

    /// Joins `guest` to the DJ's first event today. The guest's cached
    /// genre, if any, is counted immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::DjNotFound`] if `dj_id` is not a DJ,
    /// [`ApiError::NoLiveEvent`] if the DJ has nothing today,
    /// [`ApiError::AlreadyRegistered`], or a persistence error.
    pub async fn join_live_event(
        &self,
        guest: &User,
        dj_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Event, ApiError> {
        let dj = self
            .store
            .user(dj_id)
            .await
            .filter(User::is_dj)
            .ok_or(ApiError::DjNotFound(dj_id))?;

        let (start, end) = day_bounds(now, self.utc_offset);
        let mut today = self
            .store
            .events_where(|e| e.owner_id == dj.id && e.is_within(start, end))
            .await;
        sort_ascending(&mut today);
        let target = today.first().ok_or(ApiError::NoLiveEvent(dj.id))?.id;

        let guest_id = guest.id;
        let (event, ()) = self
            .store
            .update_event(target, |event| {
                event.assign(guest_id)?;
                if !guest.genre_choice.is_empty() {
                    apply_genre_change(
                        event,
                        guest_id,
                        &guest.genre_choice,
                        Some(guest.media_link.as_str()),
                    );
                }
                Ok(())
            })
            .await?;

        let genre = guest.genre_choice.clone();
        if let Err(e) = self
            .store
            .update_user(guest_id, |user| {
                user.record_event_preference(event.id, genre);
                Ok(())
            })
            .await
        {
            tracing::warn!(%guest_id, event_id = %event.id, error = %e, "event preference not recorded");
        }

        tracing::info!(event_id = %event.id, %guest_id, dj_id = %dj.id, "guest joined via QR");
        Ok(event)
    }

    /// Events happening today. DJs see only their own; everyone else
    /// sees all. Ascending by date.
    pub async fn live_events(&self, viewer: &User, now: DateTime<Utc>) -> Vec<EventView> {
        let (start, end) = day_bounds(now, self.utc_offset);
        let scope = viewer.is_dj().then_some(viewer.id);
        let mut events = self
            .store
            .events_where(|e| e.is_within(start, end) && scope.is_none_or(|id| e.owner_id == id))
            .await;
        sort_ascending(&mut events);
        self.views(events).await
    }

    /// The DJ's events dated before today. Descending by date.
    pub async fn history_events(&self, dj: &User, now: DateTime<Utc>) -> Vec<EventView> {
        let (start, _) = day_bounds(now, self.utc_offset);
        let mut events = self
            .store
            .events_where(|e| e.owner_id == dj.id && e.date < start)
            .await;
        sort_ascending(&mut events);
        events.reverse();
        self.views(events).await
    }

    /// All of the DJ's events, ascending by date.
    pub async fn my_events(&self, dj: &User) -> Vec<EventView> {
        let mut events = self.store.events_where(|e| e.owner_id == dj.id).await;
        sort_ascending(&mut events);
        self.views(events).await
    }

    /// Joins guest and DJ records into the read model.
    async fn views(&self, events: Vec<Event>) -> Vec<EventView> {
        let mut users: HashMap<UserId, Option<User>> = HashMap::new();
        for event in &events {
            let ids = std::iter::once(event.owner_id)
                .chain(event.registered_guests.iter().map(|g| g.guest_id));
            for id in ids {
                if !users.contains_key(&id) {
                    let user = self.store.user(id).await;
                    users.insert(id, user);
                }
            }
        }
        let lookup = |id: &UserId| users.get(id).and_then(Option::as_ref);

        events
            .into_iter()
            .map(|event| EventView {
                id: event.id,
                name: event.name,
                location: event.location,
                date: event.date,
                dj_id: event.owner_id,
                dj_name: event.dj_name,
                dj_qr_code: lookup(&event.owner_id).and_then(|dj| dj.qr_payload.clone()),
                registered_guests: event
                    .registered_guests
                    .into_iter()
                    .map(|g| GuestView {
                        user_name: lookup(&g.guest_id)
                            .map_or_else(|| UNKNOWN_USER.to_string(), |u| u.name.clone()),
                        guest_id: g.guest_id,
                        genre_choice: g.genre_choice,
                        media_link: g.media_link,
                    })
                    .collect(),
                genre_stats: event.genre_stats,
            })
            .collect()
    }

    /// Mirrors a genre choice onto the user record. Failures are logged
    /// and swallowed; the event write already succeeded.
    async fn sync_user_genre(&self, user_id: UserId, genre: &str, media_link: Option<&str>) {
        let result = self
            .store
            .update_user(user_id, |user| {
                user.set_genre(genre, media_link);
                Ok(())
            })
            .await;
        if let Err(e) = result {
            tracing::warn!(%user_id, error = %e, "user genre sync failed");
        }
    }
}

fn ensure_owner(event: &Event, user: &User) -> Result<(), ApiError> {
    if !user.is_dj() || event.owner_id != user.id {
        return Err(ApiError::Forbidden(
            "only the owning DJ may modify this event".to_string(),
        ));
    }
    Ok(())
}

fn sort_ascending(events: &mut [Event]) {
    events.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
}

fn log_genre_change(event_id: EventId, guest_id: UserId, genre: &str, change: &GenreChange) {
    tracing::info!(
        %event_id,
        %guest_id,
        genre,
        previous = %change.previous_genre,
        aggregate_changed = change.aggregate_changed,
        auto_assigned = change.auto_assigned,
        "genre selected"
    );
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{Offset, TimeDelta};

    use super::*;

    struct Fixture {
        service: EventService,
        dj: User,
        guest: User,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(Store::in_memory());
        let mut dj = User::register("Dj Ada".to_string(), "ada@example.com", None, None);
        dj.promote_to_dj();
        let guest = User::register("Grace".to_string(), "grace@example.com", None, None);
        let Ok(dj) = store.insert_user(dj).await else {
            panic!("insert dj");
        };
        let Ok(guest) = store.insert_user(guest).await else {
            panic!("insert guest");
        };
        let service = EventService::new(store, Utc.fix(), "http://client".to_string());
        Fixture { service, dj, guest }
    }

    async fn event_at(fx: &Fixture, date: DateTime<Utc>) -> Event {
        let new = NewEvent {
            dj_name: None,
            name: "Night".to_string(),
            location: "Club".to_string(),
            date,
        };
        let Ok(event) = fx.service.create_event(&fx.dj, new).await else {
            panic!("create failed");
        };
        event
    }

    #[tokio::test]
    async fn guest_cannot_create_event() {
        let fx = fixture().await;
        let new = NewEvent {
            dj_name: None,
            name: "Night".to_string(),
            location: "Club".to_string(),
            date: Utc::now(),
        };
        let result = fx.service.create_event(&fx.guest, new).await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));
        assert!(fx.service.list_events().await.is_empty());
    }

    #[tokio::test]
    async fn dj_name_defaults_to_owner_name() {
        let fx = fixture().await;
        let event = event_at(&fx, Utc::now()).await;
        assert_eq!(event.dj_name, "Dj Ada");
        assert_eq!(event.version, 1);
    }

    #[tokio::test]
    async fn non_owner_cannot_update_or_delete() {
        let fx = fixture().await;
        let event = event_at(&fx, Utc::now()).await;
        let patch = EventPatch {
            name: Some("Hijacked".to_string()),
            ..EventPatch::default()
        };
        let update = fx.service.update_event(&fx.guest, event.id, patch).await;
        assert!(matches!(update, Err(ApiError::Forbidden(_))));
        let delete = fx.service.delete_event(&fx.guest, event.id).await;
        assert!(matches!(delete, Err(ApiError::Forbidden(_))));

        let Ok(current) = fx.service.get_event(event.id).await else {
            panic!("event missing");
        };
        assert_eq!(current.name, "Night");
    }

    #[tokio::test]
    async fn owner_patch_touches_only_given_fields() {
        let fx = fixture().await;
        let event = event_at(&fx, Utc::now()).await;
        let patch = EventPatch {
            location: Some("Warehouse".to_string()),
            ..EventPatch::default()
        };
        let Ok(updated) = fx.service.update_event(&fx.dj, event.id, patch).await else {
            panic!("update failed");
        };
        assert_eq!(updated.location, "Warehouse");
        assert_eq!(updated.name, "Night");
        assert_eq!(updated.version, 2);
    }

    #[tokio::test]
    async fn duplicate_assign_conflicts() {
        let fx = fixture().await;
        let event = event_at(&fx, Utc::now()).await;
        assert!(fx.service.assign(event.id, fx.guest.id).await.is_ok());

        let again = fx.service.assign(event.id, fx.guest.id).await;
        assert!(matches!(again, Err(ApiError::AlreadyRegistered { .. })));
        let Ok(current) = fx.service.get_event(event.id).await else {
            panic!("event missing");
        };
        assert_eq!(current.registered_guests.len(), 1);
    }

    #[tokio::test]
    async fn assign_unknown_user_is_not_found() {
        let fx = fixture().await;
        let event = event_at(&fx, Utc::now()).await;
        let result = fx.service.assign(event.id, UserId::new()).await;
        assert!(matches!(result, Err(ApiError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn genre_update_requires_registration() {
        let fx = fixture().await;
        let event = event_at(&fx, Utc::now()).await;
        let result = fx
            .service
            .update_guest_genre(&fx.guest, event.id, fx.guest.id, "Techno", None)
            .await;
        assert!(matches!(result, Err(ApiError::GuestNotRegistered { .. })));
    }

    #[tokio::test]
    async fn genre_update_by_stranger_is_forbidden() {
        let fx = fixture().await;
        let event = event_at(&fx, Utc::now()).await;
        let _ = fx.service.assign(event.id, fx.guest.id).await;
        let stranger = User::register("Eve".to_string(), "eve@example.com", None, None);

        let result = fx
            .service
            .update_guest_genre(&stranger, event.id, fx.guest.id, "Techno", None)
            .await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }

    #[tokio::test]
    async fn techno_then_trance_moves_the_count() {
        let fx = fixture().await;
        let event = event_at(&fx, Utc::now()).await;
        let _ = fx.service.assign(event.id, fx.guest.id).await;

        let _ = fx
            .service
            .update_guest_genre(&fx.guest, event.id, fx.guest.id, "Techno", None)
            .await;
        let Ok(event) = fx
            .service
            .update_guest_genre(&fx.dj, event.id, fx.guest.id, "Trance", None)
            .await
        else {
            panic!("update failed");
        };

        assert_eq!(event.genre_count("Techno"), 0);
        assert_eq!(event.genre_count("Trance"), 1);
        assert_eq!(event.aggregate_total(), 1);

        let Some(user) = fx.service.store().user(fx.guest.id).await else {
            panic!("user missing");
        };
        assert_eq!(user.genre_choice, "Trance");
    }

    #[tokio::test]
    async fn select_genre_auto_assigns() {
        let fx = fixture().await;
        let event = event_at(&fx, Utc::now()).await;
        let Ok(event) = fx
            .service
            .select_genre(&fx.guest, event.id, "House", Some("https://youtu.be/x"))
            .await
        else {
            panic!("select failed");
        };
        assert!(event.is_registered(fx.guest.id));
        assert_eq!(event.genre_count("House"), 1);
    }

    #[tokio::test]
    async fn qr_join_counts_cached_genre() {
        let fx = fixture().await;
        let now = Utc::now();
        let event = event_at(&fx, now).await;
        let _ = fx
            .service
            .store()
            .update_user(fx.guest.id, |u| {
                u.set_genre("Techno", None);
                Ok(())
            })
            .await;
        let Some(guest) = fx.service.store().user(fx.guest.id).await else {
            panic!("guest missing");
        };

        let Ok(joined) = fx.service.join_live_event(&guest, fx.dj.id, now).await else {
            panic!("join failed");
        };
        assert_eq!(joined.id, event.id);
        assert_eq!(joined.genre_count("Techno"), 1);

        let again = fx.service.join_live_event(&guest, fx.dj.id, now).await;
        assert!(matches!(again, Err(ApiError::AlreadyRegistered { .. })));

        let Some(guest) = fx.service.store().user(fx.guest.id).await else {
            panic!("guest missing");
        };
        assert_eq!(guest.event_preferences.len(), 1);
    }

    #[tokio::test]
    async fn qr_join_without_event_today_is_not_found() {
        let fx = fixture().await;
        let now = Utc::now();
        let _ = event_at(&fx, now - TimeDelta::days(3)).await;
        let result = fx.service.join_live_event(&fx.guest, fx.dj.id, now).await;
        assert!(matches!(result, Err(ApiError::NoLiveEvent(_))));

        let not_dj = fx.service.join_live_event(&fx.guest, fx.guest.id, now).await;
        assert!(matches!(not_dj, Err(ApiError::DjNotFound(_))));
    }

    #[tokio::test]
    async fn live_view_is_empty_without_events_today() {
        let fx = fixture().await;
        let now = Utc::now();
        let _ = event_at(&fx, now - TimeDelta::days(2)).await;
        assert!(fx.service.live_events(&fx.dj, now).await.is_empty());
    }

    #[tokio::test]
    async fn live_view_is_scoped_for_djs_only() {
        let fx = fixture().await;
        let now = Utc::now();
        let _ = event_at(&fx, now).await;

        let mut other = User::register("Dj Bob".to_string(), "bob@example.com", None, None);
        other.promote_to_dj();
        let Ok(other) = fx.service.store().insert_user(other).await else {
            panic!("insert failed");
        };

        assert!(fx.service.live_events(&other, now).await.is_empty());
        assert_eq!(fx.service.live_events(&fx.dj, now).await.len(), 1);
        assert_eq!(fx.service.live_events(&fx.guest, now).await.len(), 1);
    }

    #[tokio::test]
    async fn views_join_names_and_mark_unknown_users() {
        let fx = fixture().await;
        let now = Utc::now();
        let event = event_at(&fx, now).await;
        let _ = fx.service.assign(event.id, fx.guest.id).await;
        let _ = fx
            .service
            .store()
            .update_event(event.id, |e| e.assign(UserId::new()))
            .await;

        let views = fx.service.live_events(&fx.dj, now).await;
        let Some(view) = views.first() else {
            panic!("expected a live event");
        };
        let names: Vec<&str> = view
            .registered_guests
            .iter()
            .map(|g| g.user_name.as_str())
            .collect();
        assert_eq!(names, vec!["Grace", UNKNOWN_USER]);
        assert!(view.dj_qr_code.is_some());
    }

    #[tokio::test]
    async fn history_is_descending_and_excludes_today() {
        let fx = fixture().await;
        let now = Utc::now();
        let older = event_at(&fx, now - TimeDelta::days(5)).await;
        let newer = event_at(&fx, now - TimeDelta::days(2)).await;
        let _ = event_at(&fx, now).await;

        let history = fx.service.history_events(&fx.dj, now).await;
        let ids: Vec<EventId> = history.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
        assert_eq!(fx.service.my_events(&fx.dj).await.len(), 3);
    }

    #[tokio::test]
    async fn events_by_owner_lists_only_that_djs_events() {
        let fx = fixture().await;
        let now = Utc::now();
        let later = event_at(&fx, now + TimeDelta::days(3)).await;
        let sooner = event_at(&fx, now).await;

        let ids: Vec<EventId> = fx
            .service
            .events_by_owner(fx.dj.id)
            .await
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![sooner.id, later.id]);
        assert!(fx.service.events_by_owner(fx.guest.id).await.is_empty());
    }

    #[tokio::test]
    async fn qr_payload_links_event_and_dj() {
        let fx = fixture().await;
        let event = event_at(&fx, Utc::now()).await;
        let Ok(payload) = fx.service.qr_payload(event.id).await else {
            panic!("payload failed");
        };
        assert_eq!(
            payload,
            format!("http://client/register?eventId={}&djId={}", event.id, fx.dj.id)
        );
    }
}
