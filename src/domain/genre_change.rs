//! Incremental maintenance of the per-event genre aggregates.
//!
//! [`apply_genre_change`] is the single routine behind every genre entry
//! point (direct update, self-service selection, QR join and the user-level
//! genre update). It touches nothing but the event document, so it can be
//! exercised without any transport or storage.

use super::UserId;
use super::event::{Event, GenreAggregate, RegisteredGuest};

/// Outcome of [`apply_genre_change`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreChange {
    /// `true` if any aggregate counter moved.
    pub aggregate_changed: bool,
    /// `true` if the guest was not registered and got appended.
    pub auto_assigned: bool,
    /// The guest's genre before the change (empty if none).
    pub previous_genre: String,
}

/// Records `new_genre` for `guest_id` inside `event`.
///
/// The guest is appended first if absent. When the genre differs from the
/// previous one, the old genre's counter is decremented (saturating at zero)
/// and the new genre's counter is incremented, creating it if needed. An
/// empty `new_genre` clears the choice without creating an aggregate. The
/// media link is only overwritten when a non-empty one is supplied.
pub fn apply_genre_change(
    event: &mut Event,
    guest_id: UserId,
    new_genre: &str,
    media_link: Option<&str>,
) -> GenreChange {
    let mut auto_assigned = false;
    let position = match event
        .registered_guests
        .iter()
        .position(|g| g.guest_id == guest_id)
    {
        Some(pos) => pos,
        None => {
            event.registered_guests.push(RegisteredGuest::new(guest_id));
            auto_assigned = true;
            event.registered_guests.len() - 1
        }
    };

    let Some(entry) = event.registered_guests.get_mut(position) else {
        return GenreChange {
            aggregate_changed: false,
            auto_assigned,
            previous_genre: String::new(),
        };
    };

    let previous_genre = std::mem::replace(&mut entry.genre_choice, new_genre.to_string());
    if let Some(link) = media_link.filter(|l| !l.is_empty()) {
        link.clone_into(&mut entry.media_link);
    }

    if previous_genre == new_genre {
        return GenreChange {
            aggregate_changed: false,
            auto_assigned,
            previous_genre,
        };
    }

    if !previous_genre.is_empty()
        && let Some(old) = event
            .genre_stats
            .iter_mut()
            .find(|s| s.genre_name == previous_genre)
    {
        old.count = old.count.saturating_sub(1);
    }

    if !new_genre.is_empty() {
        match event
            .genre_stats
            .iter_mut()
            .find(|s| s.genre_name == new_genre)
        {
            Some(stat) => stat.count = stat.count.saturating_add(1),
            None => event.genre_stats.push(GenreAggregate {
                genre_name: new_genre.to_string(),
                count: 1,
            }),
        }
    }

    GenreChange {
        aggregate_changed: true,
        auto_assigned,
        previous_genre,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn empty_event() -> Event {
        Event::new(
            UserId::new(),
            "DJ Nova".to_string(),
            "Friday Night".to_string(),
            "Warehouse 9".to_string(),
            Utc::now(),
        )
    }

    fn stats(event: &Event) -> Vec<(&str, u32)> {
        event
            .genre_stats
            .iter()
            .map(|s| (s.genre_name.as_str(), s.count))
            .collect()
    }

    #[test]
    fn techno_then_trance_scenario() {
        let mut event = empty_event();
        let guest = UserId::new();
        assert!(event.assign(guest).is_ok());

        let first = apply_genre_change(&mut event, guest, "Techno", None);
        assert!(first.aggregate_changed);
        assert!(!first.auto_assigned);
        assert_eq!(stats(&event), vec![("Techno", 1)]);

        let second = apply_genre_change(&mut event, guest, "Trance", None);
        assert!(second.aggregate_changed);
        assert_eq!(second.previous_genre, "Techno");
        assert_eq!(stats(&event), vec![("Techno", 0), ("Trance", 1)]);
    }

    #[test]
    fn total_stays_one_across_many_switches() {
        let mut event = empty_event();
        let guest = UserId::new();
        let sequence = ["House", "Techno", "Techno", "Drum & Bass", "House", "Trance"];

        for genre in sequence {
            let _ = apply_genre_change(&mut event, guest, genre, None);
            assert_eq!(event.aggregate_total(), 1);
            assert_eq!(event.guests_with_genre(), 1);
        }
        assert_eq!(event.genre_count("Trance"), 1);
        assert_eq!(event.registered_guests.len(), 1);
    }

    #[test]
    fn same_genre_only_updates_media_link() {
        let mut event = empty_event();
        let guest = UserId::new();
        let _ = apply_genre_change(&mut event, guest, "Techno", None);

        let change = apply_genre_change(&mut event, guest, "Techno", Some("https://youtu.be/x"));
        assert!(!change.aggregate_changed);
        assert_eq!(event.genre_count("Techno"), 1);
        assert_eq!(
            event.registration(guest).map(|g| g.media_link.as_str()),
            Some("https://youtu.be/x")
        );
    }

    #[test]
    fn decrement_saturates_at_zero() {
        let mut event = empty_event();
        let guest = UserId::new();
        event.registered_guests.push(RegisteredGuest {
            guest_id: guest,
            genre_choice: "Techno".to_string(),
            media_link: String::new(),
        });
        event.genre_stats.push(GenreAggregate {
            genre_name: "Techno".to_string(),
            count: 0,
        });

        let _ = apply_genre_change(&mut event, guest, "House", None);
        assert_eq!(event.genre_count("Techno"), 0);
        assert_eq!(event.genre_count("House"), 1);
    }

    #[test]
    fn missing_old_aggregate_is_ignored() {
        let mut event = empty_event();
        let guest = UserId::new();
        event.registered_guests.push(RegisteredGuest {
            guest_id: guest,
            genre_choice: "Ambient".to_string(),
            media_link: String::new(),
        });

        let _ = apply_genre_change(&mut event, guest, "House", None);
        assert_eq!(stats(&event), vec![("House", 1)]);
    }

    #[test]
    fn unregistered_guest_is_auto_assigned() {
        let mut event = empty_event();
        let guest = UserId::new();

        let change = apply_genre_change(&mut event, guest, "House", None);
        assert!(change.auto_assigned);
        assert!(event.is_registered(guest));
        assert_eq!(event.genre_count("House"), 1);
    }

    #[test]
    fn several_guests_keep_sum_equal_to_chosen_guests() {
        let mut event = empty_event();
        let guests: Vec<UserId> = (0..4).map(|_| UserId::new()).collect();
        for guest in &guests {
            let _ = event.assign(*guest);
        }
        let choices = [
            (0, "House"),
            (1, "House"),
            (2, "Techno"),
            (0, "Techno"),
            (1, "Trance"),
            (2, "Techno"),
        ];
        for (idx, genre) in choices {
            if let Some(guest) = guests.get(idx) {
                let _ = apply_genre_change(&mut event, *guest, genre, None);
            }
        }

        assert_eq!(event.aggregate_total(), event.guests_with_genre());
        assert_eq!(event.aggregate_total(), 3);
        assert_eq!(event.genre_count("Techno"), 2);
        assert_eq!(event.genre_count("House"), 0);
    }

    #[test]
    fn clearing_choice_decrements_without_new_aggregate() {
        let mut event = empty_event();
        let guest = UserId::new();
        let _ = apply_genre_change(&mut event, guest, "House", None);
        let change = apply_genre_change(&mut event, guest, "", None);

        assert!(change.aggregate_changed);
        assert_eq!(stats(&event), vec![("House", 0)]);
        assert_eq!(event.aggregate_total(), event.guests_with_genre());
    }
}
