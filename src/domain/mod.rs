//! Domain layer: documents, identifiers and the genre aggregation rules.
//!
//! Everything here is storage-agnostic. The invariants of the event
//! document (one registration per guest, aggregates matching the guests'
//! choices, counters never below zero) are enforced by [`Event::assign`]
//! and [`apply_genre_change`].

pub mod calendar;
pub mod event;
pub mod genre_change;
pub mod ids;
pub mod serial;
pub mod user;

pub use event::{Event, GenreAggregate, RegisteredGuest};
pub use genre_change::{GenreChange, apply_genre_change};
pub use ids::{EventId, SerialId, UserId};
pub use serial::ActivationSerial;
pub use user::{Gender, Role, User};
