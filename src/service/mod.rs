//! Service layer: business logic orchestration.
//!
//! [`EventService`] owns event lifecycle, registration and genre
//! selection; [`UserService`] owns identity and DJ reporting;
//! [`ActivationService`] redeems serials. All three share one
//! [`crate::store::Store`].

pub mod activation_service;
pub mod event_service;
pub mod user_service;

pub use activation_service::ActivationService;
pub use event_service::{EventPatch, EventService, EventView, GuestView, NewEvent};
pub use user_service::{DjSummary, GenreStat, NewUser, UserService, UserStats};
