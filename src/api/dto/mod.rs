//! Data Transfer Objects for REST request/response serialization.
//!
//! Request types expose a `validate()` that trims, checks and converts
//! into the service layer's input types. All bodies are camelCase.

pub mod common_dto;
pub mod event_dto;
pub mod user_dto;

pub use common_dto::*;
pub use event_dto::*;
pub use user_dto::*;
