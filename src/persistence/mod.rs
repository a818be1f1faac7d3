//! Persistence layer: PostgreSQL document tables.
//!
//! Users and events are stored as JSONB documents next to the columns the
//! service filters on. Event writes compare the stored `version` so that
//! two service instances cannot silently overwrite each other. The
//! concrete implementation uses `sqlx::PgPool` for async PostgreSQL access.

pub mod models;
pub mod postgres;

pub use postgres::PostgresPersistence;
