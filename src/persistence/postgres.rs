//! PostgreSQL implementation of the persistence layer.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::models::{SerialRow, decode_document, encode_document, version_to_db};
use crate::config::AppConfig;
use crate::domain::{ActivationSerial, Event, EventId, Role, User, UserId};
use crate::error::ApiError;

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL-backed persistence layer using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    /// Creates a new persistence layer with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized from `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`ApiError::PersistenceError`] if the database is
    /// unreachable.
    pub async fn connect(config: &AppConfig) -> Result<Self, ApiError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`ApiError::PersistenceError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), ApiError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ApiError::PersistenceError(e.to_string()))
    }

    /// Inserts or replaces a user document.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EmailTaken`] if another row already holds the
    /// e-mail address, or a [`ApiError::PersistenceError`] on database
    /// failure.
    pub async fn save_user(&self, user: &User) -> Result<(), ApiError> {
        let doc = encode_document(user)?;
        sqlx::query(
            "INSERT INTO users (id, email, role, doc, updated_at) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email, role = EXCLUDED.role, \
             doc = EXCLUDED.doc, updated_at = EXCLUDED.updated_at",
        )
        .bind(Uuid::from(user.id))
        .bind(&user.email)
        .bind(role_column(user.role))
        .bind(&doc)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let duplicate = e
                .as_database_error()
                .and_then(|d| d.code())
                .is_some_and(|code| code == UNIQUE_VIOLATION);
            if duplicate {
                ApiError::EmailTaken(user.email.clone())
            } else {
                ApiError::from(e)
            }
        })?;
        Ok(())
    }

    /// Loads every user document.
    ///
    /// # Errors
    ///
    /// Returns a [`ApiError::PersistenceError`] on database failure or if
    /// a stored document cannot be decoded.
    pub async fn load_users(&self) -> Result<Vec<User>, ApiError> {
        let rows = sqlx::query_scalar::<_, serde_json::Value>("SELECT doc FROM users")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(decode_document).collect()
    }

    /// Inserts a new event row.
    ///
    /// # Errors
    ///
    /// Returns a [`ApiError::PersistenceError`] on database failure.
    pub async fn insert_event(&self, event: &Event) -> Result<(), ApiError> {
        let doc = encode_document(event)?;
        sqlx::query(
            "INSERT INTO events (id, owner_id, event_date, version, doc) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::from(event.id))
        .bind(Uuid::from(event.owner_id))
        .bind(event.date)
        .bind(version_to_db(event.version)?)
        .bind(&doc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Overwrites an event row if its stored version still equals
    /// `expected_version`. A deleted row never comes back.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::VersionConflict`] if the row changed or
    /// disappeared, or a [`ApiError::PersistenceError`] on database
    /// failure.
    pub async fn update_event(&self, event: &Event, expected_version: u64) -> Result<(), ApiError> {
        let doc = encode_document(event)?;
        let result = sqlx::query(
            "UPDATE events SET owner_id = $2, event_date = $3, version = $4, doc = $5 \
             WHERE id = $1 AND version = $6",
        )
        .bind(Uuid::from(event.id))
        .bind(Uuid::from(event.owner_id))
        .bind(event.date)
        .bind(version_to_db(event.version)?)
        .bind(&doc)
        .bind(version_to_db(expected_version)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::VersionConflict(event.id));
        }
        Ok(())
    }

    /// Loads one event document.
    ///
    /// # Errors
    ///
    /// Returns a [`ApiError::PersistenceError`] on database failure or if
    /// the stored document cannot be decoded.
    pub async fn load_event(&self, event_id: EventId) -> Result<Option<Event>, ApiError> {
        let row = sqlx::query_scalar::<_, serde_json::Value>("SELECT doc FROM events WHERE id = $1")
            .bind(Uuid::from(event_id))
            .fetch_optional(&self.pool)
            .await?;
        row.map(decode_document).transpose()
    }

    /// Deletes an event row. Returns `true` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns a [`ApiError::PersistenceError`] on database failure.
    pub async fn delete_event(&self, event_id: EventId) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(Uuid::from(event_id))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Loads every event document.
    ///
    /// # Errors
    ///
    /// Returns a [`ApiError::PersistenceError`] on database failure or if
    /// a stored document cannot be decoded.
    pub async fn load_events(&self) -> Result<Vec<Event>, ApiError> {
        let rows = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT doc FROM events ORDER BY event_date ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(decode_document).collect()
    }

    /// Inserts a serial unless the code already exists. Returns `true` if
    /// a row was inserted.
    ///
    /// # Errors
    ///
    /// Returns a [`ApiError::PersistenceError`] on database failure.
    pub async fn insert_serial_if_absent(
        &self,
        serial: &ActivationSerial,
    ) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "INSERT INTO activation_serials (id, code, active, dj_id) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (code) DO NOTHING",
        )
        .bind(Uuid::from(serial.id))
        .bind(&serial.code)
        .bind(serial.active)
        .bind(serial.dj_id.map(Uuid::from))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Flips an unused serial to active in a single conditional update.
    /// Returns `false` if the code is unknown or was already consumed.
    ///
    /// # Errors
    ///
    /// Returns a [`ApiError::PersistenceError`] on database failure.
    pub async fn activate_serial(&self, code: &str, dj_id: UserId) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "UPDATE activation_serials SET active = TRUE, dj_id = $2 \
             WHERE code = $1 AND active = FALSE",
        )
        .bind(code)
        .bind(Uuid::from(dj_id))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Loads every activation serial.
    ///
    /// # Errors
    ///
    /// Returns a [`ApiError::PersistenceError`] on database failure.
    pub async fn load_serials(&self) -> Result<Vec<ActivationSerial>, ApiError> {
        let rows = sqlx::query_as::<_, (Uuid, String, bool, Option<Uuid>)>(
            "SELECT id, code, active, dj_id FROM activation_serials",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, code, active, dj_id)| {
                ActivationSerial::from(SerialRow {
                    id,
                    code,
                    active,
                    dj_id,
                })
            })
            .collect())
    }
}

/// Value stored in the `users.role` column.
fn role_column(role: Role) -> &'static str {
    match role {
        Role::Guest => "guest",
        Role::Dj => "dj",
    }
}
