//! Database row models and JSONB document decoding.

use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::domain::{ActivationSerial, SerialId, UserId};
use crate::error::ApiError;

/// A row from the `activation_serials` table.
#[derive(Debug, Clone)]
pub struct SerialRow {
    /// Row ID.
    pub id: Uuid,
    /// Activation code.
    pub code: String,
    /// Consumed flag.
    pub active: bool,
    /// DJ promoted by the code.
    pub dj_id: Option<Uuid>,
}

impl From<SerialRow> for ActivationSerial {
    fn from(row: SerialRow) -> Self {
        Self {
            id: SerialId::from_uuid(row.id),
            code: row.code,
            active: row.active,
            dj_id: row.dj_id.map(UserId::from_uuid),
        }
    }
}

/// Decodes a JSONB `doc` column into a domain document.
///
/// # Errors
///
/// Returns [`ApiError::PersistenceError`] if the stored JSON does not match
/// the document shape.
pub fn decode_document<T: DeserializeOwned>(doc: serde_json::Value) -> Result<T, ApiError> {
    serde_json::from_value(doc)
        .map_err(|e| ApiError::PersistenceError(format!("corrupt document: {e}")))
}

/// Encodes a domain document for a JSONB `doc` column.
///
/// # Errors
///
/// Returns [`ApiError::Internal`] if serialization fails.
pub fn encode_document<T: serde::Serialize>(doc: &T) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(doc).map_err(|e| ApiError::Internal(format!("encode document: {e}")))
}

/// Converts a document version to the signed `BIGINT` column type.
///
/// # Errors
///
/// Returns [`ApiError::Internal`] if the version exceeds `i64::MAX`.
pub fn version_to_db(version: u64) -> Result<i64, ApiError> {
    i64::try_from(version).map_err(|_| ApiError::Internal("document version overflow".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_row_maps_to_domain() {
        let dj = Uuid::new_v4();
        let serial = ActivationSerial::from(SerialRow {
            id: Uuid::new_v4(),
            code: "ABC".to_string(),
            active: true,
            dj_id: Some(dj),
        });
        assert!(serial.active);
        assert_eq!(serial.dj_id, Some(UserId::from_uuid(dj)));
    }

    #[test]
    fn corrupt_document_is_persistence_error() {
        let result = decode_document::<ActivationSerial>(serde_json::json!({"nope": 1}));
        assert!(matches!(result, Err(ApiError::PersistenceError(_))));
    }

    #[test]
    fn version_conversion_bounds() {
        assert_eq!(version_to_db(7).ok(), Some(7));
        assert!(version_to_db(u64::MAX).is_err());
    }
}
