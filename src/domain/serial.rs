//! One-time activation serials that promote a guest to DJ.

use serde::{Deserialize, Serialize};

use super::{SerialId, UserId};
use crate::error::ApiError;

/// A persisted activation code.
///
/// Seeded out of band with `active == false`; flipped to `true` exactly
/// once by [`ActivationSerial::activate`] and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationSerial {
    /// Unique identifier.
    pub id: SerialId,
    /// The code handed to a prospective DJ.
    pub code: String,
    /// `true` once consumed.
    pub active: bool,
    /// DJ promoted by this code.
    pub dj_id: Option<UserId>,
}

impl ActivationSerial {
    /// Creates an unused serial.
    #[must_use]
    pub fn new(code: String) -> Self {
        Self {
            id: SerialId::new(),
            code,
            active: false,
            dj_id: None,
        }
    }

    /// Consumes the serial on behalf of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::SerialUnavailable`] if the serial was already
    /// consumed. The record is left unchanged in that case.
    pub fn activate(&mut self, user_id: UserId) -> Result<(), ApiError> {
        if self.active {
            return Err(ApiError::SerialUnavailable);
        }
        self.active = true;
        self.dj_id = Some(user_id);
        Ok(())
    }
}
