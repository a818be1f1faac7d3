//! Activation service: redeems one-time serials for the DJ role.

use std::sync::Arc;

use crate::domain::{User, UserId};
use crate::error::ApiError;
use crate::store::Store;

/// Promotes guests to DJs in exchange for an unused activation serial.
#[derive(Debug, Clone)]
pub struct ActivationService {
    store: Arc<Store>,
}

impl ActivationService {
    /// Creates a new `ActivationService`.
    #[must_use]
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Seeds serial codes that are not yet known. Returns how many were
    /// added.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if a write fails.
    pub async fn seed(&self, codes: &[String]) -> Result<usize, ApiError> {
        let added = self.store.seed_serials(codes).await?;
        if added > 0 {
            tracing::info!(added, "activation serials seeded");
        }
        Ok(added)
    }

    /// Consumes `code` and grants the caller the DJ role.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::SerialUnavailable`] for unknown or used codes,
    /// [`ApiError::UserNotFound`], or a persistence error.
    pub async fn activate(&self, code: &str, user_id: UserId) -> Result<User, ApiError> {
        let code = code.trim();
        if let Err(e) = self.store.activate_serial(code, user_id).await {
            tracing::warn!(%user_id, error = %e, "serial activation rejected");
            return Err(e);
        }
        let (user, ()) = self
            .store
            .update_user(user_id, |user| {
                user.promote_to_dj();
                Ok(())
            })
            .await?;

        tracing::info!(%user_id, "user promoted to DJ");
        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    async fn setup() -> (ActivationService, User) {
        let store = Arc::new(Store::in_memory());
        let user = User::register("Ada".to_string(), "ada@example.com", None, None);
        let Ok(user) = store.insert_user(user).await else {
            panic!("insert failed");
        };
        let service = ActivationService::new(store);
        let _ = service.seed(&["DJ-0001".to_string()]).await;
        (service, user)
    }

    #[tokio::test]
    async fn activation_promotes_once() {
        let (service, user) = setup().await;
        let Ok(promoted) = service.activate(" DJ-0001 ", user.id).await else {
            panic!("activation failed");
        };
        assert!(promoted.is_dj());

        let second = service.activate("DJ-0001", user.id).await;
        assert!(matches!(second, Err(ApiError::SerialUnavailable)));
    }

    #[tokio::test]
    async fn unknown_code_leaves_role_untouched() {
        let (service, user) = setup().await;
        let result = service.activate("NOPE", user.id).await;
        assert!(matches!(result, Err(ApiError::SerialUnavailable)));

        let Some(current) = service.store.user(user.id).await else {
            panic!("user missing");
        };
        assert!(!current.is_dj());
    }
}
