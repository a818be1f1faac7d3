//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::api::rate_limit::RateLimiter;
use crate::auth::TokenIssuer;
use crate::config::AppConfig;
use crate::service::{ActivationService, EventService, UserService};
use crate::store::Store;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Event lifecycle, registration and genre selection.
    pub event_service: Arc<EventService>,
    /// Identity, profile and DJ reporting.
    pub user_service: Arc<UserService>,
    /// Serial redemption.
    pub activation_service: Arc<ActivationService>,
    /// Token signing and verification.
    pub tokens: Arc<TokenIssuer>,
    /// Per-client request limits.
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Wires the services around `store` using `config`.
    #[must_use]
    pub fn new(config: &AppConfig, store: Arc<Store>) -> Self {
        Self {
            event_service: Arc::new(EventService::new(
                Arc::clone(&store),
                config.utc_offset,
                config.client_url.clone(),
            )),
            user_service: Arc::new(UserService::new(Arc::clone(&store))),
            activation_service: Arc::new(ActivationService::new(store)),
            tokens: Arc::new(TokenIssuer::new(
                &config.secret_key,
                config.token_ttl_hours,
                config.cookie_secure,
            )),
            limiter: Arc::new(RateLimiter::new(config.rate_limit_enabled)),
        }
    }
}
