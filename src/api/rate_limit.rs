//! Fixed-window request limits per route group and client.
//!
//! Clients are keyed by the first `X-Forwarded-For` address, else by the
//! peer address from [`ConnectInfo`], else `"direct"`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::ApiError;

/// Windows kept before expired entries are swept.
const SWEEP_THRESHOLD: usize = 10_000;

/// A named limit: at most `max` requests per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Route group sharing the budget.
    pub bucket: &'static str,
    /// Requests allowed per window.
    pub max: u32,
    /// Window length.
    pub window: Duration,
}

/// `POST /user/register`: 30 per hour.
pub const REGISTER: RateLimitPolicy = RateLimitPolicy {
    bucket: "register",
    max: 30,
    window: Duration::from_secs(60 * 60),
};

/// `POST /user/login`: 20 per 15 minutes.
pub const LOGIN: RateLimitPolicy = RateLimitPolicy {
    bucket: "login",
    max: 20,
    window: Duration::from_secs(15 * 60),
};

/// `POST /events/assign-user`: 60 per minute.
pub const ASSIGN_USER: RateLimitPolicy = RateLimitPolicy {
    bucket: "assign-user",
    max: 60,
    window: Duration::from_secs(60),
};

/// `POST /user/scan-qr`: 60 per minute.
pub const SCAN_QR: RateLimitPolicy = RateLimitPolicy {
    bucket: "scan-qr",
    max: 60,
    window: Duration::from_secs(60),
};

/// Genre mutations: 120 per minute.
pub const GENRE: RateLimitPolicy = RateLimitPolicy {
    bucket: "genre",
    max: 120,
    window: Duration::from_secs(60),
};

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Shared counter store for every policy.
#[derive(Debug)]
pub struct RateLimiter {
    enabled: bool,
    windows: Mutex<HashMap<(&'static str, String), Window>>,
}

impl RateLimiter {
    /// Creates a limiter. A disabled limiter admits everything.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Counts one request from `client` against `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::RateLimited`] once the window's budget is spent.
    pub async fn check(&self, policy: RateLimitPolicy, client: &str) -> Result<(), ApiError> {
        self.check_at(policy, client, Instant::now()).await
    }

    async fn check_at(
        &self,
        policy: RateLimitPolicy,
        client: &str,
        now: Instant,
    ) -> Result<(), ApiError> {
        if !self.enabled {
            return Ok(());
        }
        let mut windows = self.windows.lock().await;
        if windows.len() >= SWEEP_THRESHOLD {
            windows.retain(|(bucket, _), w| {
                now.duration_since(w.started) < window_of(*bucket).unwrap_or(policy.window)
            });
        }

        let window = windows
            .entry((policy.bucket, client.to_string()))
            .or_insert(Window {
                started: now,
                count: 0,
            });
        let elapsed = now.duration_since(window.started);
        if elapsed >= policy.window {
            *window = Window {
                started: now,
                count: 0,
            };
        }
        if window.count >= policy.max {
            let remaining = policy.window.saturating_sub(now.duration_since(window.started));
            let retry_after_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(bucket = policy.bucket, client, retry_after_ms, "rate limit exceeded");
            return Err(ApiError::RateLimited { retry_after_ms });
        }
        window.count = window.count.saturating_add(1);
        Ok(())
    }
}

fn window_of(bucket: &str) -> Option<Duration> {
    [REGISTER, LOGIN, ASSIGN_USER, SCAN_QR, GENRE]
        .into_iter()
        .find(|p| p.bucket == bucket)
        .map(|p| p.window)
}

/// Middleware state: the shared limiter plus the policy of one route.
#[derive(Debug, Clone)]
pub struct Limited {
    limiter: Arc<RateLimiter>,
    policy: RateLimitPolicy,
}

impl Limited {
    /// Binds `policy` to the shared limiter.
    #[must_use]
    pub fn new(limiter: &Arc<RateLimiter>, policy: RateLimitPolicy) -> Self {
        Self {
            limiter: Arc::clone(limiter),
            policy,
        }
    }
}

/// Axum middleware rejecting requests over the route's budget.
///
/// # Errors
///
/// Returns [`ApiError::RateLimited`] when the client is over budget.
pub async fn enforce(
    State(limited): State<Limited>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(request.headers(), peer);
    limited.limiter.check(limited.policy, &client).await?;
    Ok(next.run(request).await)
}

/// First `X-Forwarded-For` address, else the peer IP, else `"direct"`.
#[must_use]
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| raw.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    match (forwarded, peer) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => "direct".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    const TINY: RateLimitPolicy = RateLimitPolicy {
        bucket: "tiny",
        max: 2,
        window: Duration::from_secs(10),
    };

    #[tokio::test]
    async fn budget_resets_after_window() {
        let limiter = RateLimiter::new(true);
        let start = Instant::now();
        assert!(limiter.check_at(TINY, "a", start).await.is_ok());
        assert!(limiter.check_at(TINY, "a", start).await.is_ok());

        let third = limiter
            .check_at(TINY, "a", start + Duration::from_secs(4))
            .await;
        assert!(matches!(
            third,
            Err(ApiError::RateLimited {
                retry_after_ms: 6000
            })
        ));

        let later = limiter
            .check_at(TINY, "a", start + Duration::from_secs(10))
            .await;
        assert!(later.is_ok());
    }

    #[tokio::test]
    async fn clients_and_buckets_are_independent() {
        let limiter = RateLimiter::new(true);
        let now = Instant::now();
        for _ in 0..2 {
            let _ = limiter.check_at(TINY, "a", now).await;
        }
        assert!(limiter.check_at(TINY, "a", now).await.is_err());
        assert!(limiter.check_at(TINY, "b", now).await.is_ok());
        assert!(limiter.check_at(LOGIN, "a", now).await.is_ok());
    }

    #[tokio::test]
    async fn disabled_limiter_admits_everything() {
        let limiter = RateLimiter::new(false);
        let now = Instant::now();
        for _ in 0..10 {
            assert!(limiter.check_at(TINY, "a", now).await.is_ok());
        }
    }

    #[test]
    fn client_key_uses_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_key(&headers, None), "direct");
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        let peer = SocketAddr::from(([192, 0, 2, 1], 40000));
        assert_eq!(client_key(&headers, Some(peer)), "203.0.113.7");
    }

    #[tokio::test]
    async fn direct_peers_get_separate_budgets() {
        let limiter = RateLimiter::new(true);
        let headers = HeaderMap::new();
        let first = client_key(&headers, Some(SocketAddr::from(([192, 0, 2, 1], 40000))));
        let second = client_key(&headers, Some(SocketAddr::from(([192, 0, 2, 2], 40001))));
        assert_ne!(first, second);

        let now = Instant::now();
        for _ in 0..TINY.max {
            assert!(limiter.check_at(TINY, &first, now).await.is_ok());
        }
        assert!(limiter.check_at(TINY, &first, now).await.is_err());
        assert!(limiter.check_at(TINY, &second, now).await.is_ok());
    }

    #[tokio::test]
    async fn middleware_keys_on_connect_info() {
        use axum::Router;
        use axum::body::Body;
        use axum::http::StatusCode;
        use axum::middleware::from_fn_with_state;
        use axum::routing::get;
        use tower::ServiceExt;

        let limiter = Arc::new(RateLimiter::new(true));
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .route_layer(from_fn_with_state(Limited::new(&limiter, TINY), enforce));

        let request_from = |octet: u8| {
            let mut request = Request::new(Body::empty());
            request
                .extensions_mut()
                .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, octet], 5000))));
            request
        };
        for _ in 0..TINY.max {
            let Ok(response) = app.clone().oneshot(request_from(1)).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
        let Ok(limited) = app.clone().oneshot(request_from(1)).await;
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        let Ok(other) = app.oneshot(request_from(2)).await;
        assert_eq!(other.status(), StatusCode::OK);
    }
}
