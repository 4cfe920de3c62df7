//! Rate limiting middleware using Governor.
//!
//! Implements per-client-IP rate limiting with a token bucket algorithm.

use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde_json::json;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroU32,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

/// Idle buckets are swept after this many checks.
const RETAIN_EVERY: u64 = 1024;

/// Token bucket settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    /// Bucket size
    pub token_limit: u32,
    /// Tokens added back every `replenishment_period`
    pub tokens_per_period: u32,
    pub replenishment_period: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            token_limit: 100,
            tokens_per_period: 100,
            replenishment_period: Duration::from_secs(60),
        }
    }
}

/// Rate limiter state shared across requests.
pub struct RateLimiterState {
    /// One bucket per client address
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    checks: AtomicU64,
    retry_after: Duration,
}

impl Default for RateLimiterState {
    fn default() -> Self {
        Self::new(RateLimitSettings::default())
    }
}

impl RateLimiterState {
    /// Creates a new rate limiter state.
    ///
    /// One token is replenished every `replenishment_period / tokens_per_period`;
    /// the bucket holds at most `token_limit`. Zero values are treated as one.
    pub fn new(settings: RateLimitSettings) -> Self {
        let per_period = settings.tokens_per_period.max(1);
        let interval = (settings.replenishment_period / per_period).max(Duration::from_nanos(1));
        let burst = NonZeroU32::new(settings.token_limit).unwrap_or(NonZeroU32::MIN);

        let quota = Quota::with_period(interval)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(burst);

        Self {
            limiter: RateLimiter::keyed(quota),
            checks: AtomicU64::new(0),
            retry_after: settings.replenishment_period,
        }
    }

    /// Checks if a request should be rate limited.
    /// Returns true if the request is allowed, false if rate limited.
    pub fn check(&self, client: IpAddr) -> bool {
        let allowed = self.limiter.check_key(&client).is_ok();
        if self.checks.fetch_add(1, Ordering::Relaxed) % RETAIN_EVERY == RETAIN_EVERY - 1 {
            self.retain_recent();
        }
        allowed
    }

    /// Drops buckets that have fully refilled; such clients start over with
    /// a fresh bucket on their next request.
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Number of client buckets currently held.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

/// Client address from the connection, or loopback when the server was not
/// started with connect info (e.g. router tests).
fn client_ip(request: &Request<Body>) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// Rate limiting middleware.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // Skip rate limiting for health endpoint
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let client = client_ip(&request);
    if !limiter.check(client) {
        tracing::warn!(client = %client, "Rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "Rate limit exceeded. Please try again later.",
                "retry_after_seconds": limiter.retry_after.as_secs()
            })),
        )
            .into_response();
    }

    next.run(request).await
}
