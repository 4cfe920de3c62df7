//! Outbound HTTP with retry and a circuit breaker.
//!
//! ```text
//! Closed ──[threshold consecutive failures]──> Open
//!    ↑                                           │
//!    │                                  [open_duration elapsed]
//!    │                                           ↓
//!    └──────────[success]────────── HalfOpen ──[failure]──> Open
//! ```

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use fx_types::RatesError;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("circuit breaker is open")]
    CircuitOpen,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    Status(StatusCode),

    #[error("could not decode upstream body: {0}")]
    Decode(String),
}

impl TransportError {
    /// Transport failures, 5xx, 408 and 429 are worth another attempt.
    fn is_transient(&self) -> bool {
        match self {
            TransportError::Request(_) => true,
            TransportError::Status(status) => {
                status.is_server_error()
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
            }
            TransportError::CircuitOpen | TransportError::Decode(_) => false,
        }
    }
}

impl From<TransportError> for RatesError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Decode(msg) => RatesError::UpstreamMalformedResponse(msg),
            other => RatesError::UpstreamUnavailable(other.to_string()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Retry
// ─────────────────────────────────────────────────────────────────────────────

/// Exponential backoff: attempt `n` (0-based) waits `base_delay * 2^n`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Circuit breaker
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    open_duration: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, open_duration: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            open_duration,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Admits a call or fails fast while the circuit is open.
    /// Half-open admits exactly one trial call.
    pub fn try_acquire(&self) -> Result<(), TransportError> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let cooled = inner
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= self.open_duration);
                if cooled {
                    tracing::info!("Circuit half-open, letting one trial call through");
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    Ok(())
                } else {
                    Err(TransportError::CircuitOpen)
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    Err(TransportError::CircuitOpen)
                } else {
                    inner.trial_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            tracing::info!("Circuit closed");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.trial_in_flight = false;
        match inner.state {
            CircuitState::HalfOpen => self.open(&mut inner),
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.threshold {
                    self.open(&mut inner);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn open(&self, inner: &mut BreakerInner) {
        tracing::warn!(
            failures = inner.consecutive_failures,
            open_for_secs = self.open_duration.as_secs(),
            "Circuit opened"
        );
        inner.state = CircuitState::Open;
        inner.opened_at = Some(Instant::now());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(60))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// `reqwest` client that retries transient failures and trips a breaker.
#[derive(Debug)]
pub struct ResilientClient {
    http: reqwest::Client,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
}

impl ResilientClient {
    pub fn new(
        timeout: Duration,
        retry: RetryPolicy,
        breaker: CircuitBreaker,
    ) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fx-rates/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            retry,
            breaker,
        })
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// GETs `url` and decodes the JSON body into `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, TransportError> {
        let mut attempt = 0;
        loop {
            match self.attempt(url).await {
                Ok(body) => {
                    return serde_json::from_slice(&body)
                        .map_err(|e| TransportError::Decode(e.to_string()));
                }
                Err(err) if err.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    attempt += 1;
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {}. Retrying in {:?}",
                        attempt,
                        self.retry.max_retries + 1,
                        url.path(),
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn attempt(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        self.breaker.try_acquire()?;

        let outcome = async {
            let response = self.http.get(url.clone()).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(TransportError::Status(status));
            }
            Ok(response.bytes().await?.to_vec())
        }
        .await;

        match &outcome {
            Err(err) if err.is_transient() => self.breaker.record_failure(),
            // The upstream answered; a 404 says nothing about its health.
            _ => self.breaker.record_success(),
        }
        outcome
    }
}
