//! Rate provider adapters.
//!
//! - [`FrankfurterProvider`] talks to the Frankfurter API through a
//!   [`ResilientClient`] (retry with backoff plus a circuit breaker).
//! - [`StaticRatesProvider`] serves a fixed USD-anchored table for offline
//!   development and tests.

pub mod frankfurter;
pub mod static_rates;
pub mod transport;

pub use frankfurter::FrankfurterProvider;
pub use static_rates::{StaticCurrency, StaticRatesProvider};
pub use transport::{CircuitBreaker, CircuitState, ResilientClient, RetryPolicy, TransportError};
