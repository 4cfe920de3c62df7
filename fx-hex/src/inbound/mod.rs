//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the cached rate service.

pub mod auth;
mod handlers;
pub mod rate_limit;
mod server;
pub mod validation;

pub use auth::{Claims, JwtSettings, Policy, Role, TokenService};
pub use handlers::{ApiError, AppState};
pub use rate_limit::{RateLimitSettings, RateLimiterState};
pub use server::HttpServer;
