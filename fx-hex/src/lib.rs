//! # FX Hex
//!
//! Application service layer and HTTP adapter for the currency rates service.
//!
//! ## Architecture
//!
//! - `factory` - Provider registration and selection
//! - `service` - Read-through cache in front of the selected provider
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The service is generic over `S: ProviderSelector`, allowing
//! different selection strategies to be injected.

pub mod factory;
pub mod inbound;
pub mod openapi;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use factory::ProviderFactory;
pub use service::{CacheTtls, CachedRateService};
