//! # FX Types
//!
//! Domain types and port traits for the currency rates service.
//! This crate has ZERO external IO dependencies - only data structures,
//! normalization rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Rate snapshots, historical series, provider tokens
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Core and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    DailyRates, DailyRatesIter, HistoricalSeries, ProviderKind, ProviderType, RateSnapshot,
    normalize_code, normalize_targets,
};
pub use dto::*;
pub use error::{AppError, FieldErrors, RatesError};
pub use ports::{CurrencyProvider, ProviderSelector};
