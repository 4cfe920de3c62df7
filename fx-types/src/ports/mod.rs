//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The application layer depends on these traits, not concrete implementations.

mod provider;
mod selector;

pub use provider::CurrencyProvider;
pub use selector::ProviderSelector;
