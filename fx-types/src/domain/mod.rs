//! Domain models for the currency rates service.

pub mod currency;
pub mod provider;
pub mod rates;

pub use currency::{normalize_code, normalize_targets};
pub use provider::{ProviderKind, ProviderType};
pub use rates::{DailyRates, DailyRatesIter, HistoricalSeries, RateSnapshot};
