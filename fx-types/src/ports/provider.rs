//! Currency provider port.
//!
//! This trait defines the interface for upstream rate sources.
//! Implementations can be HTTP clients, fixed tables, mock providers, etc.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::{DailyRatesIter, ProviderKind, RateSnapshot};
use crate::error::RatesError;

/// Port trait for a single upstream rate source.
///
/// Failures must be reported with the `RatesError` taxonomy:
/// `UpstreamUnavailable` for transport failures and non-success statuses,
/// `UpstreamMalformedResponse` for unparseable or structurally empty bodies,
/// `InvalidArgument` for caller-contract violations.
#[async_trait::async_trait]
pub trait CurrencyProvider: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// What this provider is, for selection by `ProviderType`.
    fn kind(&self) -> ProviderKind {
        ProviderKind::Generic
    }

    /// Latest rates relative to `base`.
    async fn get_latest(&self, base: &str) -> Result<RateSnapshot, RatesError>;

    /// Converts `amount` of `base` into each target currency.
    ///
    /// `Some(&[])` yields an empty snapshot; `None` is `InvalidArgument`.
    async fn convert(
        &self,
        base: &str,
        targets: Option<&[String]>,
        amount: Decimal,
    ) -> Result<RateSnapshot, RatesError>;

    /// Daily rates for `start..=end`, ordered by date.
    async fn get_historical(
        &self,
        base: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailyRatesIter, RatesError>;
}
