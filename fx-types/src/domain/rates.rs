//! Rate snapshots and historical series.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Currency code -> decimal value, relative to an implicit base currency.
///
/// For `convert` results the values are converted amounts, not rates.
pub type RateSnapshot = BTreeMap<String, Decimal>;

/// Rates for a single calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DailyRates {
    #[schema(value_type = String, example = "2024-01-02")]
    pub date: NaiveDate,
    #[schema(value_type = Object)]
    pub rates: RateSnapshot,
}

impl DailyRates {
    pub fn new(date: NaiveDate, rates: RateSnapshot) -> Self {
        Self { date, rates }
    }
}

/// Fully materialized, date-ordered series. This is what gets cached.
pub type HistoricalSeries = Vec<DailyRates>;

/// Series as handed back by a provider. May be lazy and single-use.
pub type DailyRatesIter = Box<dyn Iterator<Item = DailyRates> + Send>;
