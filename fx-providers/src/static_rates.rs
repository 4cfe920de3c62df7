//! Fixed exchange-rate table for development and offline testing.
//!
//! Currencies are declared once in `define_currencies!`, which generates the
//! `StaticCurrency` enum together with its code lookup and USD rate table.
//!
//! # Adding a New Currency
//! ```ignore
//! define_currencies! {
//!     // ... existing currencies ...
//!     SEK => ("SEK", dec!(0.0951)),
//! }
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;
use fx_types::{
    CurrencyProvider, DailyRates, DailyRatesIter, ProviderKind, RateSnapshot, RatesError,
    normalize_code,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const RATE_DP: u32 = 6;
const AMOUNT_DP: u32 = 4;

macro_rules! define_currencies {
    (
        $(
            $name:ident => ($code:literal, $to_usd:expr)
        ),* $(,)?
    ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum StaticCurrency {
            $($name),*
        }

        impl StaticCurrency {
            pub fn code(&self) -> &'static str {
                match self {
                    $(StaticCurrency::$name => $code),*
                }
            }

            /// Value of one unit in USD.
            pub fn to_usd_rate(&self) -> Decimal {
                match self {
                    $(StaticCurrency::$name => $to_usd),*
                }
            }

            pub fn all() -> &'static [StaticCurrency] {
                &[$(StaticCurrency::$name),*]
            }
        }

        impl std::fmt::Display for StaticCurrency {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.code())
            }
        }

        impl std::str::FromStr for StaticCurrency {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match normalize_code(s).as_str() {
                    $($code => Ok(StaticCurrency::$name),)*
                    _ => Err(format!("Unknown currency: {}", s)),
                }
            }
        }
    };
}

define_currencies! {
    USD => ("USD", dec!(1.0)),
    EUR => ("EUR", dec!(1.087)),
    GBP => ("GBP", dec!(1.266)),
    INR => ("INR", dec!(0.01203)),
    JPY => ("JPY", dec!(0.00672)),
    CHF => ("CHF", dec!(1.128)),
    CAD => ("CAD", dec!(0.7386)),
    AUD => ("AUD", dec!(0.6571)),
}

/// Units of `to` per one unit of `from`, crossing through USD.
pub fn cross_rate(from: StaticCurrency, to: StaticCurrency) -> Decimal {
    if from == to {
        return Decimal::ONE;
    }
    (from.to_usd_rate() / to.to_usd_rate()).round_dp(RATE_DP)
}

/// Every other currency's rate against `base`.
pub fn rates_for(base: StaticCurrency) -> RateSnapshot {
    StaticCurrency::all()
        .iter()
        .filter(|&&c| c != base)
        .map(|&c| (c.code().to_string(), cross_rate(base, c)))
        .collect()
}

fn parse_currency(code: &str) -> Result<StaticCurrency, RatesError> {
    code.parse().map_err(RatesError::InvalidArgument)
}

/// Provider backed by the fixed table. Rates do not move over time, so the
/// historical series repeats the same snapshot for every day.
#[derive(Debug, Clone, Default)]
pub struct StaticRatesProvider;

impl StaticRatesProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CurrencyProvider for StaticRatesProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Static
    }

    async fn get_latest(&self, base: &str) -> Result<RateSnapshot, RatesError> {
        let base = parse_currency(base)?;
        Ok(rates_for(base))
    }

    async fn convert(
        &self,
        base: &str,
        targets: Option<&[String]>,
        amount: Decimal,
    ) -> Result<RateSnapshot, RatesError> {
        let targets = targets.ok_or_else(|| RatesError::missing("targets"))?;
        let base = parse_currency(base)?;

        targets
            .iter()
            .map(|code| {
                let target = parse_currency(code)?;
                let converted = amount
                    .checked_mul(cross_rate(base, target))
                    .ok_or_else(|| {
                        RatesError::InvalidArgument(format!(
                            "amount {} is too large to convert from {} to {}",
                            amount, base, target
                        ))
                    })?
                    .round_dp(AMOUNT_DP);
                Ok((target.code().to_string(), converted))
            })
            .collect()
    }

    async fn get_historical(
        &self,
        base: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailyRatesIter, RatesError> {
        if end < start {
            return Err(RatesError::InvalidArgument(format!(
                "end date {} is before start date {}",
                end, start
            )));
        }
        let rates = rates_for(parse_currency(base)?);

        let days = start
            .iter_days()
            .take_while(move |day| *day <= end)
            .map(move |day| DailyRates::new(day, rates.clone()));
        Ok(Box::new(days))
    }
}
