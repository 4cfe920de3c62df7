//! Frankfurter API adapter.
//!
//! Endpoints:
//! - `GET /latest?from={BASE}`
//! - `GET /latest?amount={AMOUNT}&from={BASE}&to={T1,T2}`
//! - `GET /{start}..{end}?from={BASE}`

use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use chrono::NaiveDate;
use fx_types::{
    CurrencyProvider, DailyRates, DailyRatesIter, ProviderKind, RateSnapshot, RatesError,
};
use reqwest::Url;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::Instrument;

use crate::transport::ResilientClient;

pub const DEFAULT_BASE_URL: &str = "https://api.frankfurter.app";

#[derive(Debug, Deserialize)]
struct LatestBody {
    rates: Option<RateSnapshot>,
}

#[derive(Debug, Deserialize)]
struct SeriesBody {
    rates: Option<BTreeMap<NaiveDate, RateSnapshot>>,
}

pub struct FrankfurterProvider {
    base_url: Url,
    client: ResilientClient,
    span: tracing::Span,
}

impl FrankfurterProvider {
    pub fn new(base_url: &str, client: ResilientClient) -> Result<Self, RatesError> {
        // Joining relative paths needs the trailing slash.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized).map_err(|e| {
            RatesError::InvalidArgument(format!("invalid Frankfurter base URL {}: {}", base_url, e))
        })?;
        Ok(Self {
            base_url,
            client,
            span: tracing::info_span!("frankfurter_provider"),
        })
    }

    /// Parent span for every operation this provider performs.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn client(&self) -> &ResilientClient {
        &self.client
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, RatesError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| RatesError::InvalidArgument(format!("invalid path {}: {}", path, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn fetch_snapshot(&self, url: Url, what: &str) -> Result<RateSnapshot, RatesError> {
        tracing::debug!(url = %url, "Calling Frankfurter");
        let started = Instant::now();

        let body: LatestBody = self.client.get_json(&url).await.map_err(|e| {
            tracing::error!("Frankfurter {} request failed: {}", what, e);
            RatesError::from(e)
        })?;
        let rates = body.rates.ok_or_else(|| {
            tracing::error!("Frankfurter {} response had no rates", what);
            RatesError::UpstreamMalformedResponse(format!("{} response is missing rates", what))
        })?;

        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            count = rates.len(),
            "Retrieved {} from Frankfurter",
            what
        );
        Ok(rates)
    }
}

#[async_trait]
impl CurrencyProvider for FrankfurterProvider {
    fn name(&self) -> &str {
        "frankfurter"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Frankfurter
    }

    async fn get_latest(&self, base: &str) -> Result<RateSnapshot, RatesError> {
        let span = tracing::info_span!(parent: &self.span, "frankfurter.get_latest", base = %base);
        async {
            let url = self.endpoint("latest", &[("from", base)])?;
            self.fetch_snapshot(url, "latest rates").await
        }
        .instrument(span)
        .await
    }

    async fn convert(
        &self,
        base: &str,
        targets: Option<&[String]>,
        amount: Decimal,
    ) -> Result<RateSnapshot, RatesError> {
        let targets = targets.ok_or_else(|| RatesError::missing("targets"))?;
        let span = tracing::info_span!(
            parent: &self.span,
            "frankfurter.convert",
            base = %base,
            targets = targets.len(),
            amount = %amount
        );
        async {
            if targets.is_empty() {
                return Ok(RateSnapshot::new());
            }
            let amount = amount.normalize().to_string();
            let to = targets.join(",");
            let url = self.endpoint(
                "latest",
                &[("amount", amount.as_str()), ("from", base), ("to", to.as_str())],
            )?;
            self.fetch_snapshot(url, "conversion").await
        }
        .instrument(span)
        .await
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
        let span = tracing::info_span!(
            parent: &self.span,
            "frankfurter.get_historical",
            base = %base,
            start = %start,
            end = %end
        );
        async {
            let path = format!("{}..{}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"));
            let url = self.endpoint(&path, &[("from", base)])?;
            tracing::debug!(url = %url, "Calling Frankfurter");
            let started = Instant::now();

            let body: SeriesBody = self.client.get_json(&url).await.map_err(|e| {
                tracing::error!("Frankfurter historical request failed: {}", e);
                RatesError::from(e)
            })?;
            let series = body.rates.ok_or_else(|| {
                tracing::error!("Frankfurter historical response had no rates");
                RatesError::UpstreamMalformedResponse(
                    "historical response is missing rates".into(),
                )
            })?;

            tracing::info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                days = series.len(),
                "Retrieved historical rates from Frankfurter"
            );
            let iter = series
                .into_iter()
                .map(|(date, rates)| DailyRates::new(date, rates));
            Ok(Box::new(iter) as DailyRatesIter)
        }
        .instrument(span)
        .await
    }
}
