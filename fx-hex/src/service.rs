//! Cached Rate Service
//!
//! Read-through cache in front of the selected currency provider.
//! Contains NO transport logic - providers own their own I/O and retries.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use moka::Expiry;
use moka::future::Cache;
use rust_decimal::Decimal;
use tracing::Instrument;

use fx_types::{
    CurrencyProvider, HistoricalSeries, ProviderSelector, ProviderType, RateSnapshot, RatesError,
    normalize_code, normalize_targets,
};

/// Time-to-live per operation family, plus the cache's entry bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub latest: Duration,
    pub convert: Duration,
    pub history: Duration,
    pub max_entries: u64,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            latest: Duration::from_secs(30 * 60),
            convert: Duration::from_secs(30 * 60),
            history: Duration::from_secs(6 * 60 * 60),
            max_entries: 10_000,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache entries
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum CachedRates {
    Snapshot(Arc<RateSnapshot>),
    Series(Arc<HistoricalSeries>),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CachedRates,
    ttl: Duration,
}

/// Expiry fixed at insertion from the entry's own TTL.
struct PerEntryTtl;

impl Expiry<String, CacheEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Values the service knows how to store in, and read back from, the cache.
trait CachedValue: Sized + Send + Sync + 'static {
    fn into_cached(self) -> CachedRates;
    fn from_cached(value: CachedRates) -> Option<Arc<Self>>;
}

impl CachedValue for RateSnapshot {
    fn into_cached(self) -> CachedRates {
        CachedRates::Snapshot(Arc::new(self))
    }

    fn from_cached(value: CachedRates) -> Option<Arc<Self>> {
        match value {
            CachedRates::Snapshot(snapshot) => Some(snapshot),
            CachedRates::Series(_) => None,
        }
    }
}

impl CachedValue for HistoricalSeries {
    fn into_cached(self) -> CachedRates {
        CachedRates::Series(Arc::new(self))
    }

    fn from_cached(value: CachedRates) -> Option<Arc<Self>> {
        match value {
            CachedRates::Series(series) => Some(series),
            CachedRates::Snapshot(_) => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache keys
// ─────────────────────────────────────────────────────────────────────────────

/// Uppercases `code` and rejects anything that is not a plain alphanumeric
/// code, so that the `-` and `,` key separators stay unambiguous.
fn canonical_code(code: &str, field: &str) -> Result<String, RatesError> {
    let code = normalize_code(code);
    if code.is_empty() {
        return Err(RatesError::missing(field));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(RatesError::InvalidArgument(format!(
            "{} '{}' is not a valid currency code",
            field, code
        )));
    }
    Ok(code)
}

fn canonical_targets(targets: &[String]) -> Result<Vec<String>, RatesError> {
    let targets = normalize_targets(targets);
    for target in &targets {
        canonical_code(target, "targets")?;
    }
    Ok(targets)
}

pub(crate) fn latest_key(base: &str) -> String {
    format!("latest-{}", base)
}

pub(crate) fn convert_key(base: &str, targets: &[String], amount: Decimal) -> String {
    format!(
        "convert-{}-{}-{}",
        base,
        targets.join(","),
        amount.normalize()
    )
}

pub(crate) fn history_key(base: &str, start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "history-{}-{}-{}",
        base,
        start.format("%Y%m%d"),
        end.format("%Y%m%d")
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────────────────────────

/// Read-through rate cache.
///
/// Generic over `S: ProviderSelector` - the selection strategy is injected.
/// Each operation family gets its own TTL; entries leave the cache only by
/// expiry or capacity eviction.
pub struct CachedRateService<S: ProviderSelector> {
    selector: Arc<S>,
    cache: Cache<String, CacheEntry>,
    ttls: CacheTtls,
    preferred: ProviderType,
    span: tracing::Span,
}

impl<S: ProviderSelector> CachedRateService<S> {
    pub fn new(selector: S, ttls: CacheTtls) -> Self {
        let cache = Cache::builder()
            .max_capacity(ttls.max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self {
            selector: Arc::new(selector),
            cache,
            ttls,
            preferred: ProviderType::Default,
            span: tracing::info_span!("cached_rate_service"),
        }
    }

    /// Provider type requested from the selector on every cache miss.
    pub fn with_preferred(mut self, preferred: ProviderType) -> Self {
        self.preferred = preferred;
        self
    }

    /// Parent span for every operation this service performs.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn selector(&self) -> &S {
        &self.selector
    }

    pub fn ttls(&self) -> CacheTtls {
        self.ttls
    }

    /// Latest rates for `base`.
    pub async fn get_latest(&self, base: &str) -> Result<Arc<RateSnapshot>, RatesError> {
        let base = canonical_code(base, "baseCurrency")?;
        let span = tracing::info_span!(parent: &self.span, "rates.get_latest", base = %base);

        let key = latest_key(&base);
        self.read_through(key, self.ttls.latest, move |provider| async move {
            provider.get_latest(&base).await
        })
        .instrument(span)
        .await
    }

    /// Converts `amount` of `base` into each of `targets`.
    ///
    /// Targets are order-insensitive: `[EUR, GBP]` and `[GBP, EUR]` are the
    /// same request and share a cache entry.
    pub async fn convert(
        &self,
        base: &str,
        targets: Option<&[String]>,
        amount: Decimal,
    ) -> Result<Arc<RateSnapshot>, RatesError> {
        let base = canonical_code(base, "baseCurrency")?;
        let targets = canonical_targets(targets.ok_or_else(|| RatesError::missing("targets"))?)?;
        let span = tracing::info_span!(
            parent: &self.span,
            "rates.convert",
            base = %base,
            targets = %targets.join(","),
            amount = %amount
        );

        let key = convert_key(&base, &targets, amount);
        self.read_through(key, self.ttls.convert, move |provider| async move {
            provider.convert(&base, Some(targets.as_slice()), amount).await
        })
        .instrument(span)
        .await
    }

    /// Daily rates for `start..=end`, fully materialized.
    pub async fn get_historical(
        &self,
        base: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Arc<HistoricalSeries>, RatesError> {
        let base = canonical_code(base, "baseCurrency")?;
        if end < start {
            return Err(RatesError::InvalidArgument(format!(
                "end date {} is before start date {}",
                end, start
            )));
        }
        let span = tracing::info_span!(
            parent: &self.span,
            "rates.get_historical",
            base = %base,
            start = %start,
            end = %end
        );

        let key = history_key(&base, start, end);
        self.read_through(key, self.ttls.history, move |provider| async move {
            let series = provider.get_historical(&base, start, end).await?;
            Ok(series.collect::<HistoricalSeries>())
        })
        .instrument(span)
        .await
    }

    /// Returns the cached value for `key`, or selects a provider, runs
    /// `fetch` and stores the result for `ttl`.
    ///
    /// Concurrent misses on one key share a single `fetch`. Population runs
    /// on its own task so a caller that goes away does not abort it for the
    /// others. Failures are handed to every waiter and never stored.
    async fn read_through<T, F, Fut>(
        &self,
        key: String,
        ttl: Duration,
        fetch: F,
    ) -> Result<Arc<T>, RatesError>
    where
        T: CachedValue,
        F: FnOnce(Arc<dyn CurrencyProvider>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, RatesError>> + Send + 'static,
    {
        if let Some(entry) = self.cache.get(&key).await {
            tracing::debug!(key = %key, "Cache hit");
            return unwrap_entry(&key, entry);
        }
        tracing::debug!(key = %key, "Cache miss");

        let cache = self.cache.clone();
        let selector = Arc::clone(&self.selector);
        let preferred = self.preferred;
        let task_key = key.clone();

        let population = async move {
            cache
                .try_get_with(task_key, async move {
                    let provider = selector.provider_of(preferred)?;
                    let started = std::time::Instant::now();
                    let value = fetch(Arc::clone(&provider)).await?;
                    tracing::info!(
                        provider = provider.name(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Fetched from provider"
                    );
                    Ok::<_, RatesError>(CacheEntry {
                        value: value.into_cached(),
                        ttl,
                    })
                })
                .await
        }
        .in_current_span();

        let entry = match tokio::spawn(population).await {
            Ok(Ok(entry)) => entry,
            Ok(Err(err)) => {
                tracing::warn!(key = %key, error = %err, "Cache population failed");
                return Err(RatesError::clone(&err));
            }
            Err(join_err) if join_err.is_panic() => {
                std::panic::resume_unwind(join_err.into_panic())
            }
            Err(join_err) => {
                return Err(RatesError::Internal(format!(
                    "cache population for {} was aborted: {}",
                    key, join_err
                )));
            }
        };
        unwrap_entry(&key, entry)
    }
}

fn unwrap_entry<T: CachedValue>(key: &str, entry: CacheEntry) -> Result<Arc<T>, RatesError> {
    T::from_cached(entry.value)
        .ok_or_else(|| RatesError::Internal(format!("cache entry {} holds the wrong kind", key)))
}
