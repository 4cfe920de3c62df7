//! Configuration loading from environment.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};

use fx_hex::CacheTtls;
use fx_hex::inbound::{JwtSettings, RateLimitSettings};
use fx_providers::frankfurter::DEFAULT_BASE_URL;
use fx_types::ProviderType;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;

/// Upstream resilience knobs for the Frankfurter client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResilienceConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub breaker_threshold: u32,
    pub breaker_duration: Duration,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Registration order; the first entry is the default provider.
    pub providers: Vec<ProviderType>,
    pub preferred_provider: ProviderType,
    pub frankfurter_base_url: String,
    pub resilience: ResilienceConfig,
    pub cache: CacheTtls,
    pub rate_limit: RateLimitSettings,
    pub jwt: JwtSettings,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// unset or blank variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_defaults = JwtSettings::default();
        let jwt = JwtSettings {
            secret: get("JWT_SECRET_KEY").unwrap_or(jwt_defaults.secret),
            issuer: get("JWT_ISSUER").unwrap_or(jwt_defaults.issuer),
            audience: get("JWT_AUDIENCE").unwrap_or(jwt_defaults.audience),
            api_key: get("JWT_API_KEY").unwrap_or(jwt_defaults.api_key),
            expiration: duration_env(&get, "JWT_EXPIRATION_MINUTES", 60, MINUTE)?,
        };

        Ok(Self {
            port: env_or(&get, "PORT", 3000)?,
            providers: parse_providers(
                get("RATES_PROVIDERS").as_deref().unwrap_or("frankfurter"),
            )?,
            preferred_provider: env_or(&get, "RATES_PREFERRED_PROVIDER", ProviderType::Default)?,
            frankfurter_base_url: get("FRANKFURTER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            resilience: ResilienceConfig {
                timeout: duration_env(&get, "API_TIMEOUT_SECONDS", 30, 1)?,
                max_retries: env_or(&get, "RETRY_MAX_ATTEMPTS", 3)?,
                breaker_threshold: env_or(&get, "CIRCUIT_BREAKER_THRESHOLD", 5)?,
                breaker_duration: duration_env(
                    &get,
                    "CIRCUIT_BREAKER_DURATION_MINUTES",
                    1,
                    MINUTE,
                )?,
            },
            cache: CacheTtls {
                latest: duration_env(&get, "CACHE_LATEST_TTL_MINUTES", 30, MINUTE)?,
                convert: duration_env(&get, "CACHE_CONVERT_TTL_MINUTES", 30, MINUTE)?,
                history: duration_env(&get, "CACHE_HISTORY_TTL_HOURS", 6, HOUR)?,
                max_entries: env_or(&get, "CACHE_MAX_ENTRIES", 10_000)?,
            },
            rate_limit: RateLimitSettings {
                token_limit: env_or(&get, "RATE_LIMIT_TOKEN_LIMIT", 100)?,
                tokens_per_period: env_or(&get, "RATE_LIMIT_TOKENS_PER_PERIOD", 100)?,
                replenishment_period: duration_env(
                    &get,
                    "RATE_LIMIT_REPLENISH_MINUTES",
                    1,
                    MINUTE,
                )?,
            },
            jwt,
        })
    }
}

/// Reads a count of `unit_secs`-second units as a duration.
fn duration_env(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
    unit_secs: u64,
) -> anyhow::Result<Duration> {
    let count: u64 = env_or(get, key, default)?;
    count
        .checked_mul(unit_secs)
        .map(Duration::from_secs)
        .with_context(|| format!("value {} for {} is out of range", count, key))
}

fn env_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("invalid value {:?} for {}", raw, key)),
    }
}

fn parse_providers(raw: &str) -> anyhow::Result<Vec<ProviderType>> {
    let mut providers = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let provider: ProviderType = name
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .context("invalid RATES_PROVIDERS entry")?;
        if provider == ProviderType::Default {
            bail!("RATES_PROVIDERS entries must name a concrete provider, got 'default'");
        }
        providers.push(provider);
    }
    if providers.is_empty() {
        bail!("RATES_PROVIDERS must name at least one provider");
    }
    Ok(providers)
}
