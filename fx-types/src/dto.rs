//! Data Transfer Objects (DTOs) for requests and responses.
//!
//! JSON bodies use camelCase. Query structs keep every field as an
//! optional string so that binding never fails before validation can
//! report per-field errors.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{DailyRates, RateSnapshot};

// ─────────────────────────────────────────────────────────────────────────────
// Rates DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Query for `GET /api/v1/rates/latest`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LatestRatesQuery {
    /// Three-letter base currency code
    #[param(example = "USD")]
    pub base_currency: Option<String>,
}

/// Latest rates for a base currency.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LatestRatesResponse {
    #[schema(example = "USD")]
    pub base: String,
    pub date: DateTime<Utc>,
    #[schema(value_type = Object)]
    pub rates: RateSnapshot,
}

/// Query for `GET /api/v1/rates/convert`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ConvertQuery {
    #[param(example = "USD")]
    pub base_currency: Option<String>,
    #[param(example = "EUR")]
    pub target_currency: Option<String>,
    /// Positive decimal amount in the base currency
    #[param(example = "100")]
    pub amount: Option<String>,
}

/// Result of converting an amount into a single target currency.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    #[schema(example = "USD")]
    pub base: String,
    #[schema(example = "EUR")]
    pub target: String,
    #[schema(value_type = f64, example = 100)]
    pub amount: Decimal,
    #[schema(value_type = f64, example = 92.1)]
    pub converted_amount: Decimal,
    pub date: DateTime<Utc>,
}

/// Query for `GET /api/v1/rates/history`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    #[param(example = "USD")]
    pub base_currency: Option<String>,
    /// First day, `YYYY-MM-DD` or RFC 3339
    #[param(example = "2024-01-01")]
    pub start: Option<String>,
    /// Last day, inclusive
    #[param(example = "2024-01-31")]
    pub end: Option<String>,
    /// 1-based page number (default 1)
    pub page: Option<String>,
    /// Items per page, 1..=100 (default 10)
    pub page_size: Option<String>,
}

/// One page of a historical series.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalRatesResponse {
    #[schema(example = "USD")]
    pub base: String,
    #[schema(value_type = String, example = "2024-01-01")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, example = "2024-01-31")]
    pub end_date: NaiveDate,
    pub page: u32,
    pub page_size: u32,
    pub total_items: usize,
    pub total_pages: usize,
    pub data: Vec<DailyRates>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Body of `POST /api/v1/auth/token`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    #[schema(example = "demo-client")]
    pub client_id: Option<String>,
    #[schema(example = "demo_api_key")]
    pub api_key: Option<String>,
}

/// Issued bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Lifetime in seconds
    #[schema(example = 3600)]
    pub expires_in: i64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Identity behind the presented token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub client_id: String,
    pub roles: Vec<String>,
    pub is_authenticated: bool,
    pub expires_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Common
// ─────────────────────────────────────────────────────────────────────────────

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub errors: Option<crate::error::FieldErrors>,
}
