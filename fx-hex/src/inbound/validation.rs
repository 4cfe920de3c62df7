//! Request validation.
//!
//! Every rule runs and failures are collected per field, so a single 400
//! response lists everything wrong with the request.

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;

use fx_types::{
    AppError, ConvertQuery, FieldErrors, HistoryQuery, LatestRatesQuery, TokenRequest,
    normalize_code,
};

/// Currencies the conversion endpoint refuses to handle.
pub const EXCLUDED_CURRENCIES: [&str; 4] = ["TRY", "PLN", "THB", "MXN"];

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Default)]
struct Collector {
    errors: FieldErrors,
}

impl Collector {
    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, AppError> {
        if self.errors.is_empty() {
            Ok(value())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }

    /// Three ASCII letters. Returns the uppercased code when valid.
    fn currency(&mut self, field: &str, label: &str, value: Option<&str>) -> Option<String> {
        let raw = value.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            self.add(field, format!("{} is required.", label));
            return None;
        }
        let mut ok = true;
        if raw.chars().count() != 3 {
            self.add(field, format!("{} must be 3 characters long.", label));
            ok = false;
        }
        if !raw.chars().all(|c| c.is_ascii_alphabetic()) {
            self.add(field, format!("{} must contain only characters.", label));
            ok = false;
        }
        ok.then(|| normalize_code(raw))
    }

    fn date(&mut self, field: &str, label: &str, value: Option<&str>) -> Option<NaiveDate> {
        let raw = value.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            self.add(field, format!("{} is required.", label));
            return None;
        }
        match parse_date(raw) {
            Some(date) => Some(date),
            None => {
                self.add(field, format!("{} must be a date (YYYY-MM-DD).", label));
                None
            }
        }
    }

    fn number(&mut self, field: &str, value: Option<&str>, default: u32) -> Option<i64> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => Some(default as i64),
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) => Some(n),
                Err(_) => {
                    self.add(field, format!("'{}' is not a valid number.", raw));
                    None
                }
            },
        }
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (time ignored).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Endpoints
// ─────────────────────────────────────────────────────────────────────────────

pub fn latest(query: &LatestRatesQuery) -> Result<String, AppError> {
    let mut v = Collector::default();
    let base = v.currency("baseCurrency", "Base currency", query.base_currency.as_deref());
    v.finish(|| base.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertParams {
    pub base: String,
    pub target: String,
    pub amount: Decimal,
}

pub fn convert(query: &ConvertQuery) -> Result<ConvertParams, AppError> {
    let mut v = Collector::default();

    let base = v.currency("baseCurrency", "Base currency", query.base_currency.as_deref());
    let target = v.currency(
        "targetCurrency",
        "Target currency",
        query.target_currency.as_deref(),
    );
    for (field, label, code) in [
        ("baseCurrency", "Base currency", &base),
        ("targetCurrency", "Target currency", &target),
    ] {
        if let Some(code) = code.as_deref().filter(|c| EXCLUDED_CURRENCIES.contains(c)) {
            v.add(field, format!("{} '{}' is not supported.", label, code));
        }
    }

    let amount = match query.amount.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        None => {
            v.add("amount", "Amount is required.");
            None
        }
        Some(raw) => match raw.parse::<Decimal>() {
            Ok(amount) if amount > Decimal::ZERO => Some(amount),
            Ok(_) => {
                v.add("amount", "Amount must be greater than zero.");
                None
            }
            Err(_) => {
                v.add("amount", format!("'{}' is not a valid amount.", raw));
                None
            }
        },
    };

    if let (Some(b), Some(t)) = (&base, &target) {
        if b == t {
            v.add(
                "targetCurrency",
                "Base currency and target currency cannot be the same.",
            );
        }
    }

    v.finish(|| ConvertParams {
        base: base.unwrap_or_default(),
        target: target.unwrap_or_default(),
        amount: amount.unwrap_or_default(),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryParams {
    pub base: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub page: u32,
    pub page_size: u32,
}

/// `today` is the current UTC date; neither bound may be after it.
pub fn history(query: &HistoryQuery, today: NaiveDate) -> Result<HistoryParams, AppError> {
    let mut v = Collector::default();

    let base = v.currency("baseCurrency", "Base currency", query.base_currency.as_deref());
    let start = v.date("start", "Start date", query.start.as_deref());
    let end = v.date("end", "End date", query.end.as_deref());

    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            v.add("start", "Start date must be before or same as end date.");
            v.add("end", "End date must be after or same as start date.");
        }
    }
    if start.is_some_and(|s| s > today) {
        v.add("start", "Start date cannot be in the future.");
    }
    if end.is_some_and(|e| e > today) {
        v.add("end", "End date cannot be in the future.");
    }

    let page = v.number("page", query.page.as_deref(), DEFAULT_PAGE);
    if page.is_some_and(|p| p < 1) {
        v.add("page", "Page number must be greater than zero.");
    }
    if page.is_some_and(|p| p > u32::MAX as i64) {
        v.add("page", format!("Page number must be at most {}.", u32::MAX));
    }
    let page_size = v.number("pageSize", query.page_size.as_deref(), DEFAULT_PAGE_SIZE);
    if page_size.is_some_and(|s| s < 1 || s > MAX_PAGE_SIZE as i64) {
        v.add("pageSize", "Page size must be between 1 and 100.");
    }

    v.finish(|| HistoryParams {
        base: base.unwrap_or_default(),
        start: start.unwrap_or_default(),
        end: end.unwrap_or_default(),
        page: page.and_then(|p| u32::try_from(p).ok()).unwrap_or(DEFAULT_PAGE),
        page_size: page_size
            .and_then(|s| u32::try_from(s).ok())
            .unwrap_or(DEFAULT_PAGE_SIZE),
    })
}

pub fn login(request: &TokenRequest) -> Result<(String, String), AppError> {
    let mut v = Collector::default();

    let client_id = request.client_id.as_deref().map(str::trim).unwrap_or_default();
    if client_id.is_empty() {
        v.add("clientId", "Client ID is required.");
    } else if client_id.chars().count() > 50 {
        v.add("clientId", "Client ID cannot be longer than 50 characters.");
    }

    let api_key = request.api_key.as_deref().unwrap_or_default();
    let key_len = api_key.chars().count();
    if api_key.trim().is_empty() {
        v.add("apiKey", "API key is required.");
    } else if key_len < 10 {
        v.add("apiKey", "API key must be at least 10 characters long.");
    } else if key_len > 100 {
        v.add("apiKey", "API key cannot be longer than 100 characters.");
    }

    v.finish(|| (client_id.to_string(), api_key.to_string()))
}
