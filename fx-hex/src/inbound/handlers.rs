//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use fx_types::{
    AppError, ConversionResponse, ConvertQuery, ErrorResponse, HealthResponse,
    HistoricalRatesResponse, HistoryQuery, LatestRatesQuery, LatestRatesResponse, MeResponse,
    ProviderSelector, TokenRequest,
};

use super::auth::{Claims, Policy, TokenService, require_policy};
use super::validation;
use crate::CachedRateService;

/// Application state shared across handlers.
pub struct AppState<S: ProviderSelector> {
    pub service: CachedRateService<S>,
    pub tokens: Arc<TokenService>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl<E: Into<AppError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "One or more validation errors occurred.".to_string(),
                Some(errors),
            ),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg, None),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg, None),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed: {}", message);
        }

        let body = ErrorResponse {
            error: message,
            code: status.as_u16(),
            errors,
        };
        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".into(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

/// Exchanges `{clientId, apiKey}` for a bearer token.
#[tracing::instrument(skip(state, req), fields(client_id = ?req.client_id))]
pub async fn issue_token<S: ProviderSelector>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<TokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (client_id, api_key) = validation::login(&req)?;
    let token = state.tokens.login(&client_id, &api_key)?;
    Ok(Json(token))
}

/// Identity behind the presented token.
#[tracing::instrument(skip_all, fields(client_id = %claims.client_id))]
pub async fn me(Extension(claims): Extension<Claims>) -> impl IntoResponse {
    Json(MeResponse {
        client_id: claims.client_id.clone(),
        roles: claims.roles.iter().map(ToString::to_string).collect(),
        is_authenticated: true,
        expires_at: claims.expires_at(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Rates
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state, claims), fields(client_id = %claims.client_id))]
pub async fn latest<S: ProviderSelector>(
    State(state): State<Arc<AppState<S>>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<LatestRatesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require_policy(Policy::User, &claims)?;
    let base = validation::latest(&query)?;

    let rates = state.service.get_latest(&base).await?;
    Ok(Json(LatestRatesResponse {
        base,
        date: Utc::now(),
        rates: (*rates).clone(),
    }))
}

#[tracing::instrument(skip(state, claims), fields(client_id = %claims.client_id))]
pub async fn convert<S: ProviderSelector>(
    State(state): State<Arc<AppState<S>>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ConvertQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require_policy(Policy::User, &claims)?;
    let params = validation::convert(&query)?;

    let targets = [params.target.clone()];
    let converted = state
        .service
        .convert(&params.base, Some(targets.as_slice()), params.amount)
        .await?;

    let Some(converted_amount) = converted.get(&params.target).copied() else {
        tracing::warn!(
            base = %params.base,
            target = %params.target,
            "Conversion result is missing the target currency"
        );
        return Err(AppError::BadRequest(format!(
            "Conversion from {} to {} is not available",
            params.base, params.target
        ))
        .into());
    };

    Ok(Json(ConversionResponse {
        base: params.base,
        target: params.target,
        amount: params.amount,
        converted_amount,
        date: Utc::now(),
    }))
}

#[tracing::instrument(skip(state, claims), fields(client_id = %claims.client_id))]
pub async fn history<S: ProviderSelector>(
    State(state): State<Arc<AppState<S>>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    require_policy(Policy::Admin, &claims)?;
    let params = validation::history(&query, Utc::now().date_naive())?;

    let series = state
        .service
        .get_historical(&params.base, params.start, params.end)
        .await?;

    let page_size = params.page_size as usize;
    let total_items = series.len();
    let total_pages = total_items.div_ceil(page_size);
    let data = series
        .iter()
        .skip((params.page as usize - 1).saturating_mul(page_size))
        .take(page_size)
        .cloned()
        .collect();

    Ok(Json(HistoricalRatesResponse {
        base: params.base,
        start_date: params.start,
        end_date: params.end,
        page: params.page,
        page_size: params.page_size,
        total_items,
        total_pages,
        data,
    }))
}
