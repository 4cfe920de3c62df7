//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use fx_types::{
    ConversionResponse, ConvertQuery, DailyRates, ErrorResponse, HealthResponse,
    HistoricalRatesResponse, HistoryQuery, LatestRatesQuery, LatestRatesResponse, MeResponse,
    TokenRequest, TokenResponse,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};

// Dummy functions to generate path documentation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
async fn health() {}

/// Issue an access token for a client id and API key
#[utoipa::path(
    post,
    path = "/api/v1/auth/token",
    tag = "auth",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Invalid request body", body = ErrorResponse),
        (status = 401, description = "Invalid API key", body = ErrorResponse)
    )
)]
async fn issue_token() {}

/// Identity behind the presented token
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current identity", body = MeResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
async fn me() {}

/// Latest rates for a base currency
#[utoipa::path(
    get,
    path = "/api/v1/rates/latest",
    tag = "rates",
    params(LatestRatesQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Latest rates", body = LatestRatesResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Role User or Admin required", body = ErrorResponse),
        (status = 502, description = "Upstream answered with an unreadable body", body = ErrorResponse),
        (status = 503, description = "Upstream unavailable", body = ErrorResponse)
    )
)]
async fn latest() {}

/// Convert an amount into a target currency
#[utoipa::path(
    get,
    path = "/api/v1/rates/convert",
    tag = "rates",
    params(ConvertQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Converted amount", body = ConversionResponse),
        (status = 400, description = "Validation failed or target unavailable", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Role User or Admin required", body = ErrorResponse),
        (status = 503, description = "Upstream unavailable", body = ErrorResponse)
    )
)]
async fn convert() {}

/// Paginated daily rates for a date range (admin only)
#[utoipa::path(
    get,
    path = "/api/v1/rates/history",
    tag = "rates",
    params(HistoryQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "One page of the series", body = HistoricalRatesResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Role Admin required", body = ErrorResponse),
        (status = 503, description = "Upstream unavailable", body = ErrorResponse)
    )
)]
async fn history() {}

/// OpenAPI documentation for the Currency Rates API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Currency Rates API",
        version = "1.0.0",
        description = "Latest, converted and historical exchange rates served through a read-through cache.\n\n## Authentication\n\nRequest a token from `POST /api/v1/auth/token` with your client id and API key, then send it in the `Authorization` header:\n\n```\nAuthorization: Bearer <accessToken>\n```\n\nClient ids containing `admin` also receive the Admin role required by `/api/v1/rates/history`.",
        license(name = "MIT"),
    ),
    paths(health, issue_token, me, latest, convert, history),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            TokenRequest,
            TokenResponse,
            MeResponse,
            LatestRatesResponse,
            ConversionResponse,
            HistoricalRatesResponse,
            DailyRates,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Token issuance and identity"),
        (name = "rates", description = "Latest, converted and historical rates"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for Bearer token authentication.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/v1/auth/token",
            "/api/v1/auth/me",
            "/api/v1/rates/latest",
            "/api/v1/rates/convert",
            "/api/v1/rates/history",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn test_bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
