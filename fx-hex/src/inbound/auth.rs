//! Bearer token issuance and authentication middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use fx_types::{AppError, TokenResponse};

pub const TOKEN_PATH: &str = "/api/v1/auth/token";

/// JWT and API key settings.
#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub api_key: String,
    pub expiration: Duration,
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            secret: "development-secret-key-change-in-production".into(),
            issuer: "CurrencyConverterApi".into(),
            audience: "CurrencyApiUsers".into(),
            api_key: "demo_api_key".into(),
            expiration: Duration::from_secs(60 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Admin => write!(f, "Admin"),
        }
    }
}

/// Authorization policies applied per route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Role `User` or `Admin`.
    User,
    /// Role `Admin`.
    Admin,
}

/// Access token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub client_id: String,
    pub jti: String,
    pub roles: Vec<Role>,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl Claims {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn satisfies(&self, policy: Policy) -> bool {
        match policy {
            Policy::User => self.has_role(Role::User) || self.has_role(Role::Admin),
            Policy::Admin => self.has_role(Role::Admin),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing or invalid Authorization header")]
    MissingToken,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Could not sign token: {0}")]
    Signing(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Signing(msg) => AppError::Internal(msg),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

/// Fails with `Forbidden` unless `claims` satisfy `policy`.
pub fn require_policy(policy: Policy, claims: &Claims) -> Result<(), AppError> {
    if claims.satisfies(policy) {
        Ok(())
    } else {
        tracing::warn!(client_id = %claims.client_id, ?policy, "Access denied by policy");
        Err(AppError::Forbidden(format!(
            "{:?} policy requires a different role",
            policy
        )))
    }
}

/// Issues and verifies HS256 access tokens.
pub struct TokenService {
    settings: JwtSettings,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(settings: JwtSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_audience(&[settings.audience.as_str()]);
        validation.validate_nbf = true;

        Self {
            encoding: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            settings,
        }
    }

    /// Constant-time comparison against the configured API key.
    pub fn verify_api_key(&self, presented: &str) -> bool {
        presented
            .as_bytes()
            .ct_eq(self.settings.api_key.as_bytes())
            .into()
    }

    /// Exchanges a valid API key for an access token.
    pub fn login(&self, client_id: &str, api_key: &str) -> Result<TokenResponse, AuthError> {
        if !self.verify_api_key(api_key) {
            tracing::warn!(client_id = %client_id, "Rejected token request with invalid API key");
            return Err(AuthError::InvalidApiKey);
        }
        self.issue(client_id)
    }

    pub fn issue(&self, client_id: &str) -> Result<TokenResponse, AuthError> {
        let issued_at = Utc::now();
        let lifetime = chrono::Duration::from_std(self.settings.expiration)
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        let expires_at = issued_at + lifetime;

        let mut roles = vec![Role::User];
        if client_id.to_lowercase().contains("admin") {
            roles.push(Role::Admin);
        }

        let claims = Claims {
            sub: client_id.to_string(),
            client_id: client_id.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            roles,
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
            iat: issued_at.timestamp(),
            nbf: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        tracing::info!(client_id = %client_id, roles = ?claims.roles, "Issued access token");
        Ok(TokenResponse {
            access_token: token,
            token_type: "Bearer".into(),
            expires_in: lifetime.num_seconds(),
            issued_at,
            expires_at,
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }
}

/// Extracts the token from a `Bearer <token>` header value.
fn extract_bearer(auth_header: Option<&str>) -> Option<&str> {
    auth_header?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn is_public(method: &Method, path: &str) -> bool {
    path == "/health"
        || path.starts_with("/api-docs")
        || (path == TOKEN_PATH && method == Method::POST)
}

/// Authentication middleware that validates bearer tokens.
///
/// On success the verified [`Claims`] are added to the request extensions.
///
/// Endpoints that bypass authentication:
/// - `/health` - Health check endpoint
/// - `/api-docs/*` - OpenAPI document
/// - `POST /api/v1/auth/token` - Token issuance
pub async fn auth_middleware(
    State(tokens): State<Arc<TokenService>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if is_public(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let Some(token) = extract_bearer(auth_header) else {
        return unauthorized_response(&AuthError::MissingToken);
    };

    match tokens.verify(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(path = %request.uri().path(), "Token rejected: {}", err);
            unauthorized_response(&err)
        }
    }
}

fn unauthorized_response(err: &AuthError) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": err.to_string(),
            "code": 401
        })),
    )
        .into_response()
}
