//! HTTP Server configuration and startup.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use fx_types::ProviderSelector;

use super::auth::{TOKEN_PATH, TokenService, auth_middleware};
use super::handlers::{self, AppState};
use super::rate_limit::{RateLimitSettings, RateLimiterState, rate_limit_middleware};
use crate::CachedRateService;
use crate::openapi::ApiDoc;

/// HTTP Server for the Currency Rates API.
pub struct HttpServer<S: ProviderSelector> {
    state: Arc<AppState<S>>,
    rate_limiter: Arc<RateLimiterState>,
}

impl<S: ProviderSelector> HttpServer<S> {
    pub fn new(
        service: CachedRateService<S>,
        tokens: TokenService,
        rate_limit: RateLimitSettings,
    ) -> Self {
        Self {
            state: Arc::new(AppState {
                service,
                tokens: Arc::new(tokens),
            }),
            rate_limiter: Arc::new(RateLimiterState::new(rate_limit)),
        }
    }

    /// Builds the Axum router with all routes.
    ///
    /// Requests pass the rate limiter before authentication, so rejected
    /// tokens still consume quota.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route(
                "/api-docs/openapi.json",
                get(|| async { Json(ApiDoc::openapi()) }),
            )
            .route(TOKEN_PATH, post(handlers::issue_token::<S>))
            .route("/api/v1/auth/me", get(handlers::me))
            .route("/api/v1/rates/latest", get(handlers::latest::<S>))
            .route("/api/v1/rates/convert", get(handlers::convert::<S>))
            .route("/api/v1/rates/history", get(handlers::history::<S>))
            .layer(middleware::from_fn_with_state(
                self.state.tokens.clone(),
                auth_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
