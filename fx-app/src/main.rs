//! # Currency Rates Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Build the registered rate providers
//! - Create the cached rate service
//! - Start the HTTP server

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use opentelemetry::global;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fx_hex::inbound::{HttpServer, TokenService};
use fx_hex::{CachedRateService, ProviderFactory};
use fx_providers::{
    CircuitBreaker, FrankfurterProvider, ResilientClient, RetryPolicy, StaticRatesProvider,
};
use fx_types::{CurrencyProvider, ProviderType};

use config::Config;

/// Exported only when an OTLP endpoint is configured.
fn init_tracer() -> anyhow::Result<Option<(sdktrace::Tracer, sdktrace::SdkTracerProvider)>> {
    if std::env::var_os("OTEL_EXPORTER_OTLP_ENDPOINT").is_none() {
        return Ok(None);
    }
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()
        .context("failed to create OTLP span exporter")?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok(Some((provider.tracer("fx-rates-service"), provider)))
}

fn build_providers(config: &Config) -> anyhow::Result<Vec<Arc<dyn CurrencyProvider>>> {
    let mut providers: Vec<Arc<dyn CurrencyProvider>> = Vec::with_capacity(config.providers.len());
    for provider_type in &config.providers {
        match provider_type {
            ProviderType::Frankfurter => {
                let resilience = &config.resilience;
                let client = ResilientClient::new(
                    resilience.timeout,
                    RetryPolicy::new(resilience.max_retries, Duration::from_secs(1)),
                    CircuitBreaker::new(resilience.breaker_threshold, resilience.breaker_duration),
                )
                .context("failed to build HTTP client")?;
                let provider = FrankfurterProvider::new(&config.frankfurter_base_url, client)
                    .context("invalid FRANKFURTER_BASE_URL")?;
                providers.push(Arc::new(provider));
            }
            ProviderType::Static => providers.push(Arc::new(StaticRatesProvider::new())),
            ProviderType::Default => {
                anyhow::bail!("'default' is not a registrable provider")
            }
        }
        tracing::info!("Registered {} provider", provider_type);
    }
    Ok(providers)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize OpenTelemetry tracing
    let otel = init_tracer()?;
    let telemetry = otel
        .as_ref()
        .map(|(tracer, _)| tracing_opentelemetry::layer().with_tracer(tracer.clone()));

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fx_app=debug,fx_hex=debug,fx_providers=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry)
        .init();

    // Load configuration
    let config = Config::from_env().context("failed to load configuration")?;

    tracing::info!("Starting currency rates server on port {}", config.port);
    tracing::info!(
        providers = ?config.providers,
        preferred = %config.preferred_provider,
        "Provider configuration"
    );

    let factory = ProviderFactory::new(build_providers(&config)?)?;
    let service =
        CachedRateService::new(factory, config.cache).with_preferred(config.preferred_provider);
    let tokens = TokenService::new(config.jwt.clone());

    // Create and run the HTTP server
    let server = HttpServer::new(service, tokens, config.rate_limit);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    // Ensure traces are flushed before exit
    if let Some((_, provider)) = otel {
        let _ = provider.shutdown();
    }
    Ok(())
}
