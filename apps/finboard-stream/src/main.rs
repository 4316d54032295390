//! Finboard Stream Binary
//!
//! Opens the dashboard, connects the Finnhub trade stream for every live
//! widget symbol, and serves health and metrics until shutdown.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin finboard-stream
//! ```
//!
//! # Environment Variables
//!
//! - `FINNHUB_API_KEY`: Finnhub API key (default: demo, synthetic quotes only)
//! - `FINBOARD_WS_URL`: Trade stream endpoint (default: wss://ws.finnhub.io)
//! - `FINBOARD_REST_URL`: REST base URL (default: <https://finnhub.io/api/v1>)
//! - `FINBOARD_RECONNECT_DELAY_MS`: Delay between reconnects (default: 3000)
//! - `FINBOARD_MAX_RECONNECT_ATTEMPTS`: Reconnect budget, 0 = unlimited (default: 5)
//! - `FINBOARD_SETTLE_DELAY_MS`: Wait before replaying subscriptions (default: 100)
//! - `FINBOARD_CACHE_TTL_SECS`: Quote cache lifetime (default: 60)
//! - `FINBOARD_HTTP_TIMEOUT_SECS`: REST request timeout (default: 5)
//! - `FINBOARD_HEALTH_PORT`: Health check HTTP port (default: 8083)
//! - `FINBOARD_DASHBOARD_PATH`: Dashboard JSON file (default: finboard-dashboard.json)
//! - `FINBOARD_TEMPLATE`: Template loaded into an empty dashboard
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use finboard_stream::domain::format::{format_currency, format_percent};
use finboard_stream::infrastructure::storage::JsonFileStorage;
use finboard_stream::infrastructure::telemetry;
use finboard_stream::{
    AppConfig, DashboardStore, HealthServer, HealthServerState, QuoteService, StreamManager,
    SubscriptionHandle, WebSocketTransport, init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        return Err("failed to install rustls crypto provider".into());
    }

    load_dotenv();

    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Finboard Stream");

    if let Err(e) = init_metrics() {
        tracing::warn!(error = %e, "Prometheus metrics unavailable");
    }

    let config = AppConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Dashboard
    let storage = Arc::new(JsonFileStorage::new(config.dashboard.path.clone()));
    let dashboard = DashboardStore::open(storage)?;
    if dashboard.widgets().is_empty()
        && let Some(template) = &config.dashboard.template
    {
        let widgets = dashboard.load_template(template)?;
        tracing::info!(template = %template, widgets = widgets.len(), "Loaded dashboard template");
    }
    let symbols = dashboard.live_symbols();

    // Quotes
    let quotes = QuoteService::new(config.quote_service_config())?;
    for quote in quotes.quotes(&symbols).await {
        tracing::info!(
            symbol = %quote.symbol,
            price = %format_currency(quote.quote.current),
            change = %format_percent(decimal_to_f64(quote.quote.percent_change)),
            "Opening quote"
        );
    }

    // Trade stream
    let transport = Arc::new(WebSocketTransport::new(config.feed.ws_url.clone()));
    let manager = StreamManager::spawn(config.stream_config(), transport, shutdown_token.clone());
    let _subscriptions: Vec<SubscriptionHandle> = symbols
        .iter()
        .map(|symbol| {
            manager.subscribe(symbol.clone(), |trade| {
                tracing::info!(
                    symbol = %trade.symbol,
                    price = %format_currency(trade.price),
                    volume = %trade.volume,
                    "Trade"
                );
                Ok(())
            })
        })
        .collect();

    if config.token.is_placeholder() {
        tracing::warn!("No Finnhub API key configured; the trade stream will likely be rejected");
    }
    manager.connect(config.token.expose());

    // Health server
    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        manager.clone(),
    ));
    let health_server = HealthServer::new(
        config.server.health_port,
        health_state,
        shutdown_token.clone(),
    );
    tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    });

    tracing::info!(symbols = symbols.len(), "Finboard Stream ready");

    await_shutdown(shutdown_token).await;
    manager.disconnect();

    tracing::info!("Finboard Stream stopped");
    Ok(())
}

fn decimal_to_f64(value: rust_decimal::Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    value.to_f64().unwrap_or_default()
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &AppConfig) {
    tracing::info!(
        ws_url = %config.feed.ws_url,
        rest_url = %config.quotes.rest_url,
        health_port = config.server.health_port,
        dashboard = %config.dashboard.path.display(),
        synthetic_quotes = config.token.is_placeholder(),
        "Configuration loaded"
    );
    tracing::debug!(
        reconnect_delay_ms = config.feed.reconnect_delay.as_millis(),
        max_reconnect_attempts = config.feed.max_reconnect_attempts,
        settle_delay_ms = config.feed.settle_delay.as_millis(),
        "Reconnect policy"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
