//! Agora Engine
//!
//! Feed assembly and destination resolution for the Agora social marketplace.
//!
//! # Architecture
//!
//! - **Entity Store**: PostgreSQL behind a per-call deadline
//! - **Feed Engine**: network tier plus deduplicated discovery tier
//! - **API Server**: REST endpoints for the gateway
//!
//! # Graceful Shutdown
//!
//! SIGTERM and SIGINT stop accepting connections, let in-flight requests
//! finish, then close the database pool.

use agora::api::{self, AppState};
use agora::config::Config;
use agora::database::{self, Database};
use agora::error::Result;
use agora::feed::FeedOptions;
use agora::store::{EntityStore, TimeoutStore};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Agora Engine v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let db = Database::new(&config.database).await?;
    info!("Database connection pool established");

    if config.database.run_migrations {
        database::run_migrations(db.pool()).await?;
    } else {
        info!("Skipping migrations (DB_RUN_MIGRATIONS=false)");
    }

    init_metrics(&config);

    let store: Arc<dyn EntityStore> = Arc::new(TimeoutStore::new(
        Arc::new(db.store()),
        config.feed.query_timeout,
    ));
    let state = Arc::new(AppState::new(store, FeedOptions::from(&config.feed)));

    info!(
        "Health: http://{}:{}/health",
        config.api.host, config.api.port
    );
    api::start_server(state, &config, shutdown_signal()).await?;

    db.close().await;
    info!("Agora Engine stopped gracefully");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("agora_engine=debug,agora=debug,tower_http=debug,sqlx=warn,info")
    });

    let json = std::env::var("LOG_FORMAT").map_or(false, |v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_ansi(std::env::var("NO_COLOR").is_err()),
            )
            .init();
    }
}

#[cfg(feature = "prometheus")]
fn init_metrics(config: &Config) {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let Some(addr) = config.feed.metrics_addr.as_deref() else {
        info!("METRICS_ADDR not set, Prometheus exporter disabled");
        return;
    };

    match addr.parse::<std::net::SocketAddr>() {
        Ok(socket) => match PrometheusBuilder::new().with_http_listener(socket).install() {
            Ok(()) => info!("Prometheus exporter listening on {}", socket),
            Err(e) => warn!("Failed to install Prometheus exporter: {}", e),
        },
        Err(e) => warn!("Invalid METRICS_ADDR {}: {}", addr, e),
    }
}

#[cfg(not(feature = "prometheus"))]
fn init_metrics(config: &Config) {
    if config.feed.metrics_addr.is_some() {
        warn!("METRICS_ADDR is set but the prometheus feature is not compiled in");
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
    info!("Shutdown signal received");
}
