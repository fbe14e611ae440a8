//! Device warranty server.
//!
//! Serves the account/device/passport API on `DW_HOST:DW_PORT`.
//!
//! # Storage
//!
//! `DW_STORAGE=postgres` (default) needs `DW_DATABASE_URL`; migrations are
//! NOT run on startup, use `dw-cli migrate`. `DW_STORAGE=memory` keeps
//! everything in process and starts empty.

#![cfg_attr(not(test), forbid(unsafe_code))]

use device_warranty_server::config::{ServerConfig, StorageBackend};
use device_warranty_server::db::{self, Stores};
use device_warranty_server::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ServerConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

async fn build_state(config: ServerConfig) -> Result<AppState, Box<dyn std::error::Error>> {
    match (config.storage, config.database_url.clone()) {
        (StorageBackend::Postgres, Some(url)) => {
            let pool = db::create_pool(&url).await?;
            tracing::info!("Database pool created");
            Ok(AppState::with_pool(config, pool))
        }
        (StorageBackend::Postgres, None) => Err("DW_DATABASE_URL is required for postgres storage".into()),
        (StorageBackend::Memory, _) => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            Ok(AppState::with_stores(config, Stores::memory()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (needed for Sentry init)
    let config = ServerConfig::from_env()?;

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "device_warranty_server=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let addr = config.socket_addr();
    let state = build_state(config).await?;
    let app = device_warranty_server::app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("device-warranty-server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
