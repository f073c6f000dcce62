//! Delicious - store directory site.
//!
//! This binary serves the site and its JSON API on port 7777.
//!
//! # Architecture
//!
//! - Axum web framework, Askama templates for server-side rendering
//! - `PostgreSQL` with `PostGIS` for stores, reviews, users and sessions
//! - An in-memory backend (`DELICIOUS_STORAGE=memory`) for local work
//! - Store photos written to the uploads directory and served from `/uploads`

#![cfg_attr(not(test), forbid(unsafe_code))]

use delicious_web::config::{StorageBackend, WebConfig};
use delicious_web::db::{self, Repositories};
use delicious_web::middleware::create_session_layer;
use delicious_web::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tower_sessions::MemoryStore;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &WebConfig) -> Option<sentry::ClientInitGuard> {
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

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (needed for Sentry init)
    let config = WebConfig::from_env()?;

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "delicious_web=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    tokio::fs::create_dir_all(&config.uploads_dir).await?;

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p delicious-cli -- migrate
    let app = match (config.storage, &config.database_url) {
        (StorageBackend::Postgres, Some(database_url)) => {
            let pool = db::create_pool(database_url).await?;
            tracing::info!("Database pool created");

            let session_layer = create_session_layer(PostgresStore::new(pool.clone()), &config);
            let state = AppState::new(config.clone(), Repositories::postgres(pool));
            delicious_web::app(state, session_layer)
        }
        (StorageBackend::Postgres, None) => {
            return Err("postgres storage selected without a database URL".into());
        }
        (StorageBackend::Memory, _) => {
            tracing::warn!("Using in-memory storage; data is lost on restart");

            let session_layer = create_session_layer(MemoryStore::default(), &config);
            let state = AppState::new(config.clone(), Repositories::memory());
            delicious_web::app(state, session_layer)
        }
    };

    let addr = config.socket_addr();
    tracing::info!("delicious listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
