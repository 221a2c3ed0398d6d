//! services/web/src/bin/web.rs

use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use web_lib::{
    adapters::{DbAdapter, LoggingWebhookAdapter},
    config::{Config, Environment},
    error::ApiError,
    web::{
        access_log::{AccessLog, AccessLogFile},
        build_app,
        rate_limit::{RateLimiter, SystemClock, RATE_LIMIT_MAX, RATE_LIMIT_WINDOW},
        render::Renderer,
        AppState,
    },
};

const MAX_DB_CONNECTIONS: u32 = 10;
const DB_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const DB_IDLE_TIMEOUT: Duration = Duration::from_secs(45);
const DB_RETRY_INTERVAL: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env();
    let filter = config
        .as_ref()
        .map(|c| c.log_filter.clone())
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    std::panic::set_hook(Box::new(|panic| {
        error!("Uncaught panic, shutting down: {}", panic);
        std::process::exit(1);
    }));

    let config = match config {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!("Configuration loaded. Starting server...");

    if let Err(e) = run(config).await {
        error!("Server stopped: {}", e);
        std::process::exit(1);
    }
    info!("Server shut down cleanly");
}

async fn run(config: Arc<Config>) -> Result<(), ApiError> {
    let shutdown = CancellationToken::new();

    // --- 2. Database Pool (connects lazily) ---
    let db_pool = PgPoolOptions::new()
        .max_connections(MAX_DB_CONNECTIONS)
        .acquire_timeout(DB_ACQUIRE_TIMEOUT)
        .idle_timeout(Some(DB_IDLE_TIMEOUT))
        .connect_lazy(&config.database_url)?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));

    // The listener comes up even when the database is down; migrations run
    // once the first connection succeeds.
    tokio::spawn(prepare_database(db_adapter.clone(), shutdown.clone()));

    // --- 3. Access Log Destination ---
    let access_log = match config.environment {
        Environment::Development => AccessLog::Console,
        Environment::Production => {
            let file = AccessLogFile::open(&config.log_dir).await?;
            info!("Writing access log to {}", file.path().display());
            AccessLog::File(Arc::new(file))
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        webhook: Arc::new(LoggingWebhookAdapter::new()),
        config: config.clone(),
        renderer: Arc::new(Renderer::new()?),
        rate_limiter: Arc::new(RateLimiter::new(
            Arc::new(SystemClock),
            RATE_LIMIT_WINDOW,
            RATE_LIMIT_MAX,
        )),
        access_log,
    });

    // --- 5. Create the Web Router ---
    let app = build_app(app_state)?;

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    let signal_token = shutdown.clone();
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            signal_token.cancel();
        })
        .await?;

    shutdown.cancel();
    Ok(())
}

async fn prepare_database(db: Arc<DbAdapter>, shutdown: CancellationToken) {
    loop {
        let ready = tokio::select! {
            _ = shutdown.cancelled() => return,
            result = db.ping() => result,
        };
        match ready {
            Ok(()) => break,
            Err(e) => warn!("Database unreachable, retrying in {:?}: {}", DB_RETRY_INTERVAL, e),
        }
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(DB_RETRY_INTERVAL) => {}
        }
    }
    info!("DB connection successful!");

    info!("Running database migrations...");
    match db.run_migrations().await {
        Ok(()) => info!("Database migrations complete."),
        Err(e) => error!("Database migrations failed: {}", e),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("SIGTERM received, shutting down gracefully");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
}
