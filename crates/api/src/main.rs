use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shelfmark_api::config::{ServerConfig, StorageConfig};
use shelfmark_api::router::build_app_router;
use shelfmark_api::state::AppState;
use shelfmark_core::queue::ports::{ContentStore, Notifier};
use shelfmark_db::PgQueueStore;
use shelfmark_events::{EmailConfig, EmailNotifier, LogNotifier};
use shelfmark_storage::{LocalContentStore, S3ContentStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shelfmark_api=debug,tower_http=debug".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = shelfmark_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    shelfmark_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    shelfmark_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let store = Arc::new(PgQueueStore::new(pool));

    // --- Content store ---
    let content: Arc<dyn ContentStore> = match &config.storage {
        StorageConfig::Local { root } => {
            tracing::info!(root = %root.display(), "Serving content from local directory");
            Arc::new(LocalContentStore::new(root.clone()))
        }
        StorageConfig::S3 { bucket } => {
            tracing::info!(%bucket, "Serving content from S3");
            Arc::new(S3ContentStore::from_env(bucket.clone()).await)
        }
    };

    // --- Notifier ---
    let notifier: Arc<dyn Notifier> = match EmailConfig::from_env() {
        Some(email) => {
            tracing::info!(smtp_host = %email.smtp_host, "Admission emails enabled");
            Arc::new(EmailNotifier::new(email))
        }
        None => {
            tracing::info!("SMTP_HOST not set, admission notices will only be logged");
            Arc::new(LogNotifier)
        }
    };

    // --- App state ---
    let state = AppState {
        store: store.clone(),
        registry: store,
        content,
        notifier,
        config: Arc::new(config.clone()),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    let shutdown = CancellationToken::new();
    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown.clone().cancelled_owned());
    let mut server_handle = tokio::spawn(async move { server.await });

    tokio::select! {
        result = &mut server_handle => {
            result.expect("Server task panicked").expect("Server error");
            return;
        }
        () = shutdown_signal() => {}
    }

    // --- Drain ---
    shutdown.cancel();
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    match tokio::time::timeout(drain, server_handle).await {
        Ok(_) => tracing::info!("Graceful shutdown complete"),
        Err(_) => tracing::warn!(
            timeout_secs = config.shutdown_timeout_secs,
            "In-flight requests did not drain in time, exiting",
        ),
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
