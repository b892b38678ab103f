use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use studio_db::store::{BookingStore, MemoryBookingStore, PgBookingStore, StoreBackend};
use studio_events::{EventBus, NotificationDispatcher, WebhookTarget};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use studio_api::config::{ServerConfig, StoreConfig};
use studio_api::router::build_app_router;
use studio_api::state::AppState;

const DEFAULT_LOG_FILTER: &str =
    "studio_api=debug,studio_db=info,studio_events=info,tower_http=debug";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        backend = ?config.store.backend,
        grace_mins = config.check_in.grace.num_minutes(),
        "Loaded server configuration"
    );

    // --- Store ---
    let store = open_store(&config.store).await;

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let target = config.notify_webhook.as_ref().map(|w| WebhookTarget {
        url: w.url.clone(),
        secret: w.secret.clone(),
    });
    let dispatcher_handle =
        tokio::spawn(NotificationDispatcher::new(target).run(event_bus.subscribe()));
    tracing::info!("Notification dispatcher started");

    // --- App state ---
    let state = AppState {
        store,
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
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

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Last sender; closing the channel lets the dispatcher drain and exit.
    drop(event_bus);
    match tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await {
        Ok(Ok(handled)) => tracing::info!(handled, "Notification dispatcher stopped"),
        Ok(Err(e)) => tracing::error!(error = %e, "Notification dispatcher panicked"),
        Err(_) => tracing::warn!("Notification dispatcher did not stop in time"),
    }

    tracing::info!("Graceful shutdown complete");
}

/// Open the configured store. Postgres is health-checked and migrated first.
async fn open_store(config: &StoreConfig) -> Arc<dyn BookingStore> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryBookingStore::default())
        }
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL must be set for the postgres backend");

            let pool = studio_db::create_pool(database_url, config.max_connections)
                .await
                .expect("Failed to connect to database");
            tracing::info!(
                max_connections = config.max_connections,
                "Database connection pool created"
            );

            studio_db::health_check(&pool)
                .await
                .expect("Database health check failed");

            studio_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(PgBookingStore::new(pool))
        }
    }
}

/// Wait for SIGINT or SIGTERM.
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
