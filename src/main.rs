// src/main.rs

use std::sync::Arc;

use dotenvy::dotenv;
use quiz_backend::{
    config::Config,
    routes,
    seed::{seed_admin_user, seed_demo_data},
    state::{AppState, SharedClock, SharedStore},
    store::{MemoryStore, SqliteStore},
    utils::clock::SystemClock,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let store: SharedStore = if let Some(url) = &config.database_url {
        tracing::info!("Using SQLite store at {}", url);
        Arc::new(
            SqliteStore::connect(url)
                .await
                .expect("Failed to open SQLite database"),
        )
    } else if let Some(path) = &config.data_file {
        tracing::info!("Using in-memory store backed by {}", path.display());
        Arc::new(
            MemoryStore::open(path)
                .await
                .expect("Failed to load data file"),
        )
    } else {
        tracing::warn!("No DATABASE_URL or DATA_FILE set, data will not survive a restart");
        Arc::new(MemoryStore::new())
    };

    let clock: SharedClock = Arc::new(SystemClock);

    if config.seed_demo {
        if let Err(e) = seed_demo_data(store.as_ref(), clock.today(), clock.utc_now()).await {
            tracing::error!("Failed to seed demo data: {:?}", e);
        }
    }

    // Seed Admin User
    if let Err(e) = seed_admin_user(store.as_ref(), &config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    let addr = config.bind_addr;

    // Create AppState
    let state = AppState {
        store,
        clock,
        config,
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listening address");

    // Start the server
    axum::serve(listener, app).await.expect("Server error");
}
