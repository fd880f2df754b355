// Tip ledger API server entry point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http::{header, Method};
use migration::{Migrator, MigratorTrait};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tip_ledger_api::config::ApiConfig;
use tip_ledger_api::db::{DbPool, InMemoryTipDepositStore, TipDepositStore};
use tip_ledger_api::handlers::{self, ApiState};
use tip_ledger_api::services::TipLedger;

/// DATABASE_URL value selecting the process-local store
const IN_MEMORY_URL: &str = "memory://";

fn load_env() {
    dotenv::dotenv().ok();
}

async fn open_store(config: &ApiConfig) -> Arc<dyn TipDepositStore> {
    if config.database_url == IN_MEMORY_URL {
        tracing::warn!("Using in-memory tip deposit store; data is lost on exit");
        return Arc::new(InMemoryTipDepositStore::new());
    }

    // Establish database connection pool
    let db_pool = DbPool::new(config)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Connected to database");

    if config.run_migrations {
        Migrator::up(db_pool.get_connection(), None)
            .await
            .expect("Failed to run migrations");
        tracing::info!("Database migrations applied");
    }

    Arc::new(db_pool.tip_deposits())
}

#[tokio::main]
async fn main() {
    load_env();
    // Configure logging with tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load API configuration from environment
    let config = ApiConfig::from_env();
    tracing::info!("Configuration loaded");
    if config.admin_token.is_none() {
        tracing::info!("ADMIN_TOKEN not set; POST /tips/expire is disabled");
    }

    let store = open_store(&config).await;
    let ledger = TipLedger::new(store, config.ledger.clone());
    let app_state = Arc::new(ApiState {
        ledger,
        admin_token: config.admin_token.clone(),
    });

    // Configure CORS policy
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
            header::AUTHORIZATION,
        ])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_LENGTH])
        .max_age(Duration::from_secs(3600));

    // Set up API routes
    let app = handlers::router(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Parse server address from config
    let addr: SocketAddr = config.server_addr().parse().expect("Invalid address");

    // Start HTTP server
    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
