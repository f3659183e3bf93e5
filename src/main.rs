//! Quill Server
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use quill_api::{AppState, Repositories};
use quill_auth::jwt::TokenManager;
use quill_core::config::{AppConfig, DatabaseBackend};
use quill_core::error::AppError;
use quill_database::DatabasePool;
use quill_database::memory::MemoryStore;
use quill_database::repositories::{
    PgContentRepository, PgRoleRepository, PgSessionRepository, PgUserRepository,
};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration for the environment named by `QUILL_ENV`
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("QUILL_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(
        environment = %config.server.environment,
        "Starting Quill v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Signing keys are loaded up front so a bad key path fails startup.
    let tokens = TokenManager::load(&config.auth)?;

    let (repos, pool) = match config.database.backend {
        DatabaseBackend::Postgres => {
            tracing::info!("Connecting to database...");
            let pool = DatabasePool::connect(&config.database).await?;
            quill_database::migration::run_migrations(pool.pool()).await?;
            tracing::info!("Database ready");

            let pg = pool.pool().clone();
            let repos = Repositories {
                users: Arc::new(PgUserRepository::new(pg.clone())),
                roles: Arc::new(PgRoleRepository::new(pg.clone())),
                sessions: Arc::new(PgSessionRepository::new(pg.clone())),
                content: Arc::new(PgContentRepository::new(pg)),
            };
            (repos, Some(pool))
        }
        DatabaseBackend::Memory => {
            tracing::warn!("Using the in-memory backend; data is lost on restart");
            (Repositories::from_memory(&MemoryStore::new()), None)
        }
    };

    let state = AppState::new(config, tokens, repos)?;
    quill_api::app::run_server(state).await?;

    if let Some(pool) = pool {
        pool.close().await;
    }
    tracing::info!("Quill shutdown complete");
    Ok(())
}
