pub mod config;
pub mod db;
pub mod middleware;
pub mod omdb;
pub mod server;
pub mod web;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::Repository;

pub const DEFAULT_CONFIG: &str = "moviweb-server.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] db::DbError),
    #[error("OMDb client error: {0}")]
    Omdb(#[from] omdb::OmdbError),
    #[error("Server error: {0}")]
    Server(String),
}

pub async fn run(config_path: Option<&str>, debug_logs: bool) -> Result<(), ServerError> {
    let mut config = config::Config::load(config_path, DEFAULT_CONFIG)?;
    config.debug_logs = debug_logs;

    info!("Using config file: {}", config_path.unwrap_or(DEFAULT_CONFIG));
    if debug_logs {
        info!("Debug logging enabled");
    }

    let db_path = config.get_database_path();
    info!("Opening database at {}", db_path);
    let db = Arc::new(db::SqliteRepository::new(&db_path).await?);

    let omdb = omdb::OmdbClient::new(&config.omdb)?;
    if config.omdb.apikey.is_none() {
        warn!("No OMDb API key configured, movie lookups will fail");
    }

    let flash_key = match config.secret_key {
        Some(ref secret) => web::FlashKey::new(secret),
        None => {
            warn!("No secret_key configured, using a random key for this run");
            web::FlashKey::generate()
        }
    };

    let address = config.listen.address.as_deref().unwrap_or("[::]");
    let port = &config.listen.port;
    let addr: SocketAddr = format!("{}:{}", address, port)
        .parse()
        .map_err(|e| ServerError::Server(format!("Invalid address: {}", e)))?;

    let state = server::AppState::new(config, db.clone(), omdb, flash_key);
    let app = server::build_app(state);

    info!("Serving HTTP on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Server(format!("Failed to bind: {}", e)))?;

    axum::serve(listener, axum::ServiceExt::<axum::extract::Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Server(format!("Server error: {}", e)))?;

    info!("Shutting down");
    db.close().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
