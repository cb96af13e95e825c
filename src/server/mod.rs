//! REST API server for industry reports

mod error;
mod handlers;
mod routes;
mod state;

pub use error::ApiError;
pub use state::AppState;

use crate::report::ReportOptions;
use crate::sqlite_store::SqliteMarketStore;
use std::sync::Arc;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host address (default: "127.0.0.1")
    pub host: String,
    /// Server port (default: 8000)
    pub port: u16,
    /// Path to the SQLite database
    pub database_path: String,
    /// Size of the store's connection pool (default: 8)
    pub pool_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
            database_path: "marketlens.db".to_string(),
            pool_size: 8,
        }
    }
}

impl ServerConfig {
    /// Creates a new server configuration
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database_path: impl Into<String>,
        pool_size: usize,
    ) -> Self {
        ServerConfig {
            host: host.into(),
            port,
            database_path: database_path.into(),
            pool_size,
        }
    }
}

/// Runs the API server
///
/// # Arguments
/// * `config` - Server configuration
///
/// # Returns
/// Returns an error if the server fails to start or encounters a fatal error
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    // Open the store and its connection pool
    let store = SqliteMarketStore::open(&config.database_path, config.pool_size)?;

    // Create application state
    let state = Arc::new(AppState::new(store, ReportOptions::default()));

    // Create router
    let app = routes::create_router(state);

    // Build server address
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);

    // Run server
    axum::serve(listener, app).await?;

    Ok(())
}
