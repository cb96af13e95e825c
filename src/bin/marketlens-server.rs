//! Industry Report API Server Binary
//!
//! Run with: `cargo run --bin marketlens-server`

use marketlens::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Note: Tracing is initialized in run_server()
    // Set RUST_LOG to control log level:
    //   RUST_LOG=debug cargo run --bin marketlens-server

    // Create configuration from environment variables or defaults
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "8000".to_string())
        .parse::<u16>()
        .unwrap_or(8000);
    let database_path =
        std::env::var("DATABASE_PATH").unwrap_or_else(|_| "marketlens.db".to_string());
    let pool_size = std::env::var("POOL_SIZE")
        .unwrap_or_else(|_| "8".to_string())
        .parse::<usize>()
        .unwrap_or(8);

    let config = ServerConfig::new(host, port, database_path, pool_size);

    println!("Starting Industry Report API Server...");
    println!("   Host: {}", config.host);
    println!("   Port: {}", config.port);
    println!("   Database: {}", config.database_path);
    println!("   Pool size: {}", config.pool_size);
    println!();
    println!(
        "Server will be available at: http://{}:{}",
        config.host, config.port
    );
    println!();
    println!("Available endpoints:");
    println!("  GET  /health                  - Health check");
    println!("  GET  /api/industries          - List industry names");
    println!("  GET  /api/industry/:name      - Per-industry report");
    println!();

    // Run server
    run_server(config).await?;

    Ok(())
}
