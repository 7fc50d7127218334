use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use warble::config::{Cli, Config};
use warble::state::AppState;
use warble::storage::FsBlobStore;
use warble::{db, identity, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli)?;
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path(), config.database.pool_size)?;
    db::run_migrations(&pool)?;

    if let Some(name) = cli.create_user.as_deref() {
        let api_key = identity::generate_api_key();
        let user_id = db::transaction(&pool, |tx| identity::create_user(tx, name, &api_key))?;
        println!("Created user {} (id {}) with API key {}", name, user_id, api_key);
        return Ok(());
    }

    let seeded = db::transaction(&pool, |tx| identity::seed_users(tx, &config.users))?;
    if seeded > 0 {
        tracing::info!("Seeded {} user(s) from config", seeded);
    }

    let blobs = FsBlobStore::new(config.media_path())?;

    let state = AppState {
        db: pool.clone(),
        config: config.clone(),
        blobs: Arc::new(blobs),
    };

    let app = routes::router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped, closing database pool");
    drop(pool);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
