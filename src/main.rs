use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use forum_mirror::config::Config;
use forum_mirror::db::Database;
use forum_mirror::forum::ForumClient;
use forum_mirror::scheduler;
use forum_mirror::sync::{DeletionScanner, SyncEngine};
use forum_mirror::web::{self, AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    info!("Starting forum-mirror");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(forum_url = %config.forum_url, "Configuration loaded");

    if let Some(parent) = config.database_path.parent() {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }

    let db = Database::new(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    info!("Database initialized");

    let client = ForumClient::new(&config.forum_url, config.http_timeout)?;
    let engine = Arc::new(SyncEngine::new(client.clone(), db.clone()));
    let scanner = Arc::new(DeletionScanner::new(client, db.clone()));

    let sync_handle = if config.sync_interval.is_zero() {
        info!("Built-in sync trigger disabled");
        None
    } else {
        let engine = Arc::clone(&engine);
        let interval = config.sync_interval;
        Some(tokio::spawn(async move {
            scheduler::run_sync_loop(engine, interval).await;
        }))
    };

    let deletion_handle = if config.deletion_scan_enabled {
        let scanner = Arc::clone(&scanner);
        let window = config.deletion_scan_interval();
        Some(tokio::spawn(async move {
            scheduler::run_deletion_loop(scanner, window).await;
        }))
    } else {
        info!("Built-in deletion scan disabled");
        None
    };

    let state = AppState {
        db,
        engine,
        scanner,
    };
    let web_config = config.clone();
    let web_handle = tokio::spawn(async move {
        if let Err(e) = web::serve(&web_config, state).await {
            error!("Web server error: {e:#}");
        }
    });

    shutdown_signal().await;

    info!("Shutting down...");

    web_handle.abort();
    if let Some(handle) = sync_handle {
        handle.abort();
    }
    if let Some(handle) = deletion_handle {
        handle.abort();
    }

    info!("Shutdown complete");

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,forum_mirror=debug"));

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
