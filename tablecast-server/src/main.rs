//! Tablecast Server
//!
//! Relays PostgreSQL change notifications to an automation webhook and
//! redistributes the result sets it pushes back to live viewers.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::ConfigLoader;
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tablecast_core::events::change_event_channel;
use tablecast_core::processors::{ChangeListener, WebhookForwarder};
use tablecast_core::utils::versioned_store::VersionedStore;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Tablecast - change-notification relay and live-data distribution
#[derive(Parser, Debug)]
#[command(name = "tablecast-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./tablecast.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:5000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting tablecast-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded_config.server.listen;
    match &loaded_config.webhook.url {
        Some(url) => tracing::info!(%url, "Forwarding change events"),
        None => tracing::warn!("No webhook URL configured, change events will be dropped"),
    }

    // The pool connects lazily so the HTTP side comes up even while the
    // database is unreachable; the listener keeps retrying.
    let db_pool = PgPoolOptions::new()
        .max_connections(loaded_config.database.max_connections)
        .connect_lazy_with(loaded_config.database.connect_options.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (event_tx, event_rx) = change_event_channel();

    // Change pipeline: LISTEN -> ChangeEvent -> webhook
    let webhook_store = VersionedStore::new(loaded_config.webhook);
    let listener = ChangeListener::new(db_pool.clone(), loaded_config.listener);
    let forwarder = WebhookForwarder::new(webhook_store.clone());
    let listener_handle = tokio::spawn(listener.run(shutdown_rx.clone(), event_tx));
    let forwarder_handle = tokio::spawn(forwarder.run(shutdown_rx.clone(), event_rx));

    // Spawn config reload handler (listens for SIGHUP)
    let reload_notify = spawn_config_reload_handler(config_loader, webhook_store);

    let state = AppState::new(shutdown_rx);
    let router = build_router(state, &loaded_config.server.cors);

    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr, shutdown_tx).await;

    reload_notify.notify_one();

    // `run_server` flips the shutdown flag before draining, so both
    // processors are already winding down. An early bind error drops the
    // sender instead, which they treat the same way.
    if let Err(e) = listener_handle.await {
        tracing::error!("ChangeListener task failed: {}", e);
    }
    if let Err(e) = forwarder_handle.await {
        tracing::error!("WebhookForwarder task failed: {}", e);
    }

    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
