//! Echowave service
//!
//! Composition root for the signal engine: wires the ephemeral queue,
//! chain reconciler, stream merger and realtime fanout together and
//! serves them over HTTP and WebSocket.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use api_server::{spawn_event_drain, ApiContext, HttpApiServer, RealtimeFanout, WebSocketServer};
use clap::Parser;
use ledger_gateway::GatewayRegistry;
use stream_engine::{ChainReconciler, EphemeralQueue, MetadataClient, StreamMerger};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use config::ServiceConfig;

/// Echowave - live stream engine for time-limited voice notes
#[derive(Parser, Debug)]
#[command(name = "echowave")]
#[command(about = "Reconciles on-chain voice notes into one live stream", long_about = None)]
struct Args {
    /// Path to a JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// HTTP API bind address (overrides config)
    #[arg(long)]
    http_addr: Option<String>,

    /// WebSocket bind address (overrides config)
    #[arg(long)]
    ws_addr: Option<String>,

    /// Ephemeral queue capacity (overrides config)
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Seconds between expired-note sweeps of the queue
    #[arg(long, default_value = "60")]
    sweep_interval: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &args.config {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(addr) = args.http_addr {
        config.http_addr = addr;
    }
    if let Some(addr) = args.ws_addr {
        config.ws_addr = addr;
    }
    if let Some(capacity) = args.queue_capacity {
        config.queue_capacity = capacity;
    }

    tracing::info!("Starting Echowave signal engine");
    tracing::info!("  HTTP API: {}", config.http_addr);
    tracing::info!("  WebSocket: {}", config.ws_addr);
    tracing::info!("  Queue capacity: {}", config.queue_capacity);
    for chain in &config.chains {
        tracing::info!(
            "  Chain {}: {} (lookback {} blocks, range {} per query)",
            chain.chain_id,
            chain.rpc_url,
            chain.lookback_blocks,
            chain.max_block_range
        );
    }

    // Shared state, constructor-injected everywhere
    let registry = Arc::new(GatewayRegistry::from_configs(&config.chains)?);
    let queue = Arc::new(EphemeralQueue::new(config.queue_capacity));
    let reconciler = Arc::new(ChainReconciler::new(
        registry.clone(),
        MetadataClient::new(config.metadata_timeout_ms),
    ));
    let merger = Arc::new(StreamMerger::new(queue.clone(), reconciler.clone()));
    let fanout = Arc::new(RealtimeFanout::new());

    let (events, events_rx) = mpsc::unbounded_channel();
    let drain = spawn_event_drain(queue.clone(), fanout.clone(), events_rx);

    let context = Arc::new(ApiContext {
        queue: queue.clone(),
        merger,
        reconciler,
        registry,
        fanout,
        events,
    });

    // Start HTTP API server
    let http_context = context.clone();
    let http_addr = config.http_addr.clone();
    let http_server = tokio::spawn(async move {
        let server = HttpApiServer::new(http_context);
        if let Err(e) = server.run(&http_addr).await {
            tracing::error!("HTTP API server error: {}", e);
        }
    });

    // Start WebSocket server
    let ws_context = context.clone();
    let ws_addr = config.ws_addr.clone();
    let ws_server = tokio::spawn(async move {
        let server = WebSocketServer::new(ws_context);
        if let Err(e) = server.run(&ws_addr).await {
            tracing::error!("WebSocket server error: {}", e);
        }
    });

    // Periodic sweep of expired queue entries
    let sweep_queue = queue.clone();
    let sweep_interval = args.sweep_interval.max(1);
    let sweeper = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(sweep_interval));
        loop {
            ticker.tick().await;
            let removed = sweep_queue.evict_expired();
            if removed > 0 {
                tracing::info!("swept {} expired notes from the queue", removed);
            }
        }
    });

    tracing::info!("Echowave running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");

    http_server.abort();
    ws_server.abort();
    sweeper.abort();
    drain.abort();

    tracing::info!("Echowave stopped");

    Ok(())
}
