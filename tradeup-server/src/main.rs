//! Tradeup Server
//!
//! Runs tradeup pools to completion and streams their state to WebSocket
//! clients. Several processes can share one Redis bus.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, LoadedConfig};
use server::{build_router, run_server};
use shutdown::shutdown_signal;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tradeup_core::broadcast::Broadcaster;
use tradeup_core::bus::{Bus, LocalBus, RedisBus};
use tradeup_core::events::winner_channel;
use tradeup_core::hub::Hub;
use tradeup_core::processors::{
    BroadcastScheduler, BusBridge, ExpiryScanner, PoolMaintainer, ResolutionEngine, WinnerRelay,
};
use tradeup_core::snapshot::SnapshotCache;
use tradeup_core::store::{MemoryStore, default_catalog};
use tradeup_sdk::objects::bus::ALL_CHANNELS;
use tradeup_sdk::objects::{Rarity, UserId};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Tradeup Server - pooled item tradeups with live WebSocket updates
#[derive(Parser, Debug)]
#[command(name = "tradeup-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./tradeup-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Override the Redis URL used for the pub/sub bus
    #[arg(long, env = "TRADEUP_REDIS_URL")]
    redis_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting tradeup-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = ConfigLoader::new(&args.config, args.listen, args.redis_url);
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let store = Arc::new(match loaded_config.engine.rng_seed {
        Some(seed) => MemoryStore::with_seed(default_catalog(), seed),
        None => MemoryStore::new(default_catalog()),
    });
    seed_inventory(&store, &loaded_config).await?;

    let bus = connect_bus(loaded_config.redis_url.as_deref()).await?;
    let bus_stream = bus.subscribe(&ALL_CHANNELS).await.map_err(|e| {
        tracing::error!("Failed to subscribe to the bus: {}", e);
        e
    })?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let snapshots = Arc::new(SnapshotCache::default());
    let (winner_tx, winner_rx) = winner_channel();

    let engine = Arc::new(ResolutionEngine::new(
        store.clone(),
        loaded_config.engine.clone(),
        winner_tx,
    ));
    let (hub, hub_handle) = Hub::new(store.clone(), snapshots.clone(), &loaded_config.hub);
    let broadcaster = Arc::new(Broadcaster::new(store, bus, snapshots));

    let tasks = vec![
        tokio::spawn(hub.run(shutdown_rx.clone())),
        tokio::spawn(ExpiryScanner::new(engine.clone()).run(shutdown_rx.clone())),
        tokio::spawn(PoolMaintainer::new(engine.clone()).run(shutdown_rx.clone())),
        tokio::spawn(
            BroadcastScheduler::new(
                broadcaster.clone(),
                hub_handle.clone(),
                loaded_config.broadcast.tick,
            )
            .run(shutdown_rx.clone()),
        ),
        tokio::spawn(WinnerRelay::new(broadcaster, winner_rx).run(shutdown_rx.clone())),
        tokio::spawn(BusBridge::new(bus_stream, hub_handle.clone()).run(shutdown_rx)),
    ];

    // Create application state
    let state = AppState::new(engine, hub_handle, loaded_config.hub.clone());

    // Build the router
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", loaded_config.listen);
    let result = run_server(router, loaded_config.listen, shutdown_signal()).await;

    // Stop the processors, also when the server failed
    let _ = shutdown_tx.send(true);
    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!("Processor task failed: {}", e);
        }
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

async fn connect_bus(redis_url: Option<&str>) -> anyhow::Result<Arc<dyn Bus>> {
    match redis_url {
        Some(url) => {
            tracing::info!("Connecting to Redis bus...");
            let bus = RedisBus::connect(url).await.map_err(|e| {
                tracing::error!("Failed to connect to Redis: {}", e);
                e
            })?;
            tracing::info!("Redis bus connection established");
            Ok(Arc::new(bus))
        }
        None => {
            tracing::info!("No Redis URL configured, using the in-process bus");
            Ok(Arc::new(LocalBus::default()))
        }
    }
}

/// Grant the configured demo users random skins of every tradeable tier.
async fn seed_inventory(store: &MemoryStore, config: &LoadedConfig) -> anyhow::Result<()> {
    for name in &config.seed.users {
        let user = UserId::from(name.as_str());
        for rarity in Rarity::TRADEUP_TIERS {
            for _ in 0..config.seed.items_per_tier {
                store.grant_random(&user, rarity).await?;
            }
        }
    }
    if !config.seed.users.is_empty() {
        tracing::info!(
            users = config.seed.users.len(),
            items_per_tier = config.seed.items_per_tier,
            "Seeded demo inventory"
        );
    }
    Ok(())
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
