use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flag_latency_bench::config::Config;
use flag_latency_bench::kv::{KvStore, RedisKv};
use flag_latency_bench::store::FlagStore;
use flag_latency_bench::{seed, server, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the process environment still applies.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    // ── 1. Connect to Redis ──────────────────────────────────────
    info!(url = %config.redis_url, "connecting to redis");
    let kv: Arc<dyn KvStore> = Arc::new(
        RedisKv::connect(&config.redis_url)
            .await
            .with_context(|| format!("failed to connect to redis at {}", config.redis_url))?,
    );

    // ── 2. Open the flag database ────────────────────────────────
    let store = FlagStore::open(&config.database_path, config.database_pool_size)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    store.migrate().context("failed to apply schema")?;
    info!(path = %config.database_path.display(), "database ready");

    // ── 3. Seed fixtures ─────────────────────────────────────────
    if config.seed_fixtures {
        seed::ensure_fixtures(&store, kv.as_ref(), &config.kv_flag_key)
            .await
            .context("failed to seed fixtures")?;
    }

    // ── 4. Build shared state ────────────────────────────────────
    if config.launchdarkly.is_none() {
        warn!("LD_URL/LD_KEY not set, /ldflag will answer 503");
    }
    if config.configcat.is_none() {
        warn!("CC_KEY not set, /configcat will answer 503");
    }
    if config.peer_service_url.is_none() {
        warn!("PEER_SERVICE_URL not set, /restapi-same-zone and /rpc will answer 503");
    }

    let bind_addr = config.bind_addr;
    let state = Arc::new(
        AppState::new(config, kv, store).context("failed to build outbound clients")?,
    );

    // ── 5. Bind & serve ──────────────────────────────────────────
    let app = server::create_router(state.clone());
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with error")?;

    // ── 6. Drain pending inserts ─────────────────────────────────
    let pending = state.recorder.pending();
    if pending > 0 {
        info!(pending, "waiting for latency inserts");
    }
    state.recorder.flush().await;
    info!("shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
