//! privacy-gateway - Authorization-aware response filter for blockchain
//! JSON-RPC endpoints

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use privacy_gateway::api::{create_router, AppState};
use privacy_gateway::cache::{MemoryTokenCache, RedisTokenCache, TokenCache};
use privacy_gateway::config::{
    parse_backends, CacheBackend, GatewayConfig, MemoryCacheConfig, RedisCacheConfig,
};
use privacy_gateway::issuer::TokenIssuer;

#[derive(Parser, Debug)]
#[command(name = "privacy-gateway")]
#[command(about = "Authorization-aware response filter for blockchain JSON-RPC endpoints")]
struct Args {
    /// Host to bind to
    #[arg(long, env = "PGW_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(long, env = "PGW_PORT", default_value = "8080")]
    port: u16,

    /// Enable the privacy interceptor (disabled = pure passthrough)
    #[arg(long, env = "PGW_ENABLE", default_value = "false")]
    enable: bool,

    /// Cache backend: "memory" or "redis"
    #[arg(long, env = "PGW_CACHE_BACKEND", default_value = "memory")]
    cache_backend: String,

    /// Redis URL (redis backend only)
    #[arg(long, env = "PGW_REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    redis_url: String,

    /// Binding lifetime in seconds
    #[arg(long, env = "PGW_CACHE_EXPIRATION_SECS", default_value = "86400")]
    cache_expiration_secs: u64,

    /// Entry bound for the in-process cache
    #[arg(long, env = "PGW_CACHE_MAX_ENTRIES", default_value = "1000")]
    cache_max_entries: usize,

    /// Allow-listed issuance backends as a JSON document:
    /// [{"name": "...", "pubKey": "0x04..."}, ...]
    #[arg(long, env = "PGW_BACKENDS", default_value = "[]")]
    backends: String,

    /// Deadline per cache operation in milliseconds
    #[arg(long, env = "PGW_OP_TIMEOUT_MS", default_value = "500")]
    op_timeout_ms: u64,

    /// Log level
    #[arg(long, env = "PGW_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> anyhow::Result<GatewayConfig> {
        let expiration = Duration::from_secs(self.cache_expiration_secs);
        Ok(GatewayConfig {
            enable: self.enable,
            host: self.host,
            port: self.port,
            log_level: self.log_level,
            cache_backend: CacheBackend::parse(&self.cache_backend)?,
            memory_cache: MemoryCacheConfig {
                expiration,
                max_entries: self.cache_max_entries,
            },
            redis_cache: RedisCacheConfig {
                url: self.redis_url,
                expiration,
            },
            backends: parse_backends(&self.backends)?,
            op_timeout: Duration::from_millis(self.op_timeout_ms),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI args
    let args = Args::parse();
    let log_level = args.log_level.clone();
    let config = args.into_config()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting privacy-gateway v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        enabled = config.enable,
        backend = config.cache_backend.label(),
        "privacy interceptor configuration"
    );

    let cache: Arc<dyn TokenCache> = match config.cache_backend {
        CacheBackend::Memory => Arc::new(MemoryTokenCache::new(config.memory_cache.clone())),
        CacheBackend::Redis => Arc::new(RedisTokenCache::connect(&config.redis_cache).await?),
    };

    let issuer = TokenIssuer::new(
        cache.clone(),
        &config.backends,
        None,
        config.op_timeout,
    );

    let state = Arc::new(AppState {
        enabled: config.enable,
        cache,
        issuer,
        op_timeout: config.op_timeout,
        backend_label: config.cache_backend.label(),
    });

    let router = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown handler");
        return;
    }
    tracing::info!("shutting down");
}
