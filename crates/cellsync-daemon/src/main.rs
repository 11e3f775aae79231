//! cellsync-daemon entry point.
//!
//! Thin by design: this file loads configuration, connects the three
//! external collaborators in the bootstrap order from §4.9 (store -> kv ->
//! remote), builds the shared [`cellsync_runtime::Runtime`], and starts the
//! HTTP server. Route handlers live in `routes.rs`; shared state lives in
//! `state.rs`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use cellsync_config::ReconcilerConfig;
use cellsync_daemon::{routes, state::AppState};
use cellsync_kv::{Kv, RedisKv};
use cellsync_remote::{HttpRemote, RateLimitState, RemoteEndpoint, RemoteSheet};
use cellsync_runtime::Runtime;
use cellsync_store::{PgStore, Store};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

fn main() {
    // Dev-time convenience; production injects env vars directly, silent
    // if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let config = match ReconcilerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            std::process::exit(2);
        }
    };

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("tokio runtime builds with static config");

    if let Err(err) = rt.block_on(run(config)) {
        tracing::error!(error = %err, "fatal startup or runtime failure");
        std::process::exit(1);
    }
}

async fn run(config: ReconcilerConfig) -> anyhow::Result<()> {
    let store = PgStore::connect(&config.store_dsn)
        .await
        .context("connecting to relational store")?;
    store.migrate().await.context("running store migrations")?;

    let kv = RedisKv::connect(&config.kv_address)
        .await
        .context("connecting to shared kv")?;

    let remote = HttpRemote::with_backoff(
        RemoteEndpoint {
            base_url: config.remote_base_url.clone(),
            remote_id: config.remote_id.clone(),
            range: config.remote_range.clone(),
            bearer_token: config.remote_bearer_token.clone(),
        },
        RateLimitState::with_bounds(config.rate_limit_initial_backoff, config.rate_limit_max_backoff),
    );

    let store: Arc<dyn Store> = Arc::new(store);
    let kv: Arc<dyn Kv> = Arc::new(kv);
    let remote: Arc<dyn RemoteSheet> = Arc::new(remote);

    let runtime = Runtime::new(&config, kv, store, remote);
    runtime.bootstrap().await.context("bootstrap failed")?;
    let handles = runtime.spawn();

    let state = Arc::new(AppState::new(runtime.clone()));
    let app = routes::build_router(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    let addr = bind_addr_from_env().unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8899)));
    info!("cellsync-daemon listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("binding http listener")?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    runtime.shutdown(handles).await;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("CELLSYNC_DAEMON_ADDR").ok()?.parse().ok()
}

/// Waits for SIGINT (or, on Unix, SIGTERM), whichever arrives first.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).expect("installing SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
