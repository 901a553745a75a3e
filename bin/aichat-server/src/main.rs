//! aichat-server: chat completion gateway plus conversation history API.
//!
//! Configuration comes from `AICHAT_*` environment variables (see
//! [`config::Config`]). The server runs until SIGINT/SIGTERM, then drains
//! in-flight requests.

mod config;
mod entities;
mod error;
mod middleware;
mod provider;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::entities::SqliteStore;
use crate::provider::openai::OpenAiProvider;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::from_env();
    init_tracing(&cfg);
    info!(version = env!("CARGO_PKG_VERSION"), "aichat-server starting");

    let state = build_state(cfg).await?;
    let addr: SocketAddr = state.config.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, swagger = state.config.enable_swagger, "listening");

    axum::serve(listener, routes::build(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("aichat-server stopped");
    Ok(())
}

/// `RUST_LOG` wins over `AICHAT_LOG`; an unparsable `AICHAT_LOG` falls back
/// to `info`.
fn init_tracing(cfg: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        cfg.log_level.parse().unwrap_or_else(|e| {
            eprintln!(
                "WARN: AICHAT_LOG='{}' is not a valid tracing filter ({e}); falling back to 'info'",
                cfg.log_level
            );
            EnvFilter::new("info")
        })
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);
    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn build_state(cfg: Config) -> anyhow::Result<Arc<AppState>> {
    let store = SqliteStore::connect(&cfg.database_url).await?;
    info!(database_url = %cfg.database_url, "database ready");

    if cfg.provider_key.is_none() {
        warn!("AICHAT_PROVIDER_KEY is not set; provider calls will be unauthenticated");
    }
    let provider = OpenAiProvider::new(&cfg.provider_url, cfg.provider_key.clone(), &cfg.model)?;
    info!(provider_url = %cfg.provider_url, model = %cfg.model, "completion provider ready");

    Ok(Arc::new(AppState {
        config: Arc::new(cfg),
        store: Arc::new(store),
        provider: Arc::new(provider),
    }))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    res = tokio::signal::ctrl_c() => {
                        if let Err(e) = res {
                            warn!(error = %e, "ctrl-c handler failed");
                        }
                    }
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM; only ctrl-c will stop the server");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler failed");
    }

    info!("shutdown signal received; draining connections");
}
