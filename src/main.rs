use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use rsssplit::config::Config;
use rsssplit::server::{self, AppState};
use rsssplit::source::SourceCache;

#[derive(Parser, Debug)]
#[command(
    name = "rsssplit",
    version,
    about = "Splits one podcast feed into per-show RSS/Atom feeds"
)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG overrides the default directive
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rsssplit=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let config = Arc::new(config);

    let cache = Arc::new(
        SourceCache::new(Arc::clone(&config)).context("Failed to build HTTP client")?,
    );

    let listener = TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.addr))?;

    let shutdown = CancellationToken::new();
    cache.start(shutdown.child_token()).await;

    let state = AppState::new(Arc::clone(&config), Arc::clone(&cache));
    let signal = shutdown.clone();
    server::serve(listener, state, async move {
        wait_for_signal().await;
        signal.cancel();
    })
    .await
    .context("HTTP server failed")?;

    // Covers the case where the server stopped on its own.
    shutdown.cancel();
    cache.shutdown().await;

    tracing::info!("Shut down cleanly");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM (ctrl-c elsewhere).
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(term), Ok(int)) => (term, int),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Failed to install signal handlers, falling back to ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, shutting down gracefully");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received ctrl-c, shutting down gracefully");
    }
}
