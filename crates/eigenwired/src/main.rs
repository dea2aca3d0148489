//! eigenwired: serves the ArrayOps gRPC service and the REST API.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;

use eigenwire_core::config::EigenwireConfig;
use eigenwire_core::size::human_size;
use eigenwire_grpc::ArrayOpsService;
use eigenwire_rest::{ApiState, ArrayStore};

#[derive(Parser)]
#[command(name = "eigenwired", about = "Array math over gRPC and REST")]
struct Args {
    /// Config file. Defaults to $EIGENWIRE_CONFIG or the XDG location.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    // Load config
    let config = match &args.config {
        Some(path) => EigenwireConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => {
            if let Err(e) = EigenwireConfig::write_default_if_missing() {
                tracing::warn!(error = %e, "failed to write default config");
            }
            EigenwireConfig::load().context("failed to load config")?
        }
    };
    tracing::info!(
        grpc = config.services.grpc,
        rest = config.services.rest,
        max_chunk = %human_size(config.transfer.max_chunk_bytes as u64),
        "eigenwired starting"
    );

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn servers ────────────────────────────────────────────────────────

    let grpc_task = if config.services.grpc {
        let addr = format!("{}:{}", config.grpc.host, config.grpc.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind gRPC listener on {addr}"))?;
        let service = ArrayOpsService::new(
            config.grpc.max_concurrent_calls,
            config.transfer.max_chunk_bytes,
        );
        let shutdown = shutdown_tx.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = eigenwire_grpc::serve(listener, service, shutdown).await {
                tracing::error!(error = %e, "gRPC server failed");
            }
        }))
    } else {
        None
    };

    let rest_task = if config.services.rest {
        let store = ArrayStore::open(&config.rest.database_path)
            .with_context(|| format!("failed to open {}", config.rest.database_path.display()))?;
        let addr = format!("{}:{}", config.rest.host, config.rest.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind REST listener on {addr}"))?;
        let shutdown = shutdown_tx.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = eigenwire_rest::serve(listener, ApiState { store }, shutdown).await {
                tracing::error!(error = %e, "REST server failed");
            }
        }))
    } else {
        None
    };

    if grpc_task.is_none() && rest_task.is_none() {
        anyhow::bail!("no services enabled");
    }

    let mut shutdown_rx = shutdown_tx.subscribe();
    tokio::select! {
        _ = shutdown_rx.recv() => {}
        _ = wait(grpc_task) => { tracing::warn!("gRPC server exited"); }
        _ = wait(rest_task) => { tracing::warn!("REST server exited"); }
    }
    let _ = shutdown_tx.send(());

    tracing::info!("eigenwired stopped");
    Ok(())
}

/// Resolve when `task` finishes; never, if there is no task.
async fn wait(task: Option<tokio::task::JoinHandle<()>>) {
    match task {
        Some(handle) => {
            let _ = handle.await;
        }
        None => std::future::pending().await,
    }
}
