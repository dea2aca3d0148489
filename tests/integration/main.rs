//! eigenwire integration test harness.
//!
//! Every test starts its own gRPC server and REST API in-process on
//! ephemeral loopback ports, so tests run in parallel without sharing
//! state. Servers stop when the returned [`Servers`] is dropped.
//!
//!   cargo test --test integration

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use eigenwire_core::plan::MAX_CHUNK_BYTES;
use eigenwire_grpc::{ArrayClient, ArrayOpsService};
use eigenwire_rest::{ApiState, ArrayStore, RestClient};

// ── Harness ───────────────────────────────────────────────────────────────────

pub const HOST: &str = "127.0.0.1";
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// A running gRPC server and REST API pair.
pub struct Servers {
    pub grpc_port: u16,
    pub rest_port: u16,
    pub max_chunk_bytes: usize,
    shutdown: broadcast::Sender<()>,
}

impl Servers {
    /// Start both servers with the default 3 MiB chunk limit.
    pub async fn start() -> Result<Self> {
        Self::start_with_limit(MAX_CHUNK_BYTES).await
    }

    pub async fn start_with_limit(max_chunk_bytes: usize) -> Result<Self> {
        let (shutdown, _) = broadcast::channel::<()>(1);

        let grpc_listener = TcpListener::bind((HOST, 0))
            .await
            .context("failed to bind gRPC listener")?;
        let grpc_port = grpc_listener.local_addr()?.port();
        let service = ArrayOpsService::new(4, max_chunk_bytes);
        tokio::spawn(eigenwire_grpc::serve(grpc_listener, service, shutdown.subscribe()));

        let rest_listener = TcpListener::bind((HOST, 0))
            .await
            .context("failed to bind REST listener")?;
        let rest_port = rest_listener.local_addr()?.port();
        let state = ApiState {
            store: ArrayStore::open_in_memory().context("failed to open store")?,
        };
        tokio::spawn(eigenwire_rest::serve(rest_listener, state, shutdown.subscribe()));

        Ok(Self {
            grpc_port,
            rest_port,
            max_chunk_bytes,
            shutdown,
        })
    }

    pub async fn grpc_client(&self) -> Result<ArrayClient> {
        ArrayClient::connect_with_limit(HOST, self.grpc_port, CONNECT_TIMEOUT, self.max_chunk_bytes)
            .await
            .context("failed to connect to test gRPC server")
    }

    pub fn rest_client(&self) -> RestClient {
        RestClient::new(HOST, self.rest_port)
    }

    pub fn rest_url(&self, path: &str) -> String {
        format!("http://{HOST}:{}{path}", self.rest_port)
    }
}

impl Drop for Servers {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
    }
}

/// A loopback port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind((HOST, 0)).unwrap();
    listener.local_addr().unwrap().port()
}

mod grpc;
mod rest;
