//! eigenwire-rest: JSON resource API over a SQLite array store, and a
//! client for it.

pub mod client;
pub mod handlers;
pub mod store;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

pub use client::{RestClient, RestClientError, RestResult};
pub use handlers::ApiState;
pub use store::{ArrayStore, StoreError};

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/Vectors", post(handlers::handle_post_vector))
        .route("/Matrices", post(handlers::handle_post_matrix))
        .route("/add/Vectors", get(handlers::handle_add_vectors))
        .route("/multiply/Vectors", get(handlers::handle_multiply_vectors))
        .route("/add/Matrices", get(handlers::handle_add_matrices))
        .route("/multiply/Matrices", get(handlers::handle_multiply_matrices))
        .with_state(state)
        // Array payloads have no size bound.
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
}

/// Serve the API on an already-bound listener until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    state: ApiState,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "REST API listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("REST API shutting down");
        })
        .await
}
