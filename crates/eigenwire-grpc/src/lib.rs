//! eigenwire-grpc: the `eigenwire.v1.ArrayOps` service and its client.
//!
//! Arrays travel as bidirectional streams of `Vector` / `Matrix` chunks
//! with their chunk counts in call metadata. Chunking and reassembly live
//! in `eigenwire-core`; this crate only binds them to tonic.

pub mod proto {
    tonic::include_proto!("eigenwire.v1");
}

pub mod client;
pub mod error;
pub mod service;
pub mod wire;

pub use client::ArrayClient;
pub use error::ClientError;
pub use service::{serve, ArrayOpsService};
