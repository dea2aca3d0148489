//! CLI command modules.

pub mod arrays;
pub mod grpc;
pub mod rest;
