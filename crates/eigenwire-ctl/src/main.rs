//! eigenwire-ctl: command-line client for the eigenwired array services.
//!
//! Arrays are given as JSON lists: `[1,2,3]` is a vector, `[[1,2],[3,4]]`
//! a matrix.

mod cmd;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use eigenwire_core::config::{check_chunk_limit, EigenwireConfig};
use eigenwire_core::element::ElementType;

use cmd::grpc::Target;
use cmd::rest::RestOp;

#[derive(Parser)]
#[command(name = "eigenwire-ctl", version, about = "Client for the eigenwired array services")]
struct Cli {
    /// Server host for both transports. Defaults to the configured hosts.
    #[arg(long, global = true)]
    host: Option<String>,

    #[arg(long, global = true)]
    grpc_port: Option<u16>,

    #[arg(long, global = true)]
    rest_port: Option<u16>,

    /// Send gRPC operands as 32-bit integers instead of doubles.
    #[arg(long, global = true)]
    integer: bool,

    /// gRPC connect timeout in seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Largest chunk payload sent or accepted, in bytes.
    #[arg(long, global = true)]
    max_chunk_bytes: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Greet the gRPC server.
    Hello {
        #[arg(long, default_value = "eigenwire")]
        name: String,
    },
    /// Reverse a vector.
    Flip { vector: String },
    /// Sum any number of vectors or matrices of one shape.
    Add {
        #[arg(required = true)]
        arrays: Vec<String>,
    },
    /// Dot product of two vectors.
    Dot { a: String, b: String },
    /// Product of two square matrices.
    Matmul { a: String, b: String },
    /// Operations through the REST API (doubles only).
    Rest {
        #[command(subcommand)]
        op: RestCommand,
    },
}

#[derive(Subcommand)]
enum RestCommand {
    Add { a: String, b: String },
    Sub { a: String, b: String },
    Mul { a: String, b: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Flags win over the shared config file, which wins over defaults.
    let config = EigenwireConfig::load().context("failed to load config")?;
    let grpc_host = cli.host.clone().unwrap_or(config.grpc.host);
    let rest_host = cli.host.unwrap_or(config.rest.host);

    let element_type = if cli.integer {
        ElementType::Integer
    } else {
        ElementType::Double
    };
    let max_chunk_bytes = cli.max_chunk_bytes.unwrap_or(config.transfer.max_chunk_bytes);
    check_chunk_limit(max_chunk_bytes).context("invalid --max-chunk-bytes")?;

    let target = Target {
        host: grpc_host,
        port: cli.grpc_port.unwrap_or(config.grpc.port),
        timeout: Duration::from_secs(cli.timeout.unwrap_or(config.grpc.connect_timeout_secs)),
        max_chunk_bytes,
    };
    let rest_port = cli.rest_port.unwrap_or(config.rest.port);

    match cli.command {
        Command::Hello { name } => cmd::grpc::cmd_hello(&target, &name).await,
        Command::Flip { vector } => cmd::grpc::cmd_flip(&target, &vector, element_type).await,
        Command::Add { arrays } => cmd::grpc::cmd_add(&target, &arrays, element_type).await,
        Command::Dot { a, b } => cmd::grpc::cmd_dot(&target, &a, &b, element_type).await,
        Command::Matmul { a, b } => cmd::grpc::cmd_matmul(&target, &a, &b, element_type).await,
        Command::Rest { op } => {
            let (op, a, b) = match op {
                RestCommand::Add { a, b } => (RestOp::Add, a, b),
                RestCommand::Sub { a, b } => (RestOp::Sub, a, b),
                RestCommand::Mul { a, b } => (RestOp::Mul, a, b),
            };
            cmd::rest::cmd_rest(&rest_host, rest_port, op, &a, &b).await
        }
    }
}
