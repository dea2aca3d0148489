//! gRPC commands: hello, flip, add, dot, matmul.

use std::time::Duration;

use anyhow::{bail, Context, Result};

use eigenwire_core::array::ArrayKind;
use eigenwire_core::element::ElementType;
use eigenwire_grpc::ArrayClient;

use super::arrays;

pub struct Target {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
    pub max_chunk_bytes: usize,
}

async fn connect(target: &Target) -> Result<ArrayClient> {
    ArrayClient::connect_with_limit(&target.host, target.port, target.timeout, target.max_chunk_bytes)
        .await
        .with_context(|| {
            format!(
                "failed to connect to eigenwired at {}:{}, is it running?",
                target.host, target.port
            )
        })
}

pub async fn cmd_hello(target: &Target, name: &str) -> Result<()> {
    let mut client = connect(target).await?;
    let reply = client.say_hello(name).await.context("SayHello failed")?;
    println!("{reply}");
    Ok(())
}

pub async fn cmd_flip(target: &Target, arg: &str, element_type: ElementType) -> Result<()> {
    let vector = arrays::parse(arg, element_type)?;
    let mut client = connect(target).await?;
    let result = client.flip_vector(vector).await.context("FlipVector failed")?;
    arrays::print("Flipped", &result);
    Ok(())
}

pub async fn cmd_add(target: &Target, args: &[String], element_type: ElementType) -> Result<()> {
    let operands = arrays::parse_all(args, element_type)?;
    let Some(first) = operands.first() else {
        bail!("add needs at least one array");
    };
    let kind = first.kind();
    let mut client = connect(target).await?;
    let result = match kind {
        ArrayKind::Vector => client.add_vectors(operands).await.context("AddVectors failed")?,
        ArrayKind::Matrix => client.add_matrices(operands).await.context("AddMatrices failed")?,
    };
    arrays::print("Sum", &result);
    Ok(())
}

pub async fn cmd_dot(target: &Target, a: &str, b: &str, element_type: ElementType) -> Result<()> {
    let a = arrays::parse(a, element_type)?;
    let b = arrays::parse(b, element_type)?;
    let mut client = connect(target).await?;
    let result = client
        .multiply_vectors(a, b)
        .await
        .context("MultiplyVectors failed")?;
    arrays::print("Dot product", &result);
    Ok(())
}

pub async fn cmd_matmul(target: &Target, a: &str, b: &str, element_type: ElementType) -> Result<()> {
    let a = arrays::parse(a, element_type)?;
    let b = arrays::parse(b, element_type)?;
    let mut client = connect(target).await?;
    let result = client
        .multiply_matrices(a, b)
        .await
        .context("MultiplyMatrices failed")?;
    arrays::print("Product", &result);
    Ok(())
}
