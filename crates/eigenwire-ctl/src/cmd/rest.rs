//! REST commands: add, sub, mul on two double arrays.

use anyhow::{Context, Result};

use eigenwire_core::element::ElementType;
use eigenwire_rest::{RestClient, RestResult};

use super::arrays;

#[derive(Clone, Copy)]
pub enum RestOp {
    Add,
    Sub,
    Mul,
}

pub async fn cmd_rest(host: &str, port: u16, op: RestOp, a: &str, b: &str) -> Result<()> {
    let a = arrays::parse(a, ElementType::Double)?;
    let b = arrays::parse(b, ElementType::Double)?;
    let client = RestClient::new(host, port);

    let (title, result) = match op {
        RestOp::Add => ("Sum", client.add(&a, &b).await),
        RestOp::Sub => ("Difference", client.subtract(&a, &b).await),
        RestOp::Mul => ("Product", client.multiply(&a, &b).await),
    };
    let result = result.with_context(|| format!("REST call to {} failed", client.base_url()))?;

    match result {
        RestResult::Scalar(v) => {
            println!("═══════════════════════════════════════");
            println!("  {title}");
            println!("═══════════════════════════════════════");
            println!("  {v}");
        }
        RestResult::Array(array) => arrays::print(title, &array),
    }
    Ok(())
}
