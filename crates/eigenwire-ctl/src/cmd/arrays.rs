//! Parsing and printing arrays on the command line.

use anyhow::{Context, Result};

use eigenwire_core::array::{NumericArray, Shape, Values};
use eigenwire_core::element::ElementType;
use eigenwire_core::json::parse_array;

/// Parse a JSON list argument such as `[1,2,3]` or `[[1,2],[3,4]]`.
pub fn parse(arg: &str, element_type: ElementType) -> Result<NumericArray> {
    let value: serde_json::Value =
        serde_json::from_str(arg).with_context(|| format!("not valid JSON: {arg}"))?;
    parse_array(&value, element_type).with_context(|| format!("not a vector or matrix: {arg}"))
}

pub fn parse_all(args: &[String], element_type: ElementType) -> Result<Vec<NumericArray>> {
    args.iter().map(|a| parse(a, element_type)).collect()
}

fn render<T: std::fmt::Display>(values: &[T]) -> String {
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

fn render_rows<T: std::fmt::Display>(values: &[T], cols: usize) {
    if cols == 0 {
        println!("  []");
        return;
    }
    for row in values.chunks(cols) {
        println!("  {}", render(row));
    }
}

pub fn print(title: &str, array: &NumericArray) {
    println!("═══════════════════════════════════════");
    println!("  {} ({} {})", title, array.shape(), array.element_type());
    println!("═══════════════════════════════════════");
    match (array.shape(), array.values()) {
        (Shape::Vector { .. }, Values::Integer(v)) => println!("  {}", render(v)),
        (Shape::Vector { .. }, Values::Double(v)) => println!("  {}", render(v)),
        (Shape::Matrix { cols, .. }, Values::Integer(v)) => render_rows(v, cols),
        (Shape::Matrix { cols, .. }, Values::Double(v)) => render_rows(v, cols),
    }
}
