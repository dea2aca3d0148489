//! JSON nested-list form of arrays, shared by the REST layer and the CLI.
//!
//! A flat list of numbers is a vector; a list of equal-length lists is a
//! matrix. Anything deeper is rejected.

use serde_json::Value;

use crate::array::{ArrayError, NumericArray};
use crate::element::{Element, ElementType};

#[derive(Debug, thiserror::Error)]
pub enum JsonArrayError {
    #[error("expected a JSON list")]
    NotAList,
    #[error("lists nested deeper than two levels are not supported")]
    TooDeep,
    #[error("mixed scalars and lists at the same level")]
    MixedNesting,
    #[error("element at {position} is not a number")]
    NotNumeric { position: String },
    #[error("element at {position} does not fit a 32-bit integer")]
    NotInteger { position: String },
    #[error(transparent)]
    Array(#[from] ArrayError),
}

/// Parse a JSON list into an array of element type `ty`.
pub fn parse_array(value: &Value, ty: ElementType) -> Result<NumericArray, JsonArrayError> {
    match ty {
        ElementType::Integer => parse_typed::<i32>(value, integer_at),
        ElementType::Double => parse_typed::<f64>(value, double_at),
    }
}

fn parse_typed<T: Element>(
    value: &Value,
    scalar: fn(&Value, String) -> Result<T, JsonArrayError>,
) -> Result<NumericArray, JsonArrayError> {
    let items = value.as_array().ok_or(JsonArrayError::NotAList)?;
    let nested = items.iter().filter(|v| v.is_array()).count();

    if nested == 0 {
        let values = items
            .iter()
            .enumerate()
            .map(|(i, v)| scalar(v, format!("[{i}]")))
            .collect::<Result<Vec<T>, _>>()?;
        return Ok(NumericArray::vector(values));
    }
    if nested != items.len() {
        return Err(JsonArrayError::MixedNesting);
    }

    let mut rows = Vec::with_capacity(items.len());
    for (r, row) in items.iter().enumerate() {
        let cells = row.as_array().ok_or(JsonArrayError::MixedNesting)?;
        if cells.iter().any(Value::is_array) {
            return Err(JsonArrayError::TooDeep);
        }
        let parsed = cells
            .iter()
            .enumerate()
            .map(|(c, v)| scalar(v, format!("[{r}][{c}]")))
            .collect::<Result<Vec<T>, _>>()?;
        rows.push(parsed);
    }
    Ok(NumericArray::from_rows(rows)?)
}

fn integer_at(value: &Value, position: String) -> Result<i32, JsonArrayError> {
    let Some(n) = value.as_number() else {
        return Err(JsonArrayError::NotNumeric { position });
    };
    n.as_i64()
        .and_then(|i| i32::try_from(i).ok())
        .ok_or(JsonArrayError::NotInteger { position })
}

fn double_at(value: &Value, position: String) -> Result<f64, JsonArrayError> {
    value.as_f64().ok_or(JsonArrayError::NotNumeric { position })
}

/// Render an array as a JSON list (vector) or list of lists (matrix).
pub fn to_json(array: &NumericArray) -> Value {
    use crate::array::{Shape, Values};

    fn flat<T: Copy + Into<Value>>(values: &[T]) -> Value {
        Value::Array(values.iter().map(|v| (*v).into()).collect())
    }

    fn nested<T: Copy + Into<Value>>(values: &[T], rows: usize, cols: usize) -> Value {
        // `chunks` cannot split zero-width rows, and they still count.
        if cols == 0 {
            return Value::Array(vec![Value::Array(Vec::new()); rows]);
        }
        Value::Array(values.chunks(cols).map(flat).collect())
    }

    match (array.shape(), array.values()) {
        (Shape::Vector { .. }, Values::Integer(v)) => flat(v),
        (Shape::Vector { .. }, Values::Double(v)) => flat(v),
        (Shape::Matrix { rows, cols }, Values::Integer(v)) => nested(v, rows, cols),
        (Shape::Matrix { rows, cols }, Values::Double(v)) => nested(v, rows, cols),
    }
}
