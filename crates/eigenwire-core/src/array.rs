//! Typed, shaped numeric arrays.
//!
//! A `NumericArray` is either a vector or a row-major matrix of one element
//! type. Construction checks that the buffer length matches the shape, so
//! every array that exists is internally consistent.

use crate::element::{Element, ElementType};

/// Vector or matrix. Each call moves arrays of exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayKind {
    Vector,
    Matrix,
}

impl ArrayKind {
    /// Plural form, used in the `full-<kind>` metadata key.
    pub const fn plural(self) -> &'static str {
        match self {
            ArrayKind::Vector => "vectors",
            ArrayKind::Matrix => "matrices",
        }
    }

    /// Short form, used in the `<abbrev><i>-messages` metadata key.
    pub const fn abbrev(self) -> &'static str {
        match self {
            ArrayKind::Vector => "vec",
            ArrayKind::Matrix => "mat",
        }
    }

    pub const fn singular(self) -> &'static str {
        match self {
            ArrayKind::Vector => "vector",
            ArrayKind::Matrix => "matrix",
        }
    }
}

impl std::fmt::Display for ArrayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.singular())
    }
}

/// Declared shape of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Vector { len: usize },
    Matrix { rows: usize, cols: usize },
}

impl Shape {
    pub const fn kind(&self) -> ArrayKind {
        match self {
            Shape::Vector { .. } => ArrayKind::Vector,
            Shape::Matrix { .. } => ArrayKind::Matrix,
        }
    }

    /// Number of elements the shape describes. Saturates rather than
    /// overflowing, since wire-declared dimensions are untrusted.
    pub const fn element_count(&self) -> usize {
        match *self {
            Shape::Vector { len } => len,
            Shape::Matrix { rows, cols } => rows.saturating_mul(cols),
        }
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shape::Vector { len } => write!(f, "vector[{len}]"),
            Shape::Matrix { rows, cols } => write!(f, "matrix[{rows}x{cols}]"),
        }
    }
}

/// Owned element buffer, tagged with its element type.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Integer(Vec<i32>),
    Double(Vec<f64>),
}

impl Values {
    pub fn element_type(&self) -> ElementType {
        match self {
            Values::Integer(_) => ElementType::Integer,
            Values::Double(_) => ElementType::Double,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Values::Integer(v) => v.len(),
            Values::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payload size in bytes on the wire.
    pub fn byte_len(&self) -> usize {
        self.len() * self.element_type().width()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArrayError {
    #[error("{shape} needs {expected} elements, got {actual}")]
    ShapeMismatch {
        shape: Shape,
        expected: usize,
        actual: usize,
    },
    #[error("row {row} has {found} columns, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// A vector or row-major matrix with a buffer that matches its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray {
    shape: Shape,
    values: Values,
}

impl NumericArray {
    pub fn new(shape: Shape, values: Values) -> Result<Self, ArrayError> {
        let expected = shape.element_count();
        if values.len() != expected {
            return Err(ArrayError::ShapeMismatch {
                shape,
                expected,
                actual: values.len(),
            });
        }
        Ok(Self { shape, values })
    }

    pub fn vector<T: Element>(values: Vec<T>) -> Self {
        Self {
            shape: Shape::Vector { len: values.len() },
            values: T::into_values(values),
        }
    }

    /// Row-major matrix from a flat buffer.
    pub fn matrix<T: Element>(rows: usize, cols: usize, values: Vec<T>) -> Result<Self, ArrayError> {
        Self::new(Shape::Matrix { rows, cols }, T::into_values(values))
    }

    /// Matrix from nested rows. All rows must have the same length.
    pub fn from_rows<T: Element>(rows: Vec<Vec<T>>) -> Result<Self, ArrayError> {
        let cols = rows.first().map_or(0, Vec::len);
        let row_count = rows.len();
        let mut flat = Vec::with_capacity(row_count * cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(ArrayError::Ragged {
                    row: i,
                    expected: cols,
                    found: row.len(),
                });
            }
            flat.extend(row);
        }
        Self::matrix(row_count, cols, flat)
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn kind(&self) -> ArrayKind {
        self.shape.kind()
    }

    pub fn element_type(&self) -> ElementType {
        self.values.element_type()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    /// Borrow the elements as `T`; `None` if the element type differs.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::view(&self.values)
    }

    pub fn into_vec<T: Element>(self) -> Option<Vec<T>> {
        T::take(self.values)
    }

    /// Element-wise negation; integers wrap. Subtraction is sent as
    /// addition of the negated operand.
    pub fn negated(&self) -> NumericArray {
        let values = match &self.values {
            Values::Integer(v) => Values::Integer(v.iter().map(|x| x.wrapping_neg()).collect()),
            Values::Double(v) => Values::Double(v.iter().map(|x| -x).collect()),
        };
        Self {
            shape: self.shape,
            values,
        }
    }
}
