//! Array operations behind the RPC surface.
//!
//! All operands of one call must share kind, element type, and shape.
//! Results keep the operands' element type. Integer arithmetic wraps on
//! overflow instead of panicking.

use std::num::Wrapping;

use ndarray::{Array1, Array2, ArrayView1, LinalgScalar, Zip};

use crate::array::{ArrayError, ArrayKind, NumericArray, Shape};
use crate::element::{Element, ElementType};

#[derive(Debug, thiserror::Error)]
pub enum OpError {
    #[error("{op} takes {expected} operand(s), got {found}")]
    WrongOperandCount {
        op: &'static str,
        expected: &'static str,
        found: usize,
    },
    #[error("{op} operates on {expected}s, operand {index} is a {found}")]
    KindMismatch {
        op: &'static str,
        index: usize,
        expected: ArrayKind,
        found: ArrayKind,
    },
    #[error("operand {index} has element type {found}, expected {expected}")]
    ElementTypeMismatch {
        index: usize,
        expected: ElementType,
        found: ElementType,
    },
    #[error("operand {index} is a {found}, expected {expected}")]
    ShapeMismatch {
        index: usize,
        expected: Shape,
        found: Shape,
    },
    #[error("matrix multiplication needs square matrices, got {0}")]
    NotSquare(Shape),
    #[error(transparent)]
    Array(#[from] ArrayError),
    #[error("array layout: {0}")]
    Layout(#[from] ndarray::ShapeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Reverse a single vector.
    Flip,
    /// Element-wise sum of one or more arrays.
    Add,
    /// Dot product of two vectors, returned as a one-element vector.
    Dot,
    /// Product of two square matrices.
    MatMul,
}

impl Operation {
    pub const fn name(self) -> &'static str {
        match self {
            Operation::Flip => "flip",
            Operation::Add => "add",
            Operation::Dot => "dot",
            Operation::MatMul => "matmul",
        }
    }

    /// Fixed operand kind, if the operation has one.
    pub const fn kind(self) -> Option<ArrayKind> {
        match self {
            Operation::Flip | Operation::Dot => Some(ArrayKind::Vector),
            Operation::MatMul => Some(ArrayKind::Matrix),
            Operation::Add => None,
        }
    }

    fn check_count(self, found: usize) -> Result<(), OpError> {
        let (ok, expected) = match self {
            Operation::Flip => (found == 1, "exactly 1"),
            Operation::Add => (found >= 1, "at least 1"),
            Operation::Dot | Operation::MatMul => (found == 2, "exactly 2"),
        };
        if ok {
            Ok(())
        } else {
            Err(OpError::WrongOperandCount {
                op: self.name(),
                expected,
                found,
            })
        }
    }

    pub fn apply(self, operands: &[NumericArray]) -> Result<NumericArray, OpError> {
        self.check_count(operands.len())?;
        let first = &operands[0];
        let kind = self.kind().unwrap_or(first.kind());
        for (index, a) in operands.iter().enumerate() {
            if a.kind() != kind {
                return Err(OpError::KindMismatch {
                    op: self.name(),
                    index,
                    expected: kind,
                    found: a.kind(),
                });
            }
            if a.element_type() != first.element_type() {
                return Err(OpError::ElementTypeMismatch {
                    index,
                    expected: first.element_type(),
                    found: a.element_type(),
                });
            }
            if a.shape() != first.shape() {
                return Err(OpError::ShapeMismatch {
                    index,
                    expected: first.shape(),
                    found: a.shape(),
                });
            }
        }

        match first.element_type() {
            ElementType::Integer => compute::<i32, Wrapping<i32>>(self, operands, Wrapping, |w| w.0),
            ElementType::Double => compute::<f64, f64>(self, operands, |x| x, |x| x),
        }
    }
}

/// Run `op` over validated operands, lifting `T` into arithmetic type `S`.
fn compute<T, S>(
    op: Operation,
    operands: &[NumericArray],
    lift: fn(T) -> S,
    lower: fn(S) -> T,
) -> Result<NumericArray, OpError>
where
    T: Element,
    S: LinalgScalar,
{
    let shape = operands[0].shape();
    let slices: Vec<&[T]> = operands
        .iter()
        .filter_map(|a| a.as_slice::<T>())
        .collect();

    match op {
        Operation::Flip => {
            let mut out = slices[0].to_vec();
            out.reverse();
            Ok(NumericArray::vector(out))
        }
        Operation::Add => {
            let mut acc = Array1::<S>::zeros(shape.element_count());
            for s in &slices {
                Zip::from(&mut acc)
                    .and(&ArrayView1::from(*s))
                    .for_each(|a, &b| *a = *a + lift(b));
            }
            let out: Vec<T> = acc.into_iter().map(lower).collect();
            Ok(NumericArray::new(shape, T::into_values(out))?)
        }
        Operation::Dot => {
            let a: Array1<S> = slices[0].iter().map(|&x| lift(x)).collect();
            let b: Array1<S> = slices[1].iter().map(|&x| lift(x)).collect();
            Ok(NumericArray::vector(vec![lower(a.dot(&b))]))
        }
        Operation::MatMul => {
            let Shape::Matrix { rows, cols } = shape else {
                return Err(OpError::NotSquare(shape));
            };
            if rows != cols {
                return Err(OpError::NotSquare(shape));
            }
            let a = Array2::from_shape_vec((rows, cols), slices[0].iter().map(|&x| lift(x)).collect())?;
            let b = Array2::from_shape_vec((rows, cols), slices[1].iter().map(|&x| lift(x)).collect())?;
            let out: Vec<T> = a.dot(&b).iter().map(|&x| lower(x)).collect();
            Ok(NumericArray::matrix(rows, cols, out)?)
        }
    }
}
