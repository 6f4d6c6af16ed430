//! Error taxonomy for the tensor engine (spec §7).
//!
//! Every fallible public operation returns `Result<T, TensorError>`. Errors
//! are raised at the API boundary before any output buffer is allocated;
//! once a kernel loop begins it cannot fail (non-finite values propagate as
//! NaN/Inf, never as an error).

/// The six error kinds of the engine. Each variant carries a short
/// human-readable reason and, where useful, the offending operand position.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorError {
    /// Broadcast incompatibility, assign-size mismatch, non-square matrix,
    /// ragged nested array, reshape size mismatch, unknown-dim inference
    /// failure.
    Shape(ShapeError),
    /// Out of bounds, non-integer index, complex index, invalid slice
    /// syntax, zero slice step.
    Index(IndexError),
    /// Operation unavailable for the given (dtype, complexity) combination,
    /// storing complex into a logic tensor, in-place downcast, complex/NaN
    /// to logic conversion.
    DType(DTypeError),
    /// Empty input where elements are required, reading imag data on a
    /// real-only tensor, in-place on a non-tensor first operand.
    State(StateError),
    /// Non-finite where disallowed, non-positive-definite matrix,
    /// iteration-limit exceeded.
    Numeric(NumericError),
    /// Unsupported input type at the edge of the core.
    InvalidInput(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeError {
    BroadcastMismatch { lhs: Vec<usize>, rhs: Vec<usize> },
    SizeMismatch { expected: usize, got: usize },
    NotSquare { shape: Vec<usize> },
    Ragged { position: usize, reason: String },
    ReshapeMismatch { from: Vec<usize>, to: Vec<usize> },
    UnknownDimInference { shape: Vec<isize> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexError {
    OutOfBounds { axis: usize, index: isize, len: usize },
    NonInteger,
    Complex,
    InvalidSlice(String),
    ZeroStep,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DTypeError {
    Unavailable { reason: String },
    ComplexIntoLogic,
    InPlaceDowncast { from: String, to: String },
    NonFiniteToLogic,
    ComplexToLogic,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StateError {
    EmptyInput,
    NoImaginaryStorage,
    InPlaceOnNonTensor,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NumericError {
    NonFinite,
    NotPositiveDefinite,
    IterationLimitExceeded { limit: usize },
}

impl std::fmt::Display for TensorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TensorError::Shape(e) => write!(f, "shape error: {e}"),
            TensorError::Index(e) => write!(f, "index error: {e}"),
            TensorError::DType(e) => write!(f, "dtype error: {e}"),
            TensorError::State(e) => write!(f, "state error: {e}"),
            TensorError::Numeric(e) => write!(f, "numeric error: {e}"),
            TensorError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl std::fmt::Display for ShapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeError::BroadcastMismatch { lhs, rhs } => {
                write!(f, "cannot broadcast shapes {lhs:?} and {rhs:?}")
            }
            ShapeError::SizeMismatch { expected, got } => {
                write!(f, "expected {expected} elements, got {got}")
            }
            ShapeError::NotSquare { shape } => write!(f, "expected a square matrix, got {shape:?}"),
            ShapeError::Ragged { position, reason } => {
                write!(f, "ragged nested array at position {position}: {reason}")
            }
            ShapeError::ReshapeMismatch { from, to } => {
                write!(f, "cannot reshape {from:?} into {to:?}")
            }
            ShapeError::UnknownDimInference { shape } => {
                write!(f, "cannot infer unknown dimension in shape {shape:?}")
            }
        }
    }
}

impl std::fmt::Display for IndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexError::OutOfBounds { axis, index, len } => write!(
                f,
                "index {index} out of bounds for axis {axis} with length {len}"
            ),
            IndexError::NonInteger => write!(f, "index must be an integer"),
            IndexError::Complex => write!(f, "index must not be complex"),
            IndexError::InvalidSlice(s) => write!(f, "invalid slice syntax: {s}"),
            IndexError::ZeroStep => write!(f, "slice step must not be zero"),
        }
    }
}

impl std::fmt::Display for DTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DTypeError::Unavailable { reason } => write!(f, "operation unavailable: {reason}"),
            DTypeError::ComplexIntoLogic => write!(f, "cannot store complex value into a logic tensor"),
            DTypeError::InPlaceDowncast { from, to } => write!(
                f,
                "in-place result dtype {to} is wider than operand dtype {from}"
            ),
            DTypeError::NonFiniteToLogic => write!(f, "cannot convert non-finite value to logic"),
            DTypeError::ComplexToLogic => write!(f, "cannot convert complex value to logic"),
        }
    }
}

impl std::fmt::Display for StateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateError::EmptyInput => write!(f, "operation requires at least one element"),
            StateError::NoImaginaryStorage => write!(f, "tensor has no imaginary storage"),
            StateError::InPlaceOnNonTensor => {
                write!(f, "in-place operation requires the first operand to be a tensor")
            }
        }
    }
}

impl std::fmt::Display for NumericError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NumericError::NonFinite => write!(f, "non-finite value where disallowed"),
            NumericError::NotPositiveDefinite => write!(f, "matrix is not positive definite"),
            NumericError::IterationLimitExceeded { limit } => {
                write!(f, "iteration limit of {limit} exceeded")
            }
        }
    }
}

impl std::error::Error for TensorError {}

impl From<ShapeError> for TensorError {
    fn from(e: ShapeError) -> Self {
        TensorError::Shape(e)
    }
}

impl From<IndexError> for TensorError {
    fn from(e: IndexError) -> Self {
        TensorError::Index(e)
    }
}

impl From<DTypeError> for TensorError {
    fn from(e: DTypeError) -> Self {
        TensorError::DType(e)
    }
}

impl From<StateError> for TensorError {
    fn from(e: StateError) -> Self {
        TensorError::State(e)
    }
}

impl From<NumericError> for TensorError {
    fn from(e: NumericError) -> Self {
        TensorError::Numeric(e)
    }
}

pub type Result<T> = std::result::Result<T, TensorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_are_human_readable() {
        let e: TensorError = ShapeError::BroadcastMismatch {
            lhs: vec![3, 1],
            rhs: vec![2],
        }
        .into();
        assert!(e.to_string().contains("broadcast"));
    }

    #[test]
    fn converts_via_from() {
        let e: TensorError = IndexError::ZeroStep.into();
        assert_eq!(e, TensorError::Index(IndexError::ZeroStep));
    }
}
