//! Error types for native/dynamic value conversion

use dynrt::{HostError, ObjectKind};
use thiserror::Error;

/// Errors that can occur during value conversion
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The dynamic object's kind cannot be converted to the requested type
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: ObjectKind,
        found: ObjectKind,
    },

    /// The runtime could not allocate the destination object
    #[error("Memory allocation failed: heap limit of {limit} objects reached")]
    AllocationFailed {
        limit: usize,
    },

    /// Integer overflow during a narrowing conversion
    #[error("Integer overflow: value {value} doesn't fit in {target}")]
    IntegerOverflow {
        value: i128,
        target: &'static str,
    },

    /// Finite float outside the range of a narrower float type
    #[error("Float overflow: value {value} is out of range for {target}")]
    FloatOverflow {
        value: f64,
        target: &'static str,
    },

    /// String object is not valid UTF-8
    #[error("Invalid UTF-8 string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// String object contains a NUL byte and cannot become a C string
    #[error("Interior NUL byte in string: {0}")]
    InteriorNul(#[from] std::ffi::NulError),

    /// Wrapped pointer holds a different pointer or payload type
    #[error("Wrapped pointer type mismatch: expected {expected}, found {found}")]
    WrappedTypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Any other failure reported by the host runtime
    #[error("Host runtime error: {0}")]
    Host(HostError),
}

impl From<HostError> for ConversionError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::AllocationFailed { limit } => Self::AllocationFailed { limit },
            HostError::NotWrapped { found } => Self::TypeMismatch {
                expected: ObjectKind::Wrapped,
                found,
            },
            other => Self::Host(other),
        }
    }
}

impl ConversionError {
    /// Create a type mismatch error
    pub fn type_mismatch(expected: ObjectKind, found: ObjectKind) -> Self {
        Self::TypeMismatch { expected, found }
    }

    /// Create an integer overflow error for target type `T`
    pub fn overflow<T>(value: i128) -> Self {
        Self::IntegerOverflow {
            value,
            target: std::any::type_name::<T>(),
        }
    }

    /// Create a float overflow error for target type `T`
    pub fn float_overflow<T>(value: f64) -> Self {
        Self::FloatOverflow {
            value,
            target: std::any::type_name::<T>(),
        }
    }

    /// Check if this is an allocation failure
    pub fn is_allocation_failure(&self) -> bool {
        matches!(self, Self::AllocationFailed { .. })
    }
}

/// Result type for conversion operations
pub type ConversionResult<T> = Result<T, ConversionError>;
