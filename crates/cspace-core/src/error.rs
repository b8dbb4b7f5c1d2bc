//! Error types
//!
//! Boundary errors of the core crate. Numerical failures (non-convergence,
//! invalid configurations) are never errors: they are reported as data.

use thiserror::Error;

/// Coarse classification of an error at the API boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input (dimension mismatch, bad parameter)
    Validation,
    /// Unknown name or identifier
    NotFound,
    /// Operation invalid in the current state
    State,
}

/// Core errors
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid {what} dimension: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Unknown constraint: {0}")]
    UnknownConstraint(String),
    #[error("Unknown joint: {0}")]
    UnknownJoint(String),
    #[error("Unknown frame: {0}")]
    UnknownFrame(String),
    #[error("Unknown passive dof set: {0}")]
    UnknownPassiveDofs(String),
    #[error("Constraint {0} has a constant right-hand side")]
    ConstantRightHandSide(String),
    #[error("Value {value} of joint {joint} is outside [{lower}, {upper}]")]
    OutOfBounds {
        joint: String,
        value: f64,
        lower: f64,
        upper: f64,
    },
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::UnknownConstraint(_)
            | CoreError::UnknownJoint(_)
            | CoreError::UnknownFrame(_)
            | CoreError::UnknownPassiveDofs(_) => ErrorKind::NotFound,
            CoreError::DimensionMismatch { .. }
            | CoreError::InvalidParameter(_)
            | CoreError::ConstantRightHandSide(_)
            | CoreError::OutOfBounds { .. } => ErrorKind::Validation,
        }
    }
}

/// Check that a vector has the expected length
pub fn check_dimension(what: &'static str, expected: usize, got: usize) -> Result<(), CoreError> {
    if expected != got {
        return Err(CoreError::DimensionMismatch { what, expected, got });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_dimension() {
        assert!(check_dimension("configuration", 3, 3).is_ok());

        let err = check_dimension("configuration", 3, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            err.to_string(),
            "Invalid configuration dimension: expected 3, got 2"
        );
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(CoreError::UnknownJoint("j".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            CoreError::ConstantRightHandSide("c".into()).kind(),
            ErrorKind::Validation
        );
    }
}
