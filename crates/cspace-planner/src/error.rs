//! Planner errors

use cspace_core::{CoreError, ErrorKind};
use thiserror::Error;

use crate::{ComponentId, EdgeId, NodeId, PathId};

/// Planner errors
///
/// Every error leaves the problem it was raised on unchanged.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("Unknown problem: {0}")]
    UnknownProblem(String),
    #[error("Unknown path: {0}")]
    UnknownPath(PathId),
    #[error("Unknown roadmap node: {0}")]
    UnknownNode(NodeId),
    #[error("Unknown roadmap edge: {0}")]
    UnknownEdge(EdgeId),
    #[error("Unknown connected component: {0}")]
    UnknownComponent(ComponentId),
    #[error("Unknown {category}: {name}")]
    UnknownStrategy { category: &'static str, name: String },
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),
    #[error("Invalid value for parameter {key}: {reason}")]
    InvalidParameter { key: String, reason: String },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Initial configuration is not set")]
    MissingInitConfig,
    #[error("No goal configuration or goal constraint is defined")]
    MissingGoal,
    #[error("Cannot {operation} in state {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },
    #[error("Paths {first} and {second} are not continuous")]
    DiscontinuousPaths { first: PathId, second: PathId },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PlannerError {
    fn from(e: serde_json::Error) -> Self {
        PlannerError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for PlannerError {
    fn from(e: serde_yaml::Error) -> Self {
        PlannerError::Serialization(e.to_string())
    }
}

impl PlannerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlannerError::Core(e) => e.kind(),
            PlannerError::UnknownProblem(_)
            | PlannerError::UnknownPath(_)
            | PlannerError::UnknownNode(_)
            | PlannerError::UnknownEdge(_)
            | PlannerError::UnknownComponent(_)
            | PlannerError::UnknownStrategy { .. }
            | PlannerError::UnknownParameter(_)
            | PlannerError::MissingInitConfig => ErrorKind::NotFound,
            PlannerError::InvalidState { .. } => ErrorKind::State,
            PlannerError::InvalidParameter { .. }
            | PlannerError::InvalidArgument(_)
            | PlannerError::MissingGoal
            | PlannerError::DiscontinuousPaths { .. }
            | PlannerError::Io(_)
            | PlannerError::Serialization(_) => ErrorKind::Validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_keep_their_kind() {
        let err: PlannerError = CoreError::UnknownJoint("elbow".into()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Unknown joint: elbow");
    }

    #[test]
    fn test_state_errors() {
        let err = PlannerError::InvalidState {
            operation: "prepare",
            state: "Stepping".into(),
        };
        assert_eq!(err.kind(), ErrorKind::State);
        assert_eq!(err.to_string(), "Cannot prepare in state Stepping");
    }
}
