//! Projection solver configuration

use serde::{Deserialize, Serialize};

/// Parameters of the constraint projection solver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Residual norm below which a configuration satisfies the constraints
    pub error_threshold: f64,
    /// Maximum number of Newton iterations per projection
    pub max_iterations: usize,
    /// Damping λ of the least-squares step (σ / (σ² + λ²))
    pub damping: f64,
    /// Singular values below this are treated as zero in null-space updates
    pub singular_threshold: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            error_threshold: 1e-6,
            max_iterations: 40,
            damping: 1e-6,
            singular_threshold: 1e-9,
        }
    }
}
