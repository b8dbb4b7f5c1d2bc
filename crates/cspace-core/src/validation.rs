//! Configuration validity
//!
//! A configuration is valid when every joint lies within its bounds and no
//! body penetrates an obstacle by more than the penetration tolerance.

use std::fmt;
use std::sync::Arc;

use crate::error::{check_dimension, CoreError};
use crate::model::{CollisionPair, ConfigurationModel};
use crate::{Configuration, BOUNDS_EPSILON};

/// Reason a configuration is invalid
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    OutOfBounds {
        joint: String,
        value: f64,
        lower: f64,
        upper: f64,
    },
    Collision(CollisionPair),
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::OutOfBounds {
                joint,
                value,
                lower,
                upper,
            } => write!(f, "joint {} = {} outside [{}, {}]", joint, value, lower, upper),
            ValidationFailure::Collision(pair) => write!(
                f,
                "collision between {} and {} (distance {:.4})",
                pair.body, pair.obstacle, pair.distance
            ),
        }
    }
}

/// Outcome of a validity check
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub failures: Vec<ValidationFailure>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    /// First failure, if any
    pub fn first(&self) -> Option<&ValidationFailure> {
        self.failures.first()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "valid");
        }
        let messages: Vec<String> = self.failures.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

/// Joint-bounds and collision checker
#[derive(Debug, Clone)]
pub struct ConfigurationValidator {
    model: Arc<dyn ConfigurationModel>,
    /// Penetration depth tolerated before reporting a collision
    tolerance: f64,
}

impl ConfigurationValidator {
    pub fn new(model: Arc<dyn ConfigurationModel>, tolerance: f64) -> Self {
        Self {
            model,
            tolerance: tolerance.max(0.0),
        }
    }

    pub fn model(&self) -> &Arc<dyn ConfigurationModel> {
        &self.model
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance.max(0.0);
    }

    /// Check bounds first; collisions are only queried for in-bounds configurations
    pub fn validate(&self, q: &Configuration) -> Result<ValidationReport, CoreError> {
        check_dimension("configuration", self.model.config_size(), q.len())?;

        let mut report = ValidationReport::default();
        for joint in self.model.joints() {
            let value = q[joint.config_rank];
            if !joint.contains(value, BOUNDS_EPSILON) {
                report.failures.push(ValidationFailure::OutOfBounds {
                    joint: joint.name.clone(),
                    value,
                    lower: joint.lower,
                    upper: joint.upper,
                });
            }
        }
        if !report.is_valid() {
            return Ok(report);
        }

        report.failures.extend(
            self.model
                .collision_pairs(q)?
                .into_iter()
                .filter(|pair| pair.distance < -self.tolerance)
                .map(ValidationFailure::Collision),
        );
        Ok(report)
    }

    pub fn is_valid(&self, q: &Configuration) -> Result<bool, CoreError> {
        Ok(self.validate(q)?.is_valid())
    }
}
