//! Configuration-space distances
//!
//! Both metrics are weighted Euclidean norms of `model.difference(q1, q2)`,
//! so periodic joints are measured the short way around:
//!
//! ```text
//! d(q1, q2) = sqrt(Σᵢ (wᵢ · (q2 ⊖ q1)ᵢ)²)
//! ```

use std::fmt::Debug;
use std::sync::Arc;

use cspace_core::error::check_dimension;
use cspace_core::model::ConfigurationModel;
use cspace_core::Configuration;
use nalgebra::DVector;

use crate::error::PlannerError;

/// Metric on configurations
///
/// Implementations must be symmetric, non-negative and zero only for equal
/// configurations.
pub trait Distance: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn distance(&self, q1: &Configuration, q2: &Configuration) -> f64;
}

fn weighted_norm(model: &dyn ConfigurationModel, weights: &DVector<f64>, q1: &Configuration, q2: &Configuration) -> f64 {
    model.difference(q2, q1).component_mul(weights).norm()
}

/// Per-joint weights; unit by default
#[derive(Debug, Clone)]
pub struct WeighedDistance {
    model: Arc<dyn ConfigurationModel>,
    weights: DVector<f64>,
}

impl WeighedDistance {
    pub fn new(model: Arc<dyn ConfigurationModel>) -> Self {
        let weights = DVector::from_element(model.velocity_size(), 1.0);
        Self { model, weights }
    }

    pub fn with_weights(model: Arc<dyn ConfigurationModel>, weights: &[f64]) -> Result<Self, PlannerError> {
        check_dimension("distance weights", model.velocity_size(), weights.len())?;
        if weights.iter().any(|w| !(*w > 0.0)) {
            return Err(PlannerError::InvalidArgument(
                "distance weights must be positive".to_string(),
            ));
        }
        Ok(Self {
            model,
            weights: DVector::from_column_slice(weights),
        })
    }

    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }
}

impl Distance for WeighedDistance {
    fn name(&self) -> &'static str {
        "WeighedDistance"
    }

    fn distance(&self, q1: &Configuration, q2: &Configuration) -> f64 {
        weighted_norm(self.model.as_ref(), &self.weights, q1, q2)
    }
}

/// Each joint scaled by the inverse of its range (2π for continuous joints)
///
/// Weights are derived from the bounds once, at construction.
#[derive(Debug, Clone)]
pub struct NormalizedDistance {
    model: Arc<dyn ConfigurationModel>,
    weights: DVector<f64>,
}

impl NormalizedDistance {
    pub fn new(model: Arc<dyn ConfigurationModel>) -> Self {
        let mut weights = DVector::from_element(model.velocity_size(), 1.0);
        for joint in model.joints() {
            let (lower, upper) = joint.sampling_range();
            let range = upper - lower;
            if range > f64::EPSILON {
                weights[joint.velocity_rank] = 1.0 / range;
            }
        }
        Self { model, weights }
    }
}

impl Distance for NormalizedDistance {
    fn name(&self) -> &'static str {
        "NormalizedDistance"
    }

    fn distance(&self, q1: &Configuration, q2: &Configuration) -> f64 {
        weighted_norm(self.model.as_ref(), &self.weights, q1, q2)
    }
}
