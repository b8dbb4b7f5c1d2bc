//! Steering methods

use std::fmt::Debug;
use std::sync::Arc;

use cspace_core::error::check_dimension;
use cspace_core::model::ConfigurationModel;
use cspace_core::Configuration;

use crate::distance::Distance;
use crate::error::PlannerError;
use crate::path::Path;

/// Produces a path between two configurations
///
/// `Ok(None)` means the method cannot connect the pair; that is an outcome,
/// not an error.
pub trait SteeringMethod: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn steer(&self, q1: &Configuration, q2: &Configuration) -> Result<Option<Path>, PlannerError>;
}

/// Single geodesic segment
#[derive(Debug, Clone)]
pub struct StraightSteering {
    model: Arc<dyn ConfigurationModel>,
    distance: Arc<dyn Distance>,
}

impl StraightSteering {
    pub fn new(model: Arc<dyn ConfigurationModel>, distance: Arc<dyn Distance>) -> Self {
        Self { model, distance }
    }
}

impl SteeringMethod for StraightSteering {
    fn name(&self) -> &'static str {
        "Straight"
    }

    fn steer(&self, q1: &Configuration, q2: &Configuration) -> Result<Option<Path>, PlannerError> {
        check_dimension("configuration", self.model.config_size(), q1.len())?;
        check_dimension("configuration", self.model.config_size(), q2.len())?;
        let path = Path::straight(
            self.model.clone(),
            self.distance.as_ref(),
            q1.clone(),
            q2.clone(),
        )?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::WeighedDistance;
    use approx::assert_relative_eq;
    use cspace_core::model::KinematicTree;
    use nalgebra::DVector;

    #[test]
    fn test_straight_steering() {
        let model: Arc<dyn ConfigurationModel> =
            Arc::new(KinematicTree::free_point(&[(-1.0, 1.0), (-1.0, 1.0)], 0.1).unwrap());
        let steering = StraightSteering::new(model.clone(), Arc::new(WeighedDistance::new(model)));
        let q1 = DVector::from_vec(vec![0.0, 0.0]);
        let q2 = DVector::from_vec(vec![0.6, 0.8]);
        let path = steering.steer(&q1, &q2).unwrap().unwrap();
        assert_relative_eq!(path.length(), 1.0, epsilon = 1e-12);
        assert!(steering.steer(&q1, &DVector::zeros(3)).is_err());
    }
}
