//! Path projection onto the constraint manifold

use std::fmt::Debug;
use std::sync::Arc;

use cspace_core::constraints::ConstraintSystem;
use log::debug;

use super::Path;
use crate::distance::Distance;
use crate::error::PlannerError;

pub trait PathProjector: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Projected path, or `None` when projection fails
    fn project(&self, path: &Path) -> Result<Option<Path>, PlannerError>;
}

/// Projects samples taken every `step` along the path
///
/// The result is rejected when a sample fails to project or when two
/// consecutive projected samples are more than `2 · step` apart, which
/// signals a jump across the manifold.
#[derive(Debug, Clone)]
pub struct ProgressiveProjector {
    constraints: ConstraintSystem,
    distance: Arc<dyn Distance>,
    step: f64,
}

impl ProgressiveProjector {
    pub fn new(constraints: ConstraintSystem, distance: Arc<dyn Distance>, step: f64) -> Self {
        Self {
            constraints,
            distance,
            step,
        }
    }

    pub fn step(&self) -> f64 {
        self.step
    }
}

impl PathProjector for ProgressiveProjector {
    fn name(&self) -> &'static str {
        "Progressive"
    }

    fn project(&self, path: &Path) -> Result<Option<Path>, PlannerError> {
        if !self.constraints.has_active_constraints() {
            return Ok(Some(path.clone()));
        }

        let mut waypoints = Vec::new();
        for (t, q) in path.sample(self.step)? {
            let projection = self.constraints.apply_constraints(&q)?;
            if !projection.success {
                debug!("[Projector] sample at {:.4} does not project", t);
                return Ok(None);
            }
            if let Some(previous) = waypoints.last() {
                let gap = self.distance.distance(previous, &projection.configuration);
                if gap > 2.0 * self.step {
                    debug!("[Projector] discontinuity of {:.4} at {:.4}", gap, t);
                    return Ok(None);
                }
            }
            waypoints.push(projection.configuration);
        }
        Ok(Some(Path::new(
            path.model().clone(),
            self.distance.as_ref(),
            waypoints,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::WeighedDistance;
    use approx::assert_relative_eq;
    use cspace_core::constraints::{FramePosition, ProjectionConfig, RhsMode};
    use cspace_core::model::{ConfigurationModel, JointKind, KinematicTree};
    use nalgebra::{DVector, Isometry3, Point3, Vector3};

    /// Point in the plane constrained to the unit circle around the origin:
    /// the arm has a revolute base and a prismatic radius joint
    fn polar() -> Arc<dyn ConfigurationModel> {
        let mut tree = KinematicTree::new();
        tree.add_joint("angle", None, JointKind::Revolute, Vector3::z_axis(), Isometry3::identity(), (-3.0, 3.0))
            .unwrap();
        tree.add_joint("radius", Some("angle"), JointKind::Prismatic, Vector3::x_axis(), Isometry3::identity(), (0.0, 2.0))
            .unwrap();
        tree.add_body("tip", "radius", Point3::origin(), 0.01).unwrap();
        Arc::new(tree)
    }

    #[test]
    fn test_projected_path_satisfies_constraints() {
        let model = polar();
        let mut system = ConstraintSystem::new(model.clone(), ProjectionConfig::default());
        let tip_x = FramePosition::new("tip_x", model.clone(), "tip", [true, false, false]).unwrap();
        system.add_function_constraint(Arc::new(tip_x), RhsMode::Parameterized);
        system.add_numerical_constraints(&["tip_x"], &[0], None).unwrap();
        system.set_right_hand_side("tip_x", &[0.5]).unwrap();

        let distance: Arc<dyn Distance> = Arc::new(WeighedDistance::new(model.clone()));
        // Both ends lie on the line x = 0.5: r·cos(θ) = 0.5
        let q0 = DVector::from_vec(vec![0.0, 0.5]);
        let q1 = DVector::from_vec(vec![0.5, 0.5 / 0.5f64.cos()]);
        let path = Path::straight(model, distance.as_ref(), q0, q1).unwrap();

        let projector = ProgressiveProjector::new(system.clone(), distance, 0.05);
        let projected = projector.project(&path).unwrap().unwrap();
        assert!(projected.waypoints().len() > 2);
        for q in projected.waypoints() {
            assert!(system.is_satisfied(q).unwrap());
        }
        assert_relative_eq!(projected.end()[0], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_unconstrained_projection_is_identity() {
        let model = polar();
        let system = ConstraintSystem::new(model.clone(), ProjectionConfig::default());
        let distance: Arc<dyn Distance> = Arc::new(WeighedDistance::new(model.clone()));
        let path = Path::straight(
            model,
            distance.as_ref(),
            DVector::from_vec(vec![0.0, 0.5]),
            DVector::from_vec(vec![1.0, 1.0]),
        )
        .unwrap();
        let projected = ProgressiveProjector::new(system, distance, 0.1)
            .project(&path)
            .unwrap()
            .unwrap();
        assert_eq!(projected.waypoints().len(), 2);
    }
}
