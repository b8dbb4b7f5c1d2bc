//! Path optimizers
//!
//! Optimizers only ever replace a portion of a path with a shorter, fully
//! valid one, so endpoints and end-to-end validity are preserved.

use std::fmt::Debug;

use cspace_core::Configuration;
use log::debug;
use rand::rngs::StdRng;
use rand::Rng;

use super::{Path, PathProjector, PathValidator};
use crate::error::PlannerError;
use crate::steering::SteeringMethod;

/// Strategies shared by the optimizer passes
pub struct OptimizationContext<'a> {
    pub steering: &'a dyn SteeringMethod,
    pub validator: &'a dyn PathValidator,
    pub projector: Option<&'a dyn PathProjector>,
    pub rng: &'a mut StdRng,
}

impl OptimizationContext<'_> {
    /// Direct connection q1 → q2 if it can be steered, projected and fully validated
    pub fn direct_connection(
        &self,
        q1: &Configuration,
        q2: &Configuration,
    ) -> Result<Option<Path>, PlannerError> {
        let Some(path) = self.steering.steer(q1, q2)? else {
            return Ok(None);
        };
        let path = match self.projector {
            Some(projector) => match projector.project(&path)? {
                Some(projected) => projected,
                None => return Ok(None),
            },
            None => path,
        };
        let validation = self.validator.validate(&path)?;
        Ok(validation.valid.then_some(path))
    }
}

pub trait PathOptimizer: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn optimize(&self, path: &Path, context: &mut OptimizationContext<'_>) -> Result<Path, PlannerError>;
}

/// Concatenate pieces that are known to join
fn join(pieces: Vec<Path>) -> Option<Path> {
    let mut iter = pieces.into_iter();
    let mut result = iter.next()?;
    for piece in iter {
        if !result.concat(&piece) {
            return None;
        }
    }
    Some(result)
}

/// Repeatedly replace the portion between two random parameters by a
/// direct connection when that is shorter
#[derive(Debug, Clone)]
pub struct RandomShortcut {
    iterations: usize,
}

impl RandomShortcut {
    pub fn new(iterations: usize) -> Self {
        Self { iterations }
    }
}

impl PathOptimizer for RandomShortcut {
    fn name(&self) -> &'static str {
        "RandomShortcut"
    }

    fn optimize(&self, path: &Path, context: &mut OptimizationContext<'_>) -> Result<Path, PlannerError> {
        let mut current = path.clone();
        let initial_length = current.length();
        for _ in 0..self.iterations {
            let length = current.length();
            if length <= f64::EPSILON {
                break;
            }
            let a = context.rng.gen_range(0.0..=length);
            let b = context.rng.gen_range(0.0..=length);
            let (t1, t2) = if a <= b { (a, b) } else { (b, a) };
            if t2 - t1 <= f64::EPSILON {
                continue;
            }

            let q1 = current.config_at(t1)?;
            let q2 = current.config_at(t2)?;
            let Some(shortcut) = context.direct_connection(&q1, &q2)? else {
                continue;
            };
            if shortcut.length() >= t2 - t1 - 1e-9 {
                continue;
            }
            let pieces = vec![current.extract(0.0, t1)?, shortcut, current.extract(t2, length)?];
            if let Some(shorter) = join(pieces) {
                current = shorter;
            }
        }
        debug!(
            "[Optimizer] random shortcut: {:.4} -> {:.4}",
            initial_length,
            current.length()
        );
        Ok(current)
    }
}

/// Greedy pass over the waypoints: from each waypoint, jump to the farthest
/// waypoint reachable by a valid direct connection
#[derive(Debug, Clone, Default)]
pub struct SimpleShortcut;

impl PathOptimizer for SimpleShortcut {
    fn name(&self) -> &'static str {
        "SimpleShortcut"
    }

    fn optimize(&self, path: &Path, context: &mut OptimizationContext<'_>) -> Result<Path, PlannerError> {
        let waypoints = path.waypoints();
        let params = path.waypoint_parameters();
        let n = waypoints.len();
        if n <= 2 {
            return Ok(path.clone());
        }

        let mut pieces = Vec::new();
        let mut i = 0;
        while i + 1 < n {
            let mut next = None;
            for j in (i + 2..n).rev() {
                if let Some(shortcut) = context.direct_connection(&waypoints[i], &waypoints[j])? {
                    if shortcut.length() < params[j] - params[i] - 1e-9 {
                        next = Some((j, shortcut));
                        break;
                    }
                }
            }
            match next {
                Some((j, shortcut)) => {
                    pieces.push(shortcut);
                    i = j;
                }
                None => {
                    pieces.push(path.extract(params[i], params[i + 1])?);
                    i += 1;
                }
            }
        }

        let result = join(pieces).unwrap_or_else(|| path.clone());
        debug!(
            "[Optimizer] simple shortcut: {:.4} -> {:.4}",
            path.length(),
            result.length()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{Distance, WeighedDistance};
    use crate::path::DiscretizedValidator;
    use crate::steering::StraightSteering;
    use approx::assert_relative_eq;
    use cspace_core::model::{ConfigurationModel, KinematicTree, Obstacle};
    use cspace_core::validation::ConfigurationValidator;
    use nalgebra::{DVector, Point3, Vector3};
    use rand::SeedableRng;
    use std::sync::Arc;

    struct Fixture {
        model: Arc<dyn ConfigurationModel>,
        distance: Arc<dyn Distance>,
        steering: StraightSteering,
        validator: DiscretizedValidator,
    }

    fn fixture(with_wall: bool) -> Fixture {
        let mut tree = KinematicTree::free_point(&[(-3.0, 3.0), (-3.0, 3.0)], 0.05).unwrap();
        if with_wall {
            // Wall from y = -3 to y = 1 at x = 1
            tree.add_obstacle(Obstacle::cuboid(
                "wall",
                Point3::new(1.0, -1.0, 0.0),
                Vector3::new(0.1, 2.0, 1.0),
            ));
        }
        let model: Arc<dyn ConfigurationModel> = Arc::new(tree);
        let distance: Arc<dyn Distance> = Arc::new(WeighedDistance::new(model.clone()));
        Fixture {
            steering: StraightSteering::new(model.clone(), distance.clone()),
            validator: DiscretizedValidator::new(ConfigurationValidator::new(model.clone(), 0.0), 0.02),
            model,
            distance,
        }
    }

    fn zigzag(f: &Fixture) -> Path {
        let points = [[0.0, 0.0], [0.5, 1.5], [1.5, 1.5], [2.0, 0.0]];
        let waypoints = points
            .iter()
            .map(|p| DVector::from_column_slice(p))
            .collect();
        Path::new(f.model.clone(), f.distance.as_ref(), waypoints).unwrap()
    }

    #[test]
    fn test_simple_shortcut_free_space() {
        let f = fixture(false);
        let mut rng = StdRng::seed_from_u64(1);
        let mut context = OptimizationContext {
            steering: &f.steering,
            validator: &f.validator,
            projector: None,
            rng: &mut rng,
        };
        let path = zigzag(&f);
        let optimized = SimpleShortcut.optimize(&path, &mut context).unwrap();
        assert_relative_eq!(optimized.length(), 2.0, epsilon = 1e-9);
        assert_eq!(optimized.initial(), path.initial());
        assert_eq!(optimized.end(), path.end());
    }

    #[test]
    fn test_shortcuts_keep_validity_around_wall() {
        let f = fixture(true);
        let path = zigzag(&f);
        assert!(f.validator.validate(&path).unwrap().valid);

        for optimizer in [
            Box::new(SimpleShortcut) as Box<dyn PathOptimizer>,
            Box::new(RandomShortcut::new(100)),
        ] {
            let mut rng = StdRng::seed_from_u64(5);
            let mut context = OptimizationContext {
                steering: &f.steering,
                validator: &f.validator,
                projector: None,
                rng: &mut rng,
            };
            let optimized = optimizer.optimize(&path, &mut context).unwrap();
            assert!(optimized.length() <= path.length() + 1e-9, "{}", optimizer.name());
            assert!(optimized.length() > 2.0, "{}", optimizer.name());
            assert!(f.validator.validate(&optimized).unwrap().valid, "{}", optimizer.name());
            assert_relative_eq!(optimized.initial().clone(), path.initial().clone(), epsilon = 1e-12);
            assert_relative_eq!(optimized.end().clone(), path.end().clone(), epsilon = 1e-12);
        }
    }
}
