//! Constraint system and projection solver
//!
//! Active numerical constraints are grouped by priority rank (0 is the
//! highest priority). One Newton iteration computes a hierarchical damped
//! least-squares step:
//!
//! ```text
//! δq ← 0,  P ← I
//! for each level k:   δq ← δq + (Jₖ P)⁺_λ (−eₖ − Jₖ δq)
//!                     P  ← P − (Jₖ P)⁺ (Jₖ P)
//! q ← q ⊕ δq
//! ```
//!
//! with eₖ = fₖ(q) − rhsₖ. Locked joints are written before solving and
//! their columns are left out of every Jkₖ. Passive DOF columns are kept in
//! the system but zeroed for the constraints that declare them.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, trace};
use nalgebra::{DMatrix, DVector};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::{DifferentiableFunction, ProjectionConfig};
use crate::error::{check_dimension, CoreError};
use crate::model::ConfigurationModel;
use crate::validation::ConfigurationValidator;
use crate::Configuration;

/// How the right-hand side of a constraint may change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RhsMode {
    /// Frozen at registration (zero)
    Constant,
    /// Re-suppliable through `set_right_hand_side*`
    Parameterized,
}

/// Registered numerical constraint `f(q) = rhs`
#[derive(Debug, Clone)]
pub struct NumericalConstraint {
    pub function: Arc<dyn DifferentiableFunction>,
    pub mode: RhsMode,
    rhs: DVector<f64>,
}

impl NumericalConstraint {
    pub fn right_hand_side(&self) -> &DVector<f64> {
        &self.rhs
    }
}

/// Joint held at a fixed value
#[derive(Debug, Clone)]
pub struct LockedJoint {
    pub name: String,
    pub joint: String,
    pub config_rank: usize,
    pub velocity_rank: usize,
    pub value: DVector<f64>,
}

/// Constraint taking part in the projection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveConstraint {
    pub name: String,
    pub priority: usize,
    /// Passive DOF set whose columns are zeroed for this constraint
    pub passive_dofs: Option<String>,
}

/// Outcome of `apply_constraints`
#[derive(Debug, Clone)]
pub struct Projection {
    pub configuration: Configuration,
    /// Residual norm dropped below the error threshold
    pub success: bool,
    /// Residual norm of the returned configuration
    pub residual: f64,
    pub iterations: usize,
}

/// Stacked constraint value and Jacobian
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// f(q) − rhs, in priority order
    pub value: DVector<f64>,
    /// Jacobian restricted to the free (non-locked) velocity DOFs
    pub jacobian: DMatrix<f64>,
    /// Velocity indices of the Jacobian columns
    pub free_dofs: Vec<usize>,
}

/// Named constraints and the projection onto their manifold
#[derive(Debug, Clone)]
pub struct ConstraintSystem {
    model: Arc<dyn ConfigurationModel>,
    config: ProjectionConfig,
    registered: BTreeMap<String, NumericalConstraint>,
    locked: BTreeMap<String, LockedJoint>,
    passive_sets: BTreeMap<String, Vec<usize>>,
    active: Vec<ActiveConstraint>,
    active_locked: Vec<String>,
}

type Level = (DVector<f64>, DMatrix<f64>);

impl ConstraintSystem {
    pub fn new(model: Arc<dyn ConfigurationModel>, config: ProjectionConfig) -> Self {
        Self {
            model,
            config,
            registered: BTreeMap::new(),
            locked: BTreeMap::new(),
            passive_sets: BTreeMap::new(),
            active: Vec::new(),
            active_locked: Vec::new(),
        }
    }

    pub fn model(&self) -> &Arc<dyn ConfigurationModel> {
        &self.model
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ProjectionConfig {
        &mut self.config
    }

    /// Register a numerical constraint under the function name
    ///
    /// Registering an existing name replaces it.
    pub fn add_function_constraint(&mut self, function: Arc<dyn DifferentiableFunction>, mode: RhsMode) {
        let name = function.name().to_string();
        if self.registered.contains_key(&name) {
            debug!("[Constraints] replacing constraint {}", name);
        }
        let rhs = DVector::zeros(function.output_size());
        self.registered
            .insert(name, NumericalConstraint { function, mode, rhs });
    }

    /// Register a locked joint declaration
    pub fn create_locked_joint(&mut self, name: &str, joint: &str, value: &[f64]) -> Result<(), CoreError> {
        let index = self.model.joint_index(joint)?;
        let j = &self.model.joints()[index];
        check_dimension("locked joint value", j.kind.config_size(), value.len())?;
        for &v in value {
            if !j.contains(v, crate::BOUNDS_EPSILON) {
                return Err(CoreError::OutOfBounds {
                    joint: j.name.clone(),
                    value: v,
                    lower: j.lower,
                    upper: j.upper,
                });
            }
        }
        self.locked.insert(
            name.to_string(),
            LockedJoint {
                name: name.to_string(),
                joint: joint.to_string(),
                config_rank: j.config_rank,
                velocity_rank: j.velocity_rank,
                value: DVector::from_column_slice(value),
            },
        );
        Ok(())
    }

    /// Declare a named set of passive DOFs from joint names
    pub fn add_passive_dofs(&mut self, name: &str, joints: &[&str]) -> Result<(), CoreError> {
        let mut dofs = Vec::new();
        for joint in joints {
            let j = &self.model.joints()[self.model.joint_index(joint)?];
            dofs.extend(j.velocity_rank..j.velocity_rank + j.kind.velocity_size());
        }
        dofs.sort_unstable();
        dofs.dedup();
        self.passive_sets.insert(name.to_string(), dofs);
        Ok(())
    }

    /// Activate registered constraints with their priority ranks
    ///
    /// All names are checked before anything is activated.
    pub fn add_numerical_constraints(
        &mut self,
        names: &[&str],
        priorities: &[usize],
        passive_dofs: Option<&str>,
    ) -> Result<(), CoreError> {
        check_dimension("priority list", names.len(), priorities.len())?;
        for name in names {
            if !self.registered.contains_key(*name) {
                return Err(CoreError::UnknownConstraint(name.to_string()));
            }
        }
        if let Some(set) = passive_dofs {
            if !self.passive_sets.contains_key(set) {
                return Err(CoreError::UnknownPassiveDofs(set.to_string()));
            }
        }

        for (name, priority) in names.iter().zip(priorities) {
            self.active.retain(|a| a.name != *name);
            self.active.push(ActiveConstraint {
                name: name.to_string(),
                priority: *priority,
                passive_dofs: passive_dofs.map(str::to_string),
            });
        }
        // Stable: equal priorities keep insertion order
        self.active.sort_by_key(|a| a.priority);
        Ok(())
    }

    /// Activate registered locked joints
    pub fn add_locked_joint_constraints(&mut self, names: &[&str]) -> Result<(), CoreError> {
        for name in names {
            if !self.locked.contains_key(*name) {
                return Err(CoreError::UnknownConstraint(name.to_string()));
            }
        }
        for name in names {
            if !self.active_locked.iter().any(|n| n == name) {
                self.active_locked.push(name.to_string());
            }
        }
        Ok(())
    }

    /// Deactivate every constraint (registrations are kept)
    pub fn reset_constraints(&mut self) {
        self.active.clear();
        self.active_locked.clear();
    }

    pub fn active_constraints(&self) -> &[ActiveConstraint] {
        &self.active
    }

    pub fn active_locked_joints(&self) -> impl Iterator<Item = &LockedJoint> {
        self.active_locked.iter().filter_map(|n| self.locked.get(n))
    }

    /// Names of registered numerical constraints and locked joints
    pub fn registered_names(&self) -> Vec<String> {
        self.registered
            .keys()
            .chain(self.locked.keys())
            .cloned()
            .collect()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registered.contains_key(name) || self.locked.contains_key(name)
    }

    pub fn has_active_constraints(&self) -> bool {
        !self.active.is_empty() || !self.active_locked.is_empty()
    }

    pub fn constraint(&self, name: &str) -> Result<&NumericalConstraint, CoreError> {
        self.registered
            .get(name)
            .ok_or_else(|| CoreError::UnknownConstraint(name.to_string()))
    }

    pub fn right_hand_side(&self, name: &str) -> Result<&DVector<f64>, CoreError> {
        Ok(&self.constraint(name)?.rhs)
    }

    /// Supply a new right-hand side for a parameterized constraint
    pub fn set_right_hand_side(&mut self, name: &str, rhs: &[f64]) -> Result<(), CoreError> {
        let constraint = self
            .registered
            .get_mut(name)
            .ok_or_else(|| CoreError::UnknownConstraint(name.to_string()))?;
        if constraint.mode == RhsMode::Constant {
            return Err(CoreError::ConstantRightHandSide(name.to_string()));
        }
        check_dimension("right-hand side", constraint.rhs.len(), rhs.len())?;
        constraint.rhs = DVector::from_column_slice(rhs);
        Ok(())
    }

    /// Set the right-hand side of every active parameterized constraint to f(q)
    pub fn set_right_hand_side_from_config(&mut self, q: &Configuration) -> Result<(), CoreError> {
        self.check_config(q)?;
        let mut updates = Vec::new();
        for active in &self.active {
            let constraint = self.constraint(&active.name)?;
            if constraint.mode == RhsMode::Parameterized {
                updates.push((active.name.clone(), constraint.function.value(q)?));
            }
        }
        for (name, rhs) in updates {
            if let Some(constraint) = self.registered.get_mut(&name) {
                constraint.rhs = rhs;
            }
        }
        Ok(())
    }

    /// Derived system enforcing extra registered constraints at top priority
    pub fn with_additional(&self, names: &[String]) -> Result<ConstraintSystem, CoreError> {
        let mut system = self.clone();
        for name in names {
            if self.registered.contains_key(name) {
                system.add_numerical_constraints(&[name.as_str()], &[0], None)?;
            } else {
                system.add_locked_joint_constraints(&[name.as_str()])?;
            }
        }
        Ok(system)
    }

    /// Velocity indices held fixed by active locked joints
    pub fn locked_dofs(&self) -> Vec<usize> {
        let mut dofs: Vec<usize> = self
            .active_locked_joints()
            .flat_map(|l| l.velocity_rank..l.velocity_rank + l.value.len())
            .collect();
        dofs.sort_unstable();
        dofs.dedup();
        dofs
    }

    /// Velocity indices solved by the projection
    pub fn free_dofs(&self) -> Vec<usize> {
        let locked = self.locked_dofs();
        (0..self.model.velocity_size())
            .filter(|i| locked.binary_search(i).is_err())
            .collect()
    }

    /// Stacked value and Jacobian of the active constraints, without iterating
    pub fn compute_value_and_jacobian(&self, q: &Configuration) -> Result<Evaluation, CoreError> {
        self.check_config(q)?;
        let free = self.free_dofs();
        let levels = self.evaluate_levels(q, &free)?;

        let rows: usize = levels.iter().map(|(e, _)| e.len()).sum();
        let mut value = DVector::zeros(rows);
        let mut jacobian = DMatrix::zeros(rows, free.len());
        let mut offset = 0;
        for (e, j) in &levels {
            value.rows_mut(offset, e.len()).copy_from(e);
            jacobian.rows_mut(offset, j.nrows()).copy_from(j);
            offset += e.len();
        }
        Ok(Evaluation {
            value,
            jacobian,
            free_dofs: free,
        })
    }

    /// Whether q satisfies every active constraint within the error threshold
    pub fn is_satisfied(&self, q: &Configuration) -> Result<bool, CoreError> {
        let evaluation = self.compute_value_and_jacobian(q)?;
        let locked_ok = self.active_locked_joints().all(|l| {
            (0..l.value.len()).all(|k| (q[l.config_rank + k] - l.value[k]).abs() <= self.config.error_threshold)
        });
        Ok(locked_ok && evaluation.value.norm() < self.config.error_threshold)
    }

    /// Project q onto the constraint manifold
    ///
    /// Non-convergence is reported through `Projection::success`.
    pub fn apply_constraints(&self, q: &Configuration) -> Result<Projection, CoreError> {
        self.check_config(q)?;
        let free = self.free_dofs();
        let mut current = q.clone();
        self.write_locked(&mut current);

        let mut iteration = 0;
        loop {
            let levels = self.evaluate_levels(&current, &free)?;
            let residual = levels
                .iter()
                .map(|(e, _)| e.norm_squared())
                .sum::<f64>()
                .sqrt();
            trace!("[Constraints] iteration {} residual {:.3e}", iteration, residual);

            if residual < self.config.error_threshold {
                return Ok(Projection {
                    configuration: current,
                    success: true,
                    residual,
                    iterations: iteration,
                });
            }
            if iteration >= self.config.max_iterations || free.is_empty() || !residual.is_finite() {
                debug!(
                    "[Constraints] projection failed after {} iterations, residual {:.3e}",
                    iteration, residual
                );
                return Ok(Projection {
                    configuration: current,
                    success: false,
                    residual,
                    iterations: iteration,
                });
            }

            let Some(step) = self.hierarchical_step(&levels, free.len()) else {
                debug!("[Constraints] singular value decomposition failed");
                return Ok(Projection {
                    configuration: current,
                    success: false,
                    residual,
                    iterations: iteration,
                });
            };
            let mut velocity = DVector::zeros(self.model.velocity_size());
            for (k, &dof) in free.iter().enumerate() {
                velocity[dof] = step[k];
            }
            current = self.model.integrate(&current, &velocity);
            self.write_locked(&mut current);
            iteration += 1;
        }
    }

    /// Repeat {sample, project, validate} until a valid configuration is found
    pub fn generate_valid_config(
        &self,
        validator: &ConfigurationValidator,
        rng: &mut dyn RngCore,
        max_iterations: usize,
    ) -> Result<Option<Configuration>, CoreError> {
        for attempt in 0..max_iterations {
            let sample = self.model.random_config(rng);
            let projection = self.apply_constraints(&sample)?;
            if !projection.success {
                continue;
            }
            if validator.validate(&projection.configuration)?.is_valid() {
                debug!("[Constraints] valid configuration after {} attempts", attempt + 1);
                return Ok(Some(projection.configuration));
            }
        }
        Ok(None)
    }

    fn check_config(&self, q: &Configuration) -> Result<(), CoreError> {
        check_dimension("configuration", self.model.config_size(), q.len())
    }

    fn write_locked(&self, q: &mut Configuration) {
        for locked in self.active_locked_joints() {
            q.rows_mut(locked.config_rank, locked.value.len())
                .copy_from(&locked.value);
        }
    }

    /// Residuals and restricted Jacobians, one entry per priority level
    fn evaluate_levels(&self, q: &Configuration, free: &[usize]) -> Result<Vec<Level>, CoreError> {
        let mut levels: Vec<Level> = Vec::new();
        let mut current_priority = None;

        for active in &self.active {
            let constraint = self.constraint(&active.name)?;
            let error = constraint.function.value(q)? - &constraint.rhs;
            let mut jacobian = constraint.function.jacobian(q)?;

            if let Some(set) = &active.passive_dofs {
                let dofs = self
                    .passive_sets
                    .get(set)
                    .ok_or_else(|| CoreError::UnknownPassiveDofs(set.clone()))?;
                for &dof in dofs {
                    jacobian.column_mut(dof).fill(0.0);
                }
            }
            let restricted = jacobian.select_columns(free.iter());

            if current_priority == Some(active.priority) {
                if let Some((e, j)) = levels.pop() {
                    levels.push((stack_vectors(&e, &error), stack_matrices(&j, &restricted)));
                }
            } else {
                levels.push((error, restricted));
                current_priority = Some(active.priority);
            }
        }
        Ok(levels)
    }

    fn hierarchical_step(&self, levels: &[Level], n: usize) -> Option<DVector<f64>> {
        let mut step = DVector::zeros(n);
        let mut projector = DMatrix::identity(n, n);
        for (error, jacobian) in levels {
            let jp = jacobian * &projector;
            let target = -error - jacobian * &step;
            let (damped, exact) =
                pseudo_inverses(&jp, self.config.damping, self.config.singular_threshold)?;
            step += damped * target;
            projector -= exact * jp;
        }
        Some(step)
    }
}

fn stack_vectors(a: &DVector<f64>, b: &DVector<f64>) -> DVector<f64> {
    DVector::from_iterator(a.len() + b.len(), a.iter().chain(b.iter()).copied())
}

fn stack_matrices(a: &DMatrix<f64>, b: &DMatrix<f64>) -> DMatrix<f64> {
    let mut m = DMatrix::zeros(a.nrows() + b.nrows(), a.ncols());
    m.rows_mut(0, a.nrows()).copy_from(a);
    m.rows_mut(a.nrows(), b.nrows()).copy_from(b);
    m
}

/// Damped and exact (thresholded) pseudo-inverses from one SVD
fn pseudo_inverses(m: &DMatrix<f64>, damping: f64, threshold: f64) -> Option<(DMatrix<f64>, DMatrix<f64>)> {
    let svd = m.clone().svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let lambda2 = damping * damping;

    let mut damped_ut = u.transpose();
    let mut exact_ut = u.transpose();
    for (i, &s) in svd.singular_values.iter().enumerate() {
        damped_ut.row_mut(i).scale_mut(s / (s * s + lambda2).max(f64::MIN_POSITIVE));
        exact_ut
            .row_mut(i)
            .scale_mut(if s > threshold { 1.0 / s } else { 0.0 });
    }
    let v = v_t.transpose();
    Some((&v * damped_ut, v * exact_ut))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{AffineFunction, FramePosition};
    use crate::model::{JointKind, KinematicTree};
    use approx::assert_relative_eq;
    use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};

    fn planar_point() -> Arc<dyn ConfigurationModel> {
        Arc::new(KinematicTree::free_point(&[(-2.0, 2.0), (-2.0, 2.0)], 0.1).unwrap())
    }

    fn arm() -> Arc<dyn ConfigurationModel> {
        let mut tree = KinematicTree::new();
        tree.add_joint("shoulder", None, JointKind::Revolute, Vector3::z_axis(), Isometry3::identity(), (-3.1, 3.1))
            .unwrap();
        tree.add_joint(
            "elbow",
            Some("shoulder"),
            JointKind::Revolute,
            Vector3::z_axis(),
            Isometry3::from_parts(Translation3::new(1.0, 0.0, 0.0), UnitQuaternion::identity()),
            (-3.1, 3.1),
        )
        .unwrap();
        tree.add_body("tool", "elbow", Point3::new(1.0, 0.0, 0.0), 0.05).unwrap();
        Arc::new(tree)
    }

    /// x + y = rhs
    fn sum_constraint(model: &Arc<dyn ConfigurationModel>, mode: RhsMode) -> ConstraintSystem {
        let mut system = ConstraintSystem::new(model.clone(), ProjectionConfig::default());
        let f = AffineFunction::new(
            "sum",
            model.as_ref(),
            DMatrix::from_row_slice(1, 2, &[1.0, 1.0]),
            DVector::zeros(1),
        )
        .unwrap();
        system.add_function_constraint(Arc::new(f), mode);
        system.add_numerical_constraints(&["sum"], &[0], None).unwrap();
        system
    }

    #[test]
    fn test_projection_linear() {
        let model = planar_point();
        let system = sum_constraint(&model, RhsMode::Constant);
        let q = DVector::from_vec(vec![0.4, 0.6]);
        let projection = system.apply_constraints(&q).unwrap();
        assert!(projection.success);
        assert_relative_eq!(projection.configuration[0], -0.1, epsilon = 1e-6);
        assert_relative_eq!(projection.configuration[1], 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_satisfied_config_unchanged() {
        let model = planar_point();
        let system = sum_constraint(&model, RhsMode::Constant);
        let q = DVector::from_vec(vec![0.3, -0.3]);
        let projection = system.apply_constraints(&q).unwrap();
        assert!(projection.success);
        assert_eq!(projection.iterations, 0);
        assert!(projection.residual < system.config().error_threshold);
        assert_eq!(projection.configuration, q);
    }

    #[test]
    fn test_locked_joint_exact() {
        let model = planar_point();
        let mut system = sum_constraint(&model, RhsMode::Constant);
        system.create_locked_joint("lock_x", "x", &[0.25]).unwrap();
        system.add_locked_joint_constraints(&["lock_x"]).unwrap();

        let projection = system
            .apply_constraints(&DVector::from_vec(vec![-1.5, 1.0]))
            .unwrap();
        assert!(projection.success);
        assert_eq!(projection.configuration[0], 0.25);
        assert_relative_eq!(projection.configuration[1], -0.25, epsilon = 1e-6);
        assert_eq!(system.free_dofs(), vec![1]);
    }

    #[test]
    fn test_locked_joint_out_of_bounds() {
        let model = planar_point();
        let mut system = ConstraintSystem::new(model, ProjectionConfig::default());
        assert!(matches!(
            system.create_locked_joint("lock_x", "x", &[5.0]),
            Err(CoreError::OutOfBounds { .. })
        ));
        assert!(matches!(
            system.create_locked_joint("lock_w", "w", &[0.0]),
            Err(CoreError::UnknownJoint(_))
        ));
    }

    #[test]
    fn test_passive_dofs_receive_no_correction() {
        let model = planar_point();
        let mut system = ConstraintSystem::new(model.clone(), ProjectionConfig::default());
        let f = AffineFunction::new(
            "sum",
            model.as_ref(),
            DMatrix::from_row_slice(1, 2, &[1.0, 1.0]),
            DVector::zeros(1),
        )
        .unwrap();
        system.add_function_constraint(Arc::new(f), RhsMode::Constant);
        system.add_passive_dofs("passive_y", &["y"]).unwrap();
        system
            .add_numerical_constraints(&["sum"], &[0], Some("passive_y"))
            .unwrap();

        let projection = system
            .apply_constraints(&DVector::from_vec(vec![0.2, 0.5]))
            .unwrap();
        assert!(projection.success);
        assert_relative_eq!(projection.configuration[0], -0.5, epsilon = 1e-6);
        assert_eq!(projection.configuration[1], 0.5);

        // Passive columns are present but zero
        let evaluation = system
            .compute_value_and_jacobian(&DVector::from_vec(vec![0.2, 0.5]))
            .unwrap();
        assert_eq!(evaluation.jacobian.ncols(), 2);
        assert_eq!(evaluation.jacobian[(0, 1)], 0.0);
    }

    #[test]
    fn test_unknown_constraint_is_hard_failure() {
        let model = planar_point();
        let mut system = sum_constraint(&model, RhsMode::Constant);
        let result = system.add_numerical_constraints(&["sum", "missing"], &[0, 1], None);
        assert!(matches!(result, Err(CoreError::UnknownConstraint(_))));
        assert_eq!(system.active_constraints().len(), 1);
    }

    #[test]
    fn test_right_hand_side_modes() {
        let model = planar_point();
        let mut constant = sum_constraint(&model, RhsMode::Constant);
        assert!(matches!(
            constant.set_right_hand_side("sum", &[1.0]),
            Err(CoreError::ConstantRightHandSide(_))
        ));

        let mut parameterized = sum_constraint(&model, RhsMode::Parameterized);
        parameterized.set_right_hand_side("sum", &[1.0]).unwrap();
        let projection = parameterized
            .apply_constraints(&DVector::from_vec(vec![0.0, 0.0]))
            .unwrap();
        assert!(projection.success);
        assert_relative_eq!(projection.configuration.sum(), 1.0, epsilon = 1e-6);

        parameterized
            .set_right_hand_side_from_config(&DVector::from_vec(vec![0.7, 0.7]))
            .unwrap();
        assert_relative_eq!(parameterized.right_hand_side("sum").unwrap()[0], 1.4);
        assert!(parameterized.set_right_hand_side("sum", &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_priority_levels() {
        // Registered out of order: level 0 is x = 0.5, level 1 is y = 0.2
        let model = planar_point();
        let mut system = ConstraintSystem::new(model.clone(), ProjectionConfig::default());
        let x = AffineFunction::new(
            "x_half",
            model.as_ref(),
            DMatrix::from_row_slice(1, 2, &[1.0, 0.0]),
            DVector::from_vec(vec![-0.5]),
        )
        .unwrap();
        let y = AffineFunction::new(
            "y_value",
            model.as_ref(),
            DMatrix::from_row_slice(1, 2, &[0.0, 1.0]),
            DVector::from_vec(vec![-0.2]),
        )
        .unwrap();
        system.add_function_constraint(Arc::new(x), RhsMode::Constant);
        system.add_function_constraint(Arc::new(y), RhsMode::Constant);
        system
            .add_numerical_constraints(&["y_value", "x_half"], &[1, 0], None)
            .unwrap();
        assert_eq!(system.active_constraints()[0].name, "x_half");

        let projection = system
            .apply_constraints(&DVector::from_vec(vec![-1.0, 1.0]))
            .unwrap();
        assert!(projection.success);
        assert_relative_eq!(projection.configuration[0], 0.5, epsilon = 1e-6);
        assert_relative_eq!(projection.configuration[1], 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_nonlinear_projection_reaches_target() {
        let model = arm();
        let mut system = ConstraintSystem::new(model.clone(), ProjectionConfig::default());
        let f = FramePosition::new("tool_xy", model, "tool", [true, true, false]).unwrap();
        system.add_function_constraint(Arc::new(f), RhsMode::Parameterized);
        system.add_numerical_constraints(&["tool_xy"], &[0], None).unwrap();
        system.set_right_hand_side("tool_xy", &[1.0, 1.0]).unwrap();

        let projection = system
            .apply_constraints(&DVector::from_vec(vec![0.3, 0.5]))
            .unwrap();
        assert!(projection.success);
        let placement = system
            .model()
            .frame_placement(&projection.configuration, "tool")
            .unwrap();
        assert_relative_eq!(placement.translation.vector.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(placement.translation.vector.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_unreachable_target_reports_failure() {
        let model = arm();
        let mut system = ConstraintSystem::new(model.clone(), ProjectionConfig::default());
        let f = FramePosition::new("tool_xy", model, "tool", [true, true, false]).unwrap();
        system.add_function_constraint(Arc::new(f), RhsMode::Parameterized);
        system.add_numerical_constraints(&["tool_xy"], &[0], None).unwrap();
        system.set_right_hand_side("tool_xy", &[5.0, 0.0]).unwrap();

        let projection = system
            .apply_constraints(&DVector::from_vec(vec![0.3, 0.5]))
            .unwrap();
        assert!(!projection.success);
        assert!(projection.residual > 1.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let model = planar_point();
        let system = sum_constraint(&model, RhsMode::Constant);
        let result = system.apply_constraints(&DVector::zeros(3));
        assert!(matches!(result, Err(CoreError::DimensionMismatch { .. })));
    }
}
