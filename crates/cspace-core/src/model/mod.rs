//! Configuration model
//!
//! The kinematic/collision model is an external collaborator of the
//! planning engine. [`ConfigurationModel`] is the surface the engine
//! consumes; [`KinematicTree`] is a compact reference implementation
//! (single-axis joints, spherical bodies, sphere/box obstacles).

pub mod joint;
pub mod tree;

pub use joint::*;
pub use tree::*;

use nalgebra::{DMatrix, DVector, Isometry3, Point3};
use rand::{Rng, RngCore};

use crate::error::CoreError;
use crate::{Configuration, Velocity};

/// Distance between one robot body and one obstacle
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionPair {
    pub body: String,
    pub obstacle: String,
    /// Signed distance (negative when penetrating)
    pub distance: f64,
    /// Closest point on the body (world frame)
    pub witness_body: Point3<f64>,
    /// Closest point on the obstacle (world frame)
    pub witness_obstacle: Point3<f64>,
}

/// Kinematic and collision model of a mechanism
pub trait ConfigurationModel: std::fmt::Debug + Send + Sync {
    /// Joints in arena order
    fn joints(&self) -> &[Joint];

    /// Placement of a named frame in the world
    fn frame_placement(&self, q: &Configuration, frame: &str) -> Result<Isometry3<f64>, CoreError>;

    /// 6 × nv Jacobian of a named frame (linear rows first, then angular),
    /// expressed in the world frame at the frame origin
    fn frame_jacobian(&self, q: &Configuration, frame: &str) -> Result<DMatrix<f64>, CoreError>;

    /// Distances between every body/obstacle pair
    fn collision_pairs(&self, q: &Configuration) -> Result<Vec<CollisionPair>, CoreError>;

    fn config_size(&self) -> usize {
        self.joints().iter().map(|j| j.kind.config_size()).sum()
    }

    fn velocity_size(&self) -> usize {
        self.joints().iter().map(|j| j.kind.velocity_size()).sum()
    }

    fn joint_index(&self, name: &str) -> Result<usize, CoreError> {
        self.joints()
            .iter()
            .position(|j| j.name == name)
            .ok_or_else(|| CoreError::UnknownJoint(name.to_string()))
    }

    fn joint_names(&self) -> Vec<String> {
        self.joints().iter().map(|j| j.name.clone()).collect()
    }

    /// q ⊕ v, wrapping periodic joints
    fn integrate(&self, q: &Configuration, v: &Velocity) -> Configuration {
        let mut result = q.clone();
        for joint in self.joints() {
            let value = q[joint.config_rank] + v[joint.velocity_rank];
            result[joint.config_rank] = if joint.kind.is_periodic() {
                wrap_angle(value)
            } else {
                value
            };
        }
        result
    }

    /// q1 ⊖ q0, taking the shortest way around periodic joints
    fn difference(&self, q1: &Configuration, q0: &Configuration) -> Velocity {
        let mut v = DVector::zeros(self.velocity_size());
        for joint in self.joints() {
            let delta = q1[joint.config_rank] - q0[joint.config_rank];
            v[joint.velocity_rank] = if joint.kind.is_periodic() {
                wrap_angle(delta)
            } else {
                delta
            };
        }
        v
    }

    /// Geodesic interpolation: q0 at `t = 0`, q1 at `t = 1`
    fn interpolate(&self, q0: &Configuration, q1: &Configuration, t: f64) -> Configuration {
        let v = self.difference(q1, q0) * t;
        self.integrate(q0, &v)
    }

    /// Uniform random configuration within the joint bounds
    fn random_config(&self, rng: &mut dyn RngCore) -> Configuration {
        let mut q = DVector::zeros(self.config_size());
        for joint in self.joints() {
            let (lower, upper) = joint.sampling_range();
            q[joint.config_rank] = if upper > lower {
                rng.gen_range(lower..=upper)
            } else {
                lower
            };
        }
        q
    }

    /// First joint whose value lies outside its bounds
    fn bounds_violation(&self, q: &Configuration, tolerance: f64) -> Option<CoreError> {
        self.joints().iter().find_map(|joint| {
            let value = q[joint.config_rank];
            if joint.contains(value, tolerance) {
                None
            } else {
                Some(CoreError::OutOfBounds {
                    joint: joint.name.clone(),
                    value,
                    lower: joint.lower,
                    upper: joint.upper,
                })
            }
        })
    }
}
