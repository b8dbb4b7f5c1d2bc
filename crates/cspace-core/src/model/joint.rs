//! Joint arena
//!
//! Joints are stored in a flat arena and address their parent by index.
//! Children are derived by scanning parent indices, so the tree carries no
//! back-references.

use std::f64::consts::PI;

use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Kind of a single-axis joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JointKind {
    /// Translation along the axis, bounded
    Prismatic,
    /// Rotation about the axis, bounded
    Revolute,
    /// Rotation about the axis, unbounded (periodic in (-π, π])
    Continuous,
}

impl JointKind {
    /// Number of configuration variables
    pub fn config_size(&self) -> usize {
        1
    }

    /// Number of velocity variables
    pub fn velocity_size(&self) -> usize {
        1
    }

    /// Whether the joint value wraps around
    pub fn is_periodic(&self) -> bool {
        matches!(self, JointKind::Continuous)
    }
}

/// A joint of the kinematic tree
#[derive(Debug, Clone)]
pub struct Joint {
    /// Unique joint name (also the name of the frame it carries)
    pub name: String,
    /// Parent joint index (`None` for a root joint)
    pub parent: Option<usize>,
    pub kind: JointKind,
    /// Motion axis, expressed in the joint frame
    pub axis: Unit<Vector3<f64>>,
    /// Placement of the joint frame relative to the parent frame at zero value
    pub placement: Isometry3<f64>,
    /// Lower bound (ignored for continuous joints)
    pub lower: f64,
    /// Upper bound (ignored for continuous joints)
    pub upper: f64,
    /// Index of the first configuration variable
    pub config_rank: usize,
    /// Index of the first velocity variable
    pub velocity_rank: usize,
}

impl Joint {
    /// Rigid motion produced by the joint value
    pub fn motion(&self, value: f64) -> Isometry3<f64> {
        match self.kind {
            JointKind::Prismatic => Isometry3::from_parts(
                Translation3::from(self.axis.into_inner() * value),
                UnitQuaternion::identity(),
            ),
            JointKind::Revolute | JointKind::Continuous => Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&self.axis, value),
            ),
        }
    }

    /// Whether `value` lies within the joint bounds (always true for continuous joints)
    pub fn contains(&self, value: f64, tolerance: f64) -> bool {
        if self.kind.is_periodic() {
            return value.is_finite();
        }
        value >= self.lower - tolerance && value <= self.upper + tolerance
    }

    /// Sampling range of the joint value
    pub fn sampling_range(&self) -> (f64, f64) {
        if self.kind.is_periodic() {
            (-PI, PI)
        } else {
            (self.lower, self.upper)
        }
    }
}

/// Wrap an angle into (-π, π]
pub fn wrap_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a <= -PI {
        a += 2.0 * PI;
    } else if a > PI {
        a -= 2.0 * PI;
    }
    a
}

/// Flat storage of the joints of a tree
#[derive(Debug, Clone, Default)]
pub struct JointArena {
    joints: Vec<Joint>,
}

impl JointArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a joint
    ///
    /// The parent must already be in the arena, so parents always precede
    /// their children.
    pub fn push(
        &mut self,
        name: &str,
        parent: Option<&str>,
        kind: JointKind,
        axis: Unit<Vector3<f64>>,
        placement: Isometry3<f64>,
        bounds: (f64, f64),
    ) -> Result<usize, CoreError> {
        if self.index_of(name).is_some() {
            return Err(CoreError::InvalidParameter(format!(
                "joint {} already exists",
                name
            )));
        }
        let parent = match parent {
            Some(p) => Some(
                self.index_of(p)
                    .ok_or_else(|| CoreError::UnknownJoint(p.to_string()))?,
            ),
            None => None,
        };
        let (lower, upper) = if kind.is_periodic() { (-PI, PI) } else { bounds };
        if !(lower <= upper) {
            return Err(CoreError::InvalidParameter(format!(
                "joint {} has empty bounds [{}, {}]",
                name, lower, upper
            )));
        }

        let joint = Joint {
            name: name.to_string(),
            parent,
            kind,
            axis,
            placement,
            lower,
            upper,
            config_rank: self.config_size(),
            velocity_rank: self.velocity_size(),
        };
        self.joints.push(joint);
        Ok(self.joints.len() - 1)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    pub fn get(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    pub fn as_slice(&self) -> &[Joint] {
        &self.joints
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn config_size(&self) -> usize {
        self.joints.iter().map(|j| j.kind.config_size()).sum()
    }

    pub fn velocity_size(&self) -> usize {
        self.joints.iter().map(|j| j.kind.velocity_size()).sum()
    }

    /// Indices of the direct children of a joint
    pub fn children(&self, index: usize) -> Vec<usize> {
        self.joints
            .iter()
            .enumerate()
            .filter(|(_, j)| j.parent == Some(index))
            .map(|(i, _)| i)
            .collect()
    }

    /// Joint chain from the root down to `index` (inclusive)
    pub fn chain(&self, index: usize) -> Vec<usize> {
        let mut chain = Vec::new();
        let mut current = Some(index);
        while let Some(i) = current {
            chain.push(i);
            current = self.joints.get(i).and_then(|j| j.parent);
        }
        chain.reverse();
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn arena() -> JointArena {
        let mut arena = JointArena::new();
        arena
            .push("base", None, JointKind::Prismatic, Vector3::x_axis(), Isometry3::identity(), (-1.0, 1.0))
            .unwrap();
        arena
            .push("shoulder", Some("base"), JointKind::Revolute, Vector3::z_axis(), Isometry3::identity(), (-2.0, 2.0))
            .unwrap();
        arena
            .push("wrist", Some("shoulder"), JointKind::Continuous, Vector3::z_axis(), Isometry3::identity(), (0.0, 0.0))
            .unwrap();
        arena
            .push("tool", Some("base"), JointKind::Prismatic, Vector3::y_axis(), Isometry3::identity(), (0.0, 0.5))
            .unwrap();
        arena
    }

    #[test]
    fn test_ranks_and_sizes() {
        let arena = arena();
        assert_eq!(arena.config_size(), 4);
        assert_eq!(arena.velocity_size(), 4);
        assert_eq!(arena.get(2).unwrap().config_rank, 2);
        assert_eq!(arena.get(3).unwrap().velocity_rank, 3);
    }

    #[test]
    fn test_children_and_chain() {
        let arena = arena();
        assert_eq!(arena.children(0), vec![1, 3]);
        assert_eq!(arena.children(2), Vec::<usize>::new());
        assert_eq!(arena.chain(2), vec![0, 1, 2]);
        assert_eq!(arena.chain(3), vec![0, 3]);
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let mut arena = JointArena::new();
        let result = arena.push(
            "orphan",
            Some("missing"),
            JointKind::Revolute,
            Vector3::z_axis(),
            Isometry3::identity(),
            (-1.0, 1.0),
        );
        assert!(matches!(result, Err(CoreError::UnknownJoint(_))));
    }

    #[test]
    fn test_continuous_bounds() {
        let arena = arena();
        let wrist = arena.get(2).unwrap();
        assert!(wrist.contains(100.0, 0.0));
        assert_relative_eq!(wrist.lower, -PI);
        assert_relative_eq!(wrist.upper, PI);
    }

    #[test]
    fn test_wrap_angle() {
        assert_relative_eq!(wrap_angle(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(-PI), PI, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(0.5), 0.5, epsilon = 1e-12);
    }
}
