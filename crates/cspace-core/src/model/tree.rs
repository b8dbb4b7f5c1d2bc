//! Reference kinematic tree
//!
//! Forward kinematics composes, from the root down:
//!
//! ```text
//! Tⱼ = T_parent(j) · Pⱼ · Mⱼ(qⱼ)
//! ```
//!
//! where Pⱼ is the fixed joint placement and Mⱼ the joint motion. The frame
//! Jacobian column of an ancestor joint j of frame f is:
//!
//! ```text
//! revolute:   [aⱼ × (p_f - pⱼ); aⱼ]
//! prismatic:  [aⱼ; 0]
//! ```
//!
//! with aⱼ the world-frame joint axis and pⱼ the joint origin.

use nalgebra::{DMatrix, Isometry3, Point3, Unit, Vector3};

use super::{CollisionPair, ConfigurationModel, Joint, JointArena, JointKind};
use crate::error::{check_dimension, CoreError};
use crate::Configuration;

/// Spherical collision body attached to a joint frame
#[derive(Debug, Clone)]
pub struct Body {
    pub name: String,
    /// Index of the supporting joint
    pub joint: usize,
    /// Sphere center in the joint frame
    pub center: Point3<f64>,
    pub radius: f64,
}

/// Obstacle geometry (world frame)
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Sphere { center: Point3<f64>, radius: f64 },
    /// Axis-aligned box
    Box {
        center: Point3<f64>,
        half_extents: Vector3<f64>,
    },
}

/// Named static obstacle
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub name: String,
    pub shape: Shape,
}

impl Obstacle {
    pub fn sphere(name: &str, center: Point3<f64>, radius: f64) -> Self {
        Self {
            name: name.to_string(),
            shape: Shape::Sphere { center, radius },
        }
    }

    pub fn cuboid(name: &str, center: Point3<f64>, half_extents: Vector3<f64>) -> Self {
        Self {
            name: name.to_string(),
            shape: Shape::Box {
                center,
                half_extents,
            },
        }
    }

    /// Signed distance from a sphere to the obstacle, with witness points
    /// (on the sphere, on the obstacle)
    fn distance_to_sphere(&self, c: &Point3<f64>, r: f64) -> (f64, Point3<f64>, Point3<f64>) {
        match &self.shape {
            Shape::Sphere { center, radius } => {
                let delta = center - c;
                let norm = delta.norm();
                let n = if norm > 1e-12 { delta / norm } else { Vector3::x() };
                (norm - r - radius, c + n * r, center - n * *radius)
            }
            Shape::Box {
                center,
                half_extents,
            } => {
                let local = c - center;
                let clamped = Vector3::new(
                    local.x.clamp(-half_extents.x, half_extents.x),
                    local.y.clamp(-half_extents.y, half_extents.y),
                    local.z.clamp(-half_extents.z, half_extents.z),
                );
                let outside = local - clamped;
                let norm = outside.norm();
                if norm > 1e-12 {
                    let n = -outside / norm;
                    let closest = center + clamped;
                    (norm - r, c + n * r, closest)
                } else {
                    // Sphere center inside the box: push out through the nearest face
                    let depths = half_extents - local.abs();
                    let axis = depths.imin();
                    let mut face = local;
                    face[axis] = half_extents[axis] * local[axis].signum();
                    let mut n = Vector3::zeros();
                    n[axis] = -local[axis].signum();
                    (-depths[axis] - r, c + n * r, center + face)
                }
            }
        }
    }
}

/// Tree of single-axis joints carrying spherical bodies, among static obstacles
#[derive(Debug, Clone, Default)]
pub struct KinematicTree {
    joints: JointArena,
    bodies: Vec<Body>,
    obstacles: Vec<Obstacle>,
}

impl KinematicTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point robot translating along x, y (and z): one prismatic joint per
    /// axis, named `x`, `y`, `z`, and a body `body` of the given radius
    pub fn free_point(bounds: &[(f64, f64)], radius: f64) -> Result<Self, CoreError> {
        const NAMES: [&str; 3] = ["x", "y", "z"];
        if bounds.is_empty() || bounds.len() > NAMES.len() {
            return Err(CoreError::InvalidParameter(format!(
                "free point supports 1 to 3 axes, got {}",
                bounds.len()
            )));
        }

        let mut tree = Self::new();
        let axes = [Vector3::x_axis(), Vector3::y_axis(), Vector3::z_axis()];
        let mut parent: Option<&str> = None;
        for (i, bound) in bounds.iter().enumerate() {
            tree.add_joint(
                NAMES[i],
                parent,
                JointKind::Prismatic,
                axes[i],
                Isometry3::identity(),
                *bound,
            )?;
            parent = Some(NAMES[i]);
        }
        tree.add_body("body", NAMES[bounds.len() - 1], Point3::origin(), radius)?;
        Ok(tree)
    }

    pub fn add_joint(
        &mut self,
        name: &str,
        parent: Option<&str>,
        kind: JointKind,
        axis: Unit<Vector3<f64>>,
        placement: Isometry3<f64>,
        bounds: (f64, f64),
    ) -> Result<usize, CoreError> {
        self.joints.push(name, parent, kind, axis, placement, bounds)
    }

    pub fn add_body(
        &mut self,
        name: &str,
        joint: &str,
        center: Point3<f64>,
        radius: f64,
    ) -> Result<(), CoreError> {
        let joint = self
            .joints
            .index_of(joint)
            .ok_or_else(|| CoreError::UnknownJoint(joint.to_string()))?;
        if radius < 0.0 {
            return Err(CoreError::InvalidParameter(format!(
                "body {} has negative radius",
                name
            )));
        }
        self.bodies.push(Body {
            name: name.to_string(),
            joint,
            center,
            radius,
        });
        Ok(())
    }

    pub fn add_obstacle(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    pub fn arena(&self) -> &JointArena {
        &self.joints
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// World placement of every joint frame
    pub fn joint_placements(&self, q: &Configuration) -> Result<Vec<Isometry3<f64>>, CoreError> {
        check_dimension("configuration", self.joints.config_size(), q.len())?;
        let mut placements: Vec<Isometry3<f64>> = Vec::with_capacity(self.joints.len());
        for joint in self.joints.as_slice() {
            let parent = joint
                .parent
                .map(|p| placements[p])
                .unwrap_or_else(Isometry3::identity);
            placements.push(parent * joint.placement * joint.motion(q[joint.config_rank]));
        }
        Ok(placements)
    }

    /// Resolve a frame name: joint frames by joint name, body frames by body name
    fn resolve_frame(&self, frame: &str) -> Result<(usize, Point3<f64>), CoreError> {
        if let Some(index) = self.joints.index_of(frame) {
            return Ok((index, Point3::origin()));
        }
        self.bodies
            .iter()
            .find(|b| b.name == frame)
            .map(|b| (b.joint, b.center))
            .ok_or_else(|| CoreError::UnknownFrame(frame.to_string()))
    }

    fn world_axis(joint: &Joint, placement: &Isometry3<f64>) -> Vector3<f64> {
        placement.rotation * joint.axis.into_inner()
    }
}

impl ConfigurationModel for KinematicTree {
    fn joints(&self) -> &[Joint] {
        self.joints.as_slice()
    }

    fn frame_placement(&self, q: &Configuration, frame: &str) -> Result<Isometry3<f64>, CoreError> {
        let (joint, offset) = self.resolve_frame(frame)?;
        let placements = self.joint_placements(q)?;
        let mut placement = placements[joint];
        placement.translation.vector = placement.transform_point(&offset).coords;
        Ok(placement)
    }

    fn frame_jacobian(&self, q: &Configuration, frame: &str) -> Result<DMatrix<f64>, CoreError> {
        let (joint, offset) = self.resolve_frame(frame)?;
        let placements = self.joint_placements(q)?;
        let frame_origin = placements[joint].transform_point(&offset);

        let mut jacobian = DMatrix::zeros(6, self.joints.velocity_size());
        for index in self.joints.chain(joint) {
            let j = &self.joints.as_slice()[index];
            let axis = Self::world_axis(j, &placements[index]);
            let col = j.velocity_rank;
            match j.kind {
                JointKind::Prismatic => {
                    for k in 0..3 {
                        jacobian[(k, col)] = axis[k];
                    }
                }
                JointKind::Revolute | JointKind::Continuous => {
                    let origin = Point3::from(placements[index].translation.vector);
                    let linear = axis.cross(&(frame_origin - origin));
                    for k in 0..3 {
                        jacobian[(k, col)] = linear[k];
                        jacobian[(k + 3, col)] = axis[k];
                    }
                }
            }
        }
        Ok(jacobian)
    }

    fn collision_pairs(&self, q: &Configuration) -> Result<Vec<CollisionPair>, CoreError> {
        let placements = self.joint_placements(q)?;
        let mut pairs = Vec::with_capacity(self.bodies.len() * self.obstacles.len());
        for body in &self.bodies {
            let center = placements[body.joint].transform_point(&body.center);
            for obstacle in &self.obstacles {
                let (distance, witness_body, witness_obstacle) =
                    obstacle.distance_to_sphere(&center, body.radius);
                pairs.push(CollisionPair {
                    body: body.name.clone(),
                    obstacle: obstacle.name.clone(),
                    distance,
                    witness_body,
                    witness_obstacle,
                });
            }
        }
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{DVector, Translation3, UnitQuaternion};
    use std::f64::consts::FRAC_PI_2;

    /// Planar two-link arm: shoulder at origin, elbow 1 m along x, tool 1 m further
    fn two_link_arm() -> KinematicTree {
        let mut tree = KinematicTree::new();
        tree.add_joint(
            "shoulder",
            None,
            JointKind::Revolute,
            Vector3::z_axis(),
            Isometry3::identity(),
            (-3.0, 3.0),
        )
        .unwrap();
        tree.add_joint(
            "elbow",
            Some("shoulder"),
            JointKind::Continuous,
            Vector3::z_axis(),
            Isometry3::from_parts(Translation3::new(1.0, 0.0, 0.0), UnitQuaternion::identity()),
            (0.0, 0.0),
        )
        .unwrap();
        tree.add_body("tool", "elbow", Point3::new(1.0, 0.0, 0.0), 0.1)
            .unwrap();
        tree
    }

    #[test]
    fn test_forward_kinematics_at_zero() {
        let tree = two_link_arm();
        let q = DVector::from_vec(vec![0.0, 0.0]);
        let tool = tree.frame_placement(&q, "tool").unwrap();
        assert_relative_eq!(tool.translation.vector, Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_forward_kinematics_bent() {
        let tree = two_link_arm();
        let q = DVector::from_vec(vec![FRAC_PI_2, -FRAC_PI_2]);
        let tool = tree.frame_placement(&q, "tool").unwrap();
        // Shoulder up along y, elbow back to +x
        assert_relative_eq!(tool.translation.vector, Vector3::new(1.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_jacobian_matches_finite_differences() {
        let tree = two_link_arm();
        let q = DVector::from_vec(vec![0.3, -0.7]);
        let jacobian = tree.frame_jacobian(&q, "tool").unwrap();
        let h = 1e-7;
        for col in 0..2 {
            let mut qp = q.clone();
            qp[col] += h;
            let p0 = tree.frame_placement(&q, "tool").unwrap().translation.vector;
            let p1 = tree.frame_placement(&qp, "tool").unwrap().translation.vector;
            let numeric = (p1 - p0) / h;
            for row in 0..3 {
                assert_relative_eq!(jacobian[(row, col)], numeric[row], epsilon = 1e-5);
            }
            assert_relative_eq!(jacobian[(5, col)], 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_unknown_frame() {
        let tree = two_link_arm();
        let q = DVector::zeros(2);
        assert!(matches!(
            tree.frame_placement(&q, "gripper"),
            Err(CoreError::UnknownFrame(_))
        ));
    }

    #[test]
    fn test_sphere_obstacle_distance() {
        let mut tree = KinematicTree::free_point(&[(-2.0, 2.0), (-2.0, 2.0)], 0.1).unwrap();
        tree.add_obstacle(Obstacle::sphere("ball", Point3::new(1.0, 0.0, 0.0), 0.4));

        let pairs = tree.collision_pairs(&DVector::from_vec(vec![0.0, 0.0])).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_relative_eq!(pairs[0].distance, 0.5, epsilon = 1e-12);
        assert_relative_eq!(pairs[0].witness_body.x, 0.1, epsilon = 1e-12);
        assert_relative_eq!(pairs[0].witness_obstacle.x, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_box_obstacle_distance() {
        let mut tree = KinematicTree::free_point(&[(-2.0, 2.0), (-2.0, 2.0)], 0.1).unwrap();
        tree.add_obstacle(Obstacle::cuboid(
            "wall",
            Point3::origin(),
            Vector3::new(0.1, 1.0, 1.0),
        ));

        let outside = tree.collision_pairs(&DVector::from_vec(vec![0.5, 0.0])).unwrap();
        assert_relative_eq!(outside[0].distance, 0.3, epsilon = 1e-12);

        let inside = tree.collision_pairs(&DVector::from_vec(vec![0.05, 0.0])).unwrap();
        assert!(inside[0].distance < 0.0);
        assert_relative_eq!(inside[0].distance, -0.15, epsilon = 1e-12);
    }

    #[test]
    fn test_free_point_rejects_bad_dimension() {
        assert!(KinematicTree::free_point(&[], 0.1).is_err());
        assert!(KinematicTree::free_point(&[(0.0, 1.0); 4], 0.1).is_err());
    }
}
