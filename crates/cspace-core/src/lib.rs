//! # cspace-core
//!
//! Configuration-space foundations for sampling-based motion planning of
//! articulated mechanisms.
//!
//! ## Modules
//!
//! - [`model`]: Kinematic/collision model interface and a reference joint-tree model
//! - [`constraints`]: Numerical constraints and the projection solver
//! - [`validation`]: Configuration validity (joint bounds, collisions)
//! - [`error`]: Error taxonomy shared with the planner crate

pub mod error;
pub mod model;
pub mod constraints;
pub mod validation;

use nalgebra::{DMatrix, DVector};

pub use error::{CoreError, ErrorKind};

/// Joint-space configuration (length = `config_size` of the model)
pub type Configuration = DVector<f64>;

/// Velocity-space vector (length = `velocity_size` of the model)
pub type Velocity = DVector<f64>;

/// Dense Jacobian matrix
pub type Jacobian = DMatrix<f64>;

/// Tolerance used when comparing configurations for equality
pub const CONFIG_EPSILON: f64 = 1e-12;

/// Tolerance applied on joint bounds checks
pub const BOUNDS_EPSILON: f64 = 1e-9;
