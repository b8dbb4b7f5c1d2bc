//! Paths and the per-problem path pipeline
//!
//! - [`Path`]: piecewise-geodesic path
//! - [`PathStore`]: sparse, never-reused path ids
//! - [`PathValidator`]: collision/bounds checks along a path
//! - [`PathProjector`]: re-projection onto the constraint manifold
//! - [`PathOptimizer`]: shortcut passes

pub mod geodesic;
pub mod store;
pub mod validation;
pub mod projector;
pub mod optimizer;

pub use geodesic::*;
pub use store::*;
pub use validation::*;
pub use projector::*;
pub use optimizer::*;
