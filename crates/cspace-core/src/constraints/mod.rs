//! Numerical constraints on configurations
//!
//! - Differentiable functions (frame position, frame orientation, affine)
//! - Constraint system: registration, activation, right-hand sides
//! - Projection onto the constraint manifold (hierarchical damped least squares)

pub mod config;
pub mod function;
pub mod system;

pub use config::*;
pub use function::*;
pub use system::*;
