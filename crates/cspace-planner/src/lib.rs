//! # cspace-planner
//!
//! Sampling-based motion planning in configuration space.
//!
//! A [`Problem`] owns a [`roadmap::Roadmap`], a constraint system and a
//! [`path::PathStore`]. Planning grows the roadmap until the initial
//! configuration and a goal configuration share a connected component:
//!
//! ```text
//! Idle ──prepare──▶ Prepared ──step──▶ Stepping ──finish──▶ Done
//!   ▲                                     │ ▲                  │
//!   └──────────── finish (no path) ───────┘ └─step─┘           │
//!   ◀────────────────────────── prepare ───────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`config`]: Planner configuration (YAML)
//! - [`parameter`]: Tagged runtime parameters
//! - [`distance`]: Configuration-space metrics
//! - [`steering`]: Steering methods
//! - [`path`]: Paths, path store, validation, projection, optimization
//! - [`roadmap`]: Roadmap graph, nearest neighbours, persistence
//! - [`planner`]: Planning strategies and the solve state machine
//! - [`strategy`]: Catalog of available strategy implementations
//! - [`problem`]: One planning problem
//! - [`registry`]: Named problems and cross-problem operations

pub mod config;
pub mod error;
pub mod parameter;
pub mod distance;
pub mod steering;
pub mod path;
pub mod roadmap;
pub mod planner;
pub mod strategy;
pub mod problem;
pub mod registry;

/// Identifier of a path in a problem's path store
pub type PathId = usize;

/// Identifier of a roadmap node
pub type NodeId = usize;

/// Identifier of a roadmap edge
pub type EdgeId = usize;

/// Identifier of a roadmap connected component
pub type ComponentId = usize;

// Re-exports
pub use config::PlannerConfig;
pub use error::PlannerError;
pub use parameter::ParameterValue;
pub use planner::{InterruptFlag, SolveOutcome, SolveState};
pub use problem::{DirectPath, Problem};
pub use registry::{ProblemRegistry, SharedProblem};
pub use strategy::Category;
