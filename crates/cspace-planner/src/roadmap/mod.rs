//! Roadmap
//!
//! Graph of validated configurations (nodes) joined by local paths (edges),
//! with connected-component tracking, nearest-neighbour queries and JSON
//! persistence.

pub mod graph;
pub mod nearest;
pub mod search;
pub mod io;

pub use graph::*;
pub use nearest::*;
pub use io::*;
