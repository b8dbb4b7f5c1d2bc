//! Probabilistic roadmap planner

use log::trace;

use super::{PathPlanner, PlanningContext};
use crate::error::PlannerError;

/// Each step adds one valid configuration and links it to the nearest nodes
/// of every other component
#[derive(Debug, Clone, Default)]
pub struct PrmPlanner;

impl PrmPlanner {
    pub fn new() -> Self {
        Self
    }
}

impl PathPlanner for PrmPlanner {
    fn name(&self) -> &'static str {
        "PrmPlanner"
    }

    fn one_step(&mut self, ctx: &mut PlanningContext<'_>) -> Result<(), PlannerError> {
        let attempts = ctx.config.planning.goal_generation_attempts.max(1);
        let Some(q) = ctx
            .constraints
            .generate_valid_config(ctx.validator, &mut *ctx.rng, attempts)?
        else {
            trace!("[Planner] no valid sample this step");
            return Ok(());
        };
        let node = ctx.roadmap.add_node(&q)?;
        let k = ctx.config.roadmap.nearest_neighbours.max(1);
        ctx.connect_to_components(node, k)?;
        Ok(())
    }
}
