//! Diffusing (RRT-style) planner
//!
//! Each step picks a target (a goal with probability `goal_bias`, a random
//! sample otherwise) and extends the nearest node of each component toward
//! it, keeping the valid part of the local path. New nodes then try to link
//! up with the other components.

use cspace_core::CONFIG_EPSILON;
use log::trace;
use rand::Rng;

use super::{PathPlanner, PlanningContext};
use crate::error::PlannerError;

#[derive(Debug, Clone, Default)]
pub struct DiffusingPlanner;

impl DiffusingPlanner {
    pub fn new() -> Self {
        Self
    }
}

impl PathPlanner for DiffusingPlanner {
    fn name(&self) -> &'static str {
        "DiffusingPlanner"
    }

    fn one_step(&mut self, ctx: &mut PlanningContext<'_>) -> Result<(), PlannerError> {
        let goal_bias = ctx.config.planning.goal_bias;
        let toward_goal = !ctx.goal_nodes.is_empty() && ctx.rng.gen::<f64>() < goal_bias;
        let target = if toward_goal {
            let goal = ctx.goal_nodes[ctx.rng.gen_range(0..ctx.goal_nodes.len())];
            Some(ctx.roadmap.node(goal)?.configuration.clone())
        } else {
            ctx.sample()?
        };
        let Some(target) = target else {
            return Ok(());
        };

        let components = if ctx.config.planning.restrict_to_init_component {
            vec![ctx.roadmap.component_of(ctx.init_node)?]
        } else {
            ctx.roadmap.component_ids()
        };

        let mut new_nodes = Vec::new();
        for component in components {
            if !ctx.roadmap.has_component(component) {
                continue;
            }
            let Some((near, d)) = ctx.roadmap.nearest_node(&target, Some(component))? else {
                continue;
            };
            if d <= CONFIG_EPSILON {
                continue;
            }
            let q_near = ctx.roadmap.node(near)?.configuration.clone();
            let extension = ctx.config.roadmap.extension_length;
            let q_target = if extension > 0.0 && d > extension {
                ctx.roadmap
                    .model()
                    .interpolate(&q_near, &target, extension / d)
            } else {
                target.clone()
            };

            let Some(local) = ctx.local_path(&q_near, &q_target)? else {
                continue;
            };
            if local.path.length() <= CONFIG_EPSILON {
                continue;
            }
            let q_new = local.path.end().clone();
            let new = ctx.roadmap.add_node(&q_new)?;
            if new == near {
                continue;
            }
            ctx.roadmap.add_edge(near, new, local.path, true)?;
            trace!("[Planner] extended node {} to new node {}", near, new);
            new_nodes.push(new);
        }

        for node in new_nodes {
            ctx.connect_to_components(node, 1)?;
        }
        Ok(())
    }
}
