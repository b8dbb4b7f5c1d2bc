//! Planning strategies
//!
//! A planner performs one roadmap growth iteration per call. The solve loop
//! itself (prepare, step, finish) lives on [`crate::Problem`]; planners see
//! the problem through a [`PlanningContext`].

pub mod state;
pub mod diffusing;
pub mod prm;

pub use state::*;
pub use diffusing::DiffusingPlanner;
pub use prm::PrmPlanner;

use std::fmt::Debug;

use cspace_core::constraints::ConstraintSystem;
use cspace_core::validation::ConfigurationValidator;
use cspace_core::Configuration;
use log::trace;
use rand::rngs::StdRng;

use crate::config::PlannerConfig;
use crate::error::PlannerError;
use crate::path::{Path, PathProjector, PathValidator};
use crate::roadmap::Roadmap;
use crate::steering::SteeringMethod;
use crate::NodeId;

/// One roadmap growth strategy
pub trait PathPlanner: Debug + Send {
    fn name(&self) -> &'static str;

    /// Exactly one growth iteration
    fn one_step(&mut self, context: &mut PlanningContext<'_>) -> Result<(), PlannerError>;
}

/// Steered, projected and validated local path
#[derive(Debug, Clone)]
pub struct LocalPath {
    /// Valid part of the path, starting at the requested start
    pub path: Path,
    /// The whole path is valid and reaches the requested end
    pub complete: bool,
}

/// What a planner may use and modify during a step
pub struct PlanningContext<'a> {
    pub roadmap: &'a mut Roadmap,
    pub init_node: NodeId,
    pub goal_nodes: &'a [NodeId],
    pub constraints: &'a ConstraintSystem,
    pub validator: &'a ConfigurationValidator,
    pub steering: &'a dyn SteeringMethod,
    pub path_validator: &'a dyn PathValidator,
    pub projector: Option<&'a dyn PathProjector>,
    pub config: &'a PlannerConfig,
    pub rng: &'a mut StdRng,
}

impl PlanningContext<'_> {
    /// Random configuration, projected onto the constraints when any are active
    pub fn sample(&mut self) -> Result<Option<Configuration>, PlannerError> {
        let q = self.constraints.model().random_config(&mut *self.rng);
        if !self.constraints.has_active_constraints() {
            return Ok(Some(q));
        }
        let projection = self.constraints.apply_constraints(&q)?;
        Ok(projection.success.then_some(projection.configuration))
    }

    /// Steer from `q1` toward `q2`, project, and keep the valid part
    ///
    /// `None` when steering or projection fails.
    pub fn local_path(
        &self,
        q1: &Configuration,
        q2: &Configuration,
    ) -> Result<Option<LocalPath>, PlannerError> {
        let Some(path) = self.steering.steer(q1, q2)? else {
            return Ok(None);
        };
        let path = match self.projector {
            Some(projector) => match projector.project(&path)? {
                Some(projected) => projected,
                None => return Ok(None),
            },
            None => path,
        };
        let reaches_end = path.continues_into(&Path::from_parts(
            path.model().clone(),
            vec![q2.clone()],
            Vec::new(),
        )?);
        let validation = self.path_validator.validate(&path)?;
        Ok(Some(LocalPath {
            complete: validation.valid && reaches_end,
            path: validation.valid_part,
        }))
    }

    /// Some goal is reachable from init along edge directions
    pub fn is_solved(&self) -> Result<bool, PlannerError> {
        for &goal in self.goal_nodes {
            if self.roadmap.reaches(self.init_node, goal)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Try to link `node` to every other component, testing up to `k` nodes
    /// per component; returns the number of links made
    pub fn connect_to_components(&mut self, node: NodeId, k: usize) -> Result<usize, PlannerError> {
        let q = self.roadmap.node(node)?.configuration.clone();
        let mut links = 0;
        for component in self.roadmap.component_ids() {
            if !self.roadmap.has_component(component) || self.roadmap.component_of(node)? == component {
                continue;
            }
            for (other, _) in self.roadmap.nearest_nodes(&q, Some(component), k)? {
                let target = self.roadmap.node(other)?.configuration.clone();
                let Some(local) = self.local_path(&q, &target)? else {
                    continue;
                };
                if local.complete {
                    self.roadmap.add_edge(node, other, local.path, true)?;
                    trace!("[Planner] linked node {} to node {}", node, other);
                    links += 1;
                    break;
                }
            }
        }
        Ok(links)
    }
}
