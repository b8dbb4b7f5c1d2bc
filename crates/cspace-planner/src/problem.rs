//! Planning problem
//!
//! A problem owns everything one planning query needs: the model handle,
//! initial and goal configurations, the constraint system, the roadmap, the
//! path store and the selected strategies. Solving runs through the state
//! machine of [`SolveState`]:
//!
//! - `prepare_solve_step_by_step`: insert init and goals, try direct
//!   connections
//! - `execute_one_step`: one growth iteration of the selected planner
//! - `finish_solve_step_by_step`: extract the roadmap path into the store
//! - `solve`: all of the above, then the optimizer pipeline

use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::Instant;

use cspace_core::constraints::{ConstraintSystem, Projection};
use cspace_core::error::check_dimension;
use cspace_core::model::ConfigurationModel;
use cspace_core::validation::{ConfigurationValidator, ValidationReport};
use cspace_core::{Configuration, Velocity};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{PlannerConfig, StrategyConfig};
use crate::distance::Distance;
use crate::error::PlannerError;
use crate::parameter::ParameterValue;
use crate::path::{OptimizationContext, Path, PathProjector, PathStore, PathValidator, ProgressiveProjector};
use crate::planner::{InterruptFlag, PathPlanner, PlanningContext, SolveOutcome, SolveState};
use crate::roadmap::Roadmap;
use crate::steering::SteeringMethod;
use crate::strategy::{
    Category, DistanceKind, OptimizerKind, PathValidatorKind, PlannerKind, ProjectorKind,
    SteeringKind,
};
use crate::{NodeId, PathId};

/// Selected strategy implementations
#[derive(Debug, Clone, PartialEq)]
pub struct Strategies {
    pub planner: PlannerKind,
    pub distance: DistanceKind,
    pub steering: SteeringKind,
    pub path_validator: PathValidatorKind,
    pub projector: ProjectorKind,
    pub optimizers: Vec<OptimizerKind>,
}

impl Strategies {
    pub fn from_config(config: &StrategyConfig) -> Result<Self, PlannerError> {
        Ok(Self {
            planner: PlannerKind::from_name(&config.planner)?,
            distance: DistanceKind::from_name(&config.distance)?,
            steering: SteeringKind::from_name(&config.steering_method)?,
            path_validator: PathValidatorKind::from_name(&config.path_validator)?,
            projector: ProjectorKind::from_name(&config.path_projector)?,
            optimizers: config
                .path_optimizers
                .iter()
                .map(|name| OptimizerKind::from_name(name))
                .collect::<Result<_, _>>()?,
        })
    }
}

/// Outcome of a direct path request
#[derive(Debug, Clone, PartialEq)]
pub struct DirectPath {
    /// The whole path was built and is valid
    pub success: bool,
    /// Stored path (the valid part when validation failed)
    pub path_id: Option<PathId>,
    /// Why the request did not fully succeed
    pub report: Option<String>,
}

/// Strategies and roadmap anchors of an attempt in progress
#[derive(Debug)]
struct SolveSession {
    planner: Box<dyn PathPlanner>,
    steering: Box<dyn SteeringMethod>,
    path_validator: Box<dyn PathValidator>,
    projector: Option<Box<dyn PathProjector>>,
    validator: ConfigurationValidator,
    init_node: NodeId,
    goal_nodes: Vec<NodeId>,
}

/// One planning problem
#[derive(Debug)]
pub struct Problem {
    name: String,
    model: Arc<dyn ConfigurationModel>,
    config: PlannerConfig,
    strategies: Strategies,
    init: Option<Configuration>,
    goals: Vec<Configuration>,
    goal_constraints: Vec<String>,
    constraints: ConstraintSystem,
    roadmap: Roadmap,
    paths: PathStore,
    interrupt: InterruptFlag,
    state: SolveState,
    session: Option<SolveSession>,
    rng: StdRng,
}

impl Problem {
    pub fn new(
        name: &str,
        model: Arc<dyn ConfigurationModel>,
        config: PlannerConfig,
    ) -> Result<Self, PlannerError> {
        config.validate()?;
        let strategies = Strategies::from_config(&config.strategies)?;
        let distance = strategies.distance.build(model.clone());
        Ok(Self {
            name: name.to_string(),
            roadmap: Roadmap::new(model.clone(), distance),
            constraints: ConstraintSystem::new(model.clone(), config.projection.clone()),
            rng: StdRng::seed_from_u64(config.planning.seed),
            model,
            config,
            strategies,
            init: None,
            goals: Vec::new(),
            goal_constraints: Vec::new(),
            paths: PathStore::new(),
            interrupt: InterruptFlag::new(),
            state: SolveState::Idle,
            session: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &Arc<dyn ConfigurationModel> {
        &self.model
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn strategies(&self) -> &Strategies {
        &self.strategies
    }

    pub fn solve_state(&self) -> SolveState {
        self.state
    }

    pub fn roadmap(&self) -> &Roadmap {
        &self.roadmap
    }

    pub fn constraints(&self) -> &ConstraintSystem {
        &self.constraints
    }

    pub fn constraints_mut(&mut self) -> &mut ConstraintSystem {
        &mut self.constraints
    }

    pub fn paths(&self) -> &PathStore {
        &self.paths
    }

    fn state_error(&self, operation: &'static str) -> PlannerError {
        PlannerError::InvalidState {
            operation,
            state: self.state.to_string(),
        }
    }

    /// Fail while an attempt holds roadmap node ids
    fn ensure_not_stepping(&self, operation: &'static str) -> Result<(), PlannerError> {
        if self.state.can_step() {
            return Err(self.state_error(operation));
        }
        Ok(())
    }

    fn check_config(&self, q: &Configuration) -> Result<(), PlannerError> {
        Ok(check_dimension("configuration", self.model.config_size(), q.len())?)
    }

    // Initial and goal configurations

    pub fn set_initial_config(&mut self, q: &Configuration) -> Result<(), PlannerError> {
        self.check_config(q)?;
        self.init = Some(q.clone());
        Ok(())
    }

    pub fn initial_config(&self) -> Option<&Configuration> {
        self.init.as_ref()
    }

    pub fn add_goal_config(&mut self, q: &Configuration) -> Result<(), PlannerError> {
        self.check_config(q)?;
        self.goals.push(q.clone());
        Ok(())
    }

    pub fn goal_configs(&self) -> &[Configuration] {
        &self.goals
    }

    pub fn reset_goal_configs(&mut self) {
        self.goals.clear();
    }

    /// Goal defined by registered constraints; a goal configuration is
    /// generated from them when solving
    pub fn add_goal_constraints(&mut self, names: &[&str]) -> Result<(), PlannerError> {
        for name in names {
            if !self.constraints.is_registered(name) {
                return Err(cspace_core::CoreError::UnknownConstraint(name.to_string()).into());
            }
        }
        for name in names {
            if !self.goal_constraints.iter().any(|n| n == name) {
                self.goal_constraints.push(name.to_string());
            }
        }
        Ok(())
    }

    pub fn goal_constraints(&self) -> &[String] {
        &self.goal_constraints
    }

    pub fn reset_goal_constraints(&mut self) {
        self.goal_constraints.clear();
    }

    // Strategy selection

    pub fn select_planner(&mut self, name: &str) -> Result<(), PlannerError> {
        self.strategies.planner = PlannerKind::from_name(name)?;
        Ok(())
    }

    /// Select the metric; the roadmap is cleared since node distances change
    pub fn select_distance(&mut self, name: &str) -> Result<(), PlannerError> {
        let kind = DistanceKind::from_name(name)?;
        self.ensure_not_stepping("select a distance")?;
        self.strategies.distance = kind;
        self.roadmap.reset(kind.build(self.model.clone()));
        info!("[Problem] {}: distance {} selected, roadmap reset", self.name, name);
        Ok(())
    }

    pub fn select_steering_method(&mut self, name: &str) -> Result<(), PlannerError> {
        self.strategies.steering = SteeringKind::from_name(name)?;
        Ok(())
    }

    pub fn select_path_validator(&mut self, name: &str, tolerance: f64) -> Result<(), PlannerError> {
        let kind = PathValidatorKind::from_name(name)?;
        self.config
            .set_parameter("validation/penetration", &ParameterValue::Float(tolerance))?;
        self.strategies.path_validator = kind;
        Ok(())
    }

    pub fn select_path_projector(&mut self, name: &str, step: f64) -> Result<(), PlannerError> {
        let kind = ProjectorKind::from_name(name)?;
        if kind != ProjectorKind::None {
            self.config
                .set_parameter("optimization/projector_step", &ParameterValue::Float(step))?;
        }
        self.strategies.projector = kind;
        Ok(())
    }

    pub fn add_path_optimizer(&mut self, name: &str) -> Result<(), PlannerError> {
        self.strategies.optimizers.push(OptimizerKind::from_name(name)?);
        Ok(())
    }

    pub fn clear_path_optimizers(&mut self) {
        self.strategies.optimizers.clear();
    }

    /// Selected implementation names of a category
    pub fn selected(&self, category: Category) -> Vec<String> {
        match category {
            Category::Planner => vec![self.strategies.planner.name().to_string()],
            Category::Distance => vec![self.strategies.distance.name().to_string()],
            Category::SteeringMethod => vec![self.strategies.steering.name().to_string()],
            Category::PathValidator => vec![self.strategies.path_validator.name().to_string()],
            Category::PathProjector => vec![self.strategies.projector.name().to_string()],
            Category::PathOptimizer => self
                .strategies
                .optimizers
                .iter()
                .map(|k| k.name().to_string())
                .collect(),
            Category::Problem => vec![self.name.clone()],
        }
    }

    // Parameters

    pub fn set_parameter(&mut self, key: &str, value: &ParameterValue) -> Result<(), PlannerError> {
        self.config.set_parameter(key, value)?;
        *self.constraints.config_mut() = self.config.projection.clone();
        if key == "planning/seed" {
            self.rng = StdRng::seed_from_u64(self.config.planning.seed);
        }
        debug!("[Problem] {}: {} = {}", self.name, key, value);
        Ok(())
    }

    pub fn get_parameter(&self, key: &str) -> Result<ParameterValue, PlannerError> {
        self.config.get_parameter(key)
    }

    // Interruption

    /// Handle on the interruption flag, usable from other threads
    pub fn interrupt_flag(&self) -> InterruptFlag {
        self.interrupt.clone()
    }

    pub fn interrupt(&self) {
        self.interrupt.raise();
    }

    // Strategy instances

    pub fn distance(&self) -> Arc<dyn Distance> {
        self.roadmap.distance().clone()
    }

    pub fn config_validator(&self) -> ConfigurationValidator {
        ConfigurationValidator::new(self.model.clone(), self.config.validation.penetration)
    }

    fn build_steering(&self) -> Box<dyn SteeringMethod> {
        self.strategies.steering.build(self.model.clone(), self.distance())
    }

    fn build_path_validator(&self) -> Box<dyn PathValidator> {
        self.strategies
            .path_validator
            .build(self.config_validator(), self.config.validation.discretization_step)
    }

    fn build_projector(&self) -> Option<Box<dyn PathProjector>> {
        self.strategies.projector.build(
            &self.constraints,
            self.distance(),
            self.config.optimization.projector_step,
        )
    }

    // Configurations

    pub fn is_config_valid(&self, q: &Configuration) -> Result<ValidationReport, PlannerError> {
        Ok(self.config_validator().validate(q)?)
    }

    pub fn apply_constraints(&self, q: &Configuration) -> Result<Projection, PlannerError> {
        Ok(self.constraints.apply_constraints(q)?)
    }

    pub fn generate_valid_config(&mut self, max_iterations: usize) -> Result<Option<Configuration>, PlannerError> {
        let validator = self.config_validator();
        Ok(self
            .constraints
            .generate_valid_config(&validator, &mut self.rng, max_iterations)?)
    }

    // Paths

    /// Store a path built for this problem's model
    pub fn add_path(&mut self, path: Path) -> Result<PathId, PlannerError> {
        self.check_config(path.initial())?;
        Ok(self.paths.add(path))
    }

    /// Store a path through the waypoints, measured with the current metric
    pub fn add_path_from_waypoints(&mut self, waypoints: Vec<Configuration>) -> Result<PathId, PlannerError> {
        let path = Path::new(self.model.clone(), self.distance().as_ref(), waypoints)?;
        self.add_path(path)
    }

    pub fn path(&self, id: PathId) -> Result<&Path, PlannerError> {
        self.paths.get(id)
    }

    pub fn path_ids(&self) -> Vec<PathId> {
        self.paths.path_ids()
    }

    pub fn path_length(&self, id: PathId) -> Result<f64, PlannerError> {
        Ok(self.paths.get(id)?.length())
    }

    pub fn configuration_at(&self, id: PathId, parameter: f64) -> Result<Configuration, PlannerError> {
        self.paths.get(id)?.config_at(parameter)
    }

    pub fn velocity_at(&self, id: PathId, parameter: f64) -> Result<Velocity, PlannerError> {
        self.paths.get(id)?.velocity_at(parameter)
    }

    pub fn path_waypoints(&self, id: PathId) -> Result<Vec<Configuration>, PlannerError> {
        Ok(self.paths.get(id)?.waypoints().to_vec())
    }

    pub fn erase_path(&mut self, id: PathId) -> Result<(), PlannerError> {
        self.paths.erase(id)?;
        Ok(())
    }

    pub fn concatenate_path(&mut self, a: PathId, b: PathId) -> Result<(), PlannerError> {
        self.paths.concatenate(a, b)
    }

    /// Steer from the end of a stored path to `q` and extend the path with
    /// the segment; `false` (path untouched) when steering, projection or
    /// validation fails
    pub fn append_path(&mut self, id: PathId, q: &Configuration) -> Result<bool, PlannerError> {
        self.check_config(q)?;
        let end = self.paths.get(id)?.end().clone();
        let Some(segment) = self.build_steering().steer(&end, q)? else {
            return Ok(false);
        };
        let segment = match self.build_projector() {
            Some(projector) => match projector.project(&segment)? {
                Some(projected) => projected,
                None => return Ok(false),
            },
            None => segment,
        };
        if !self.build_path_validator().validate(&segment)?.valid {
            debug!("[Problem] {}: appended segment to path {} is invalid", self.name, id);
            return Ok(false);
        }
        Ok(self.paths.get_mut(id)?.concat(&segment))
    }

    /// Build, optionally validate, and store a direct path `q1 → q2`
    pub fn direct_path(
        &mut self,
        q1: &Configuration,
        q2: &Configuration,
        validate: bool,
    ) -> Result<DirectPath, PlannerError> {
        self.check_config(q1)?;
        self.check_config(q2)?;
        let Some(path) = self.build_steering().steer(q1, q2)? else {
            return Ok(DirectPath {
                success: false,
                path_id: None,
                report: Some("steering method failed".to_string()),
            });
        };
        let path = match self.build_projector() {
            Some(projector) => match projector.project(&path)? {
                Some(projected) => projected,
                None => {
                    return Ok(DirectPath {
                        success: false,
                        path_id: None,
                        report: Some("path projection failed".to_string()),
                    })
                }
            },
            None => path,
        };
        if !validate {
            return Ok(DirectPath {
                success: true,
                path_id: Some(self.paths.add(path)),
                report: None,
            });
        }

        let validation = self.build_path_validator().validate(&path)?;
        Ok(DirectPath {
            success: validation.valid,
            path_id: Some(self.paths.add(validation.valid_part)),
            report: validation.report.map(|r| r.to_string()),
        })
    }

    /// Run the optimizer pipeline on a stored path; the result is a new path
    pub fn optimize_path(&mut self, id: PathId) -> Result<PathId, PlannerError> {
        let mut current = self.paths.get(id)?.clone();
        let steering = self.build_steering();
        let validator = self.build_path_validator();
        let projector = self.build_projector();
        let mut context = OptimizationContext {
            steering: steering.as_ref(),
            validator: validator.as_ref(),
            projector: projector.as_deref(),
            rng: &mut self.rng,
        };
        for kind in &self.strategies.optimizers {
            let optimizer = kind.build(&self.config.optimization);
            current = optimizer.optimize(&current, &mut context)?;
        }
        let new_id = self.paths.add(current);
        info!(
            "[Problem] {}: optimized path {} into path {}",
            self.name, id, new_id
        );
        Ok(new_id)
    }

    /// Project a stored path onto the constraints; `None` when projection fails
    ///
    /// Uses the selected projector, or a progressive one when none is selected.
    pub fn project_path(&mut self, id: PathId) -> Result<Option<PathId>, PlannerError> {
        let path = self.paths.get(id)?.clone();
        let projector: Box<dyn PathProjector> = match self.build_projector() {
            Some(projector) => projector,
            None => Box::new(ProgressiveProjector::new(
                self.constraints.clone(),
                self.distance(),
                self.config.optimization.projector_step,
            )),
        };
        match projector.project(&path)? {
            Some(projected) => Ok(Some(self.paths.add(projected))),
            None => {
                debug!("[Problem] {}: projection of path {} failed", self.name, id);
                Ok(None)
            }
        }
    }

    // Roadmap

    pub fn add_config_to_roadmap(&mut self, q: &Configuration) -> Result<NodeId, PlannerError> {
        self.roadmap.add_node(q)
    }

    /// Insert an edge between the nodes of `q1` and `q2` over a stored path
    pub fn add_edge_to_roadmap(
        &mut self,
        q1: &Configuration,
        q2: &Configuration,
        path_id: PathId,
        both: bool,
    ) -> Result<(), PlannerError> {
        self.check_config(q1)?;
        self.check_config(q2)?;
        let path = self.paths.get(path_id)?.clone();
        let distance = self.distance();
        let tolerance = crate::path::CONTINUITY_TOLERANCE;
        if distance.distance(path.initial(), q1) > tolerance || distance.distance(path.end(), q2) > tolerance {
            return Err(PlannerError::InvalidArgument(format!(
                "path {} does not join the given configurations",
                path_id
            )));
        }
        let from = self.roadmap.add_node(q1)?;
        let to = self.roadmap.add_node(q2)?;
        self.roadmap.add_edge(from, to, path, both)?;
        Ok(())
    }

    pub fn clear_roadmap(&mut self) -> Result<(), PlannerError> {
        self.ensure_not_stepping("clear the roadmap")?;
        self.roadmap.clear();
        Ok(())
    }

    pub fn save_roadmap<P: AsRef<FsPath>>(&self, path: P) -> Result<(), PlannerError> {
        self.roadmap.save_to_file(path)
    }

    /// Replace the roadmap with one read from disk
    pub fn load_roadmap<P: AsRef<FsPath>>(&mut self, path: P) -> Result<(), PlannerError> {
        self.ensure_not_stepping("load a roadmap")?;
        self.roadmap = Roadmap::load_from_file(path, self.model.clone(), self.distance())?;
        Ok(())
    }

    // Solving

    fn planning_context<'a>(
        session: &'a SolveSession,
        roadmap: &'a mut Roadmap,
        constraints: &'a ConstraintSystem,
        config: &'a PlannerConfig,
        rng: &'a mut StdRng,
    ) -> PlanningContext<'a> {
        PlanningContext {
            roadmap,
            init_node: session.init_node,
            goal_nodes: &session.goal_nodes,
            constraints,
            validator: &session.validator,
            steering: session.steering.as_ref(),
            path_validator: session.path_validator.as_ref(),
            projector: session.projector.as_deref(),
            config,
            rng,
        }
    }

    /// Insert init and goal nodes and try to connect them directly
    ///
    /// Returns whether the direct connections alone solved the problem.
    pub fn prepare_solve_step_by_step(&mut self) -> Result<bool, PlannerError> {
        if !self.state.can_prepare() {
            return Err(self.state_error("prepare a solve"));
        }
        let init = self.init.clone().ok_or(PlannerError::MissingInitConfig)?;
        if self.goals.is_empty() && self.goal_constraints.is_empty() {
            return Err(PlannerError::MissingGoal);
        }

        let mut goals = self.goals.clone();
        if !self.goal_constraints.is_empty() {
            let system = self.constraints.with_additional(&self.goal_constraints)?;
            let validator = self.config_validator();
            let attempts = self.config.planning.goal_generation_attempts;
            match system.generate_valid_config(&validator, &mut self.rng, attempts)? {
                Some(q) => goals.push(q),
                None => warn!(
                    "[Planner] {}: no configuration satisfies the goal constraints after {} attempts",
                    self.name, attempts
                ),
            }
        }
        if goals.is_empty() {
            return Err(PlannerError::MissingGoal);
        }

        let init_node = self.roadmap.add_node(&init)?;
        let goal_nodes = goals
            .iter()
            .map(|q| self.roadmap.add_node(q))
            .collect::<Result<Vec<_>, _>>()?;
        let session = SolveSession {
            planner: self.strategies.planner.build(),
            steering: self.build_steering(),
            path_validator: self.build_path_validator(),
            projector: self.build_projector(),
            validator: self.config_validator(),
            init_node,
            goal_nodes,
        };

        let solved = {
            let mut ctx = Self::planning_context(
                &session,
                &mut self.roadmap,
                &self.constraints,
                &self.config,
                &mut self.rng,
            );
            let init_q = ctx.roadmap.node(init_node)?.configuration.clone();
            for &goal in &session.goal_nodes {
                if ctx.roadmap.reaches(init_node, goal)? {
                    continue;
                }
                let goal_q = ctx.roadmap.node(goal)?.configuration.clone();
                if let Some(local) = ctx.local_path(&init_q, &goal_q)? {
                    if local.complete {
                        ctx.roadmap.add_edge(init_node, goal, local.path, true)?;
                    }
                }
            }
            ctx.is_solved()?
        };

        info!(
            "[Planner] {}: prepared with {} goal(s), direct connection {}",
            self.name,
            session.goal_nodes.len(),
            if solved { "succeeded" } else { "failed" }
        );
        self.session = Some(session);
        self.state = SolveState::Prepared;
        Ok(solved)
    }

    /// One growth iteration; returns whether init and a goal are connected
    pub fn execute_one_step(&mut self) -> Result<bool, PlannerError> {
        if !self.state.can_step() {
            return Err(self.state_error("execute a step"));
        }
        let mut session = self
            .session
            .take()
            .ok_or_else(|| self.state_error("execute a step"))?;

        let result = {
            let SolveSession {
                planner,
                steering,
                path_validator,
                projector,
                validator,
                init_node,
                goal_nodes,
            } = &mut session;
            let mut ctx = PlanningContext {
                roadmap: &mut self.roadmap,
                init_node: *init_node,
                goal_nodes,
                constraints: &self.constraints,
                validator,
                steering: steering.as_ref(),
                path_validator: path_validator.as_ref(),
                projector: projector.as_deref(),
                config: &self.config,
                rng: &mut self.rng,
            };
            planner.one_step(&mut ctx).and_then(|_| ctx.is_solved())
        };

        self.session = Some(session);
        self.state = SolveState::Stepping;
        result
    }

    /// Extract the roadmap path from init to the closest connected goal
    ///
    /// No optimizer runs here. Moves to `Done` when a path was stored,
    /// `Idle` otherwise.
    pub fn finish_solve_step_by_step(&mut self) -> Result<Option<PathId>, PlannerError> {
        if !self.state.can_step() {
            return Err(self.state_error("finish a solve"));
        }
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| self.state_error("finish a solve"))?;

        let mut best: Option<Path> = None;
        for &goal in &session.goal_nodes {
            if let Some(path) = self.roadmap.path_between(session.init_node, goal)? {
                if best.as_ref().map_or(true, |b| path.length() < b.length()) {
                    best = Some(path);
                }
            }
        }

        let path_id = best.map(|path| self.paths.add(path));
        self.session = None;
        self.state = if path_id.is_some() {
            SolveState::Done
        } else {
            SolveState::Idle
        };
        match path_id {
            Some(id) => info!("[Planner] {}: solution stored as path {}", self.name, id),
            None => info!("[Planner] {}: no solution path", self.name),
        }
        Ok(path_id)
    }

    /// Drop the attempt in progress
    fn abandon(&mut self) {
        self.session = None;
        self.state = SolveState::Idle;
    }

    /// Prepare, step until solved, capped or interrupted, finish, optimize
    ///
    /// A raised interruption flag is observed before each step and is
    /// cleared when the call returns; roadmap growth is kept.
    pub fn solve(&mut self) -> Result<SolveOutcome, PlannerError> {
        let start = Instant::now();
        let mut solved = self.prepare_solve_step_by_step()?;
        let max_iterations = self.config.planning.max_iterations;
        let mut iterations = 0;
        let mut interrupted = false;

        while !solved {
            if self.interrupt.take() {
                interrupted = true;
                info!("[Planner] {}: interrupted after {} steps", self.name, iterations);
                break;
            }
            if iterations >= max_iterations {
                warn!("[Planner] {}: iteration cap {} reached", self.name, max_iterations);
                break;
            }
            match self.execute_one_step() {
                Ok(connected) => solved = connected,
                Err(e) => {
                    self.abandon();
                    return Err(e);
                }
            }
            iterations += 1;
        }
        // A flag raised while no step ran must not leak into the next solve
        self.interrupt.take();

        let path_id = self.finish_solve_step_by_step()?;
        let optimized_path_id = match path_id {
            Some(id) if !self.strategies.optimizers.is_empty() => Some(self.optimize_path(id)?),
            _ => None,
        };
        let elapsed = start.elapsed();
        info!(
            "[Planner] {}: {} in {} steps, {:.3}s, roadmap {} nodes / {} components",
            self.name,
            if path_id.is_some() { "solved" } else { "not solved" },
            iterations,
            elapsed.as_secs_f64(),
            self.roadmap.node_count(),
            self.roadmap.component_count()
        );
        Ok(SolveOutcome {
            solved: path_id.is_some(),
            path_id,
            optimized_path_id,
            iterations,
            interrupted,
            elapsed,
        })
    }
}
