//! Problem registry
//!
//! Named problems, one of them active. Each problem sits behind its own
//! mutex; interruption flags are kept next to the handles so a problem can be
//! interrupted while another thread holds its lock for a solve.

use std::collections::BTreeMap;
use std::sync::Arc;

use cspace_core::error::check_dimension;
use cspace_core::model::ConfigurationModel;
use cspace_core::{Configuration, BOUNDS_EPSILON};
use log::{debug, info};
use parking_lot::Mutex;

use crate::config::PlannerConfig;
use crate::error::PlannerError;
use crate::planner::InterruptFlag;
use crate::problem::Problem;
use crate::strategy::Category;
use crate::PathId;

/// Shared handle on a problem
pub type SharedProblem = Arc<Mutex<Problem>>;

/// Name of the problem every registry starts with
pub const DEFAULT_PROBLEM: &str = "default";

#[derive(Debug)]
struct Entry {
    problem: SharedProblem,
    interrupt: InterruptFlag,
}

impl Entry {
    fn new(problem: Problem) -> Self {
        let interrupt = problem.interrupt_flag();
        Self {
            problem: Arc::new(Mutex::new(problem)),
            interrupt,
        }
    }
}

#[derive(Debug)]
pub struct ProblemRegistry {
    entries: BTreeMap<String, Entry>,
    active: String,
    default_model: Arc<dyn ConfigurationModel>,
    default_config: PlannerConfig,
}

impl ProblemRegistry {
    /// Registry holding the active problem `default`; problems created later
    /// by [`Self::select_problem`] use the same model and configuration
    pub fn new(model: Arc<dyn ConfigurationModel>, config: PlannerConfig) -> Result<Self, PlannerError> {
        let problem = Problem::new(DEFAULT_PROBLEM, model.clone(), config.clone())?;
        let mut entries = BTreeMap::new();
        entries.insert(DEFAULT_PROBLEM.to_string(), Entry::new(problem));
        Ok(Self {
            entries,
            active: DEFAULT_PROBLEM.to_string(),
            default_model: model,
            default_config: config,
        })
    }

    /// Make `name` active, creating it if needed; returns whether it was created
    pub fn select_problem(&mut self, name: &str) -> Result<bool, PlannerError> {
        let created = if self.entries.contains_key(name) {
            false
        } else {
            let problem = Problem::new(name, self.default_model.clone(), self.default_config.clone())?;
            self.entries.insert(name.to_string(), Entry::new(problem));
            true
        };
        self.active = name.to_string();
        info!(
            "[Registry] problem {} {}",
            name,
            if created { "created and selected" } else { "selected" }
        );
        Ok(created)
    }

    /// Register a problem over another model without selecting it
    pub fn add_problem(
        &mut self,
        name: &str,
        model: Arc<dyn ConfigurationModel>,
    ) -> Result<SharedProblem, PlannerError> {
        if self.entries.contains_key(name) {
            return Err(PlannerError::InvalidArgument(format!(
                "problem {} already exists",
                name
            )));
        }
        let entry = Entry::new(Problem::new(name, model, self.default_config.clone())?);
        let handle = entry.problem.clone();
        self.entries.insert(name.to_string(), entry);
        debug!("[Registry] problem {} added", name);
        Ok(handle)
    }

    fn entry(&self, name: &str) -> Result<&Entry, PlannerError> {
        self.entries
            .get(name)
            .ok_or_else(|| PlannerError::UnknownProblem(name.to_string()))
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    pub fn active(&self) -> SharedProblem {
        // The active name always refers to a registered problem
        self.entries[&self.active].problem.clone()
    }

    pub fn problem(&self, name: &str) -> Result<SharedProblem, PlannerError> {
        Ok(self.entry(name)?.problem.clone())
    }

    pub fn problem_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn remove_problem(&mut self, name: &str) -> Result<(), PlannerError> {
        self.entry(name)?;
        if name == self.active {
            return Err(PlannerError::InvalidState {
                operation: "remove a problem",
                state: "active".to_string(),
            });
        }
        self.entries.remove(name);
        debug!("[Registry] problem {} removed", name);
        Ok(())
    }

    /// Interruption flag of a problem, reachable without its lock
    pub fn interrupt_handle(&self, name: &str) -> Result<InterruptFlag, PlannerError> {
        Ok(self.entry(name)?.interrupt.clone())
    }

    /// Copy a path of the active problem into `dest`
    ///
    /// With `joints`, only the configuration coordinates of those joints are
    /// kept, in the given order; each joint may be named once and the
    /// destination configuration size must match. Every waypoint must lie
    /// within the destination bounds. Segment lengths are measured with the
    /// destination's metric.
    pub fn move_path_to_problem(
        &self,
        path_id: PathId,
        dest: &str,
        joints: Option<&[&str]>,
    ) -> Result<PathId, PlannerError> {
        if dest == self.active {
            return Err(PlannerError::InvalidArgument(format!(
                "cannot move path {} onto its own problem {}",
                path_id, dest
            )));
        }
        let source = self.active();
        let destination = self.problem(dest)?;

        let source = source.lock();
        let mut destination = destination.lock();

        let path = source.path(path_id)?;
        let waypoints: Vec<Configuration> = match joints {
            None => path.waypoints().to_vec(),
            Some(names) => {
                let model = source.model();
                let mut columns = Vec::new();
                for (i, name) in names.iter().enumerate() {
                    if names[..i].contains(name) {
                        return Err(PlannerError::InvalidArgument(format!(
                            "joint {} listed twice",
                            name
                        )));
                    }
                    let joint = &model.joints()[model.joint_index(name)?];
                    columns.extend(joint.config_rank..joint.config_rank + joint.kind.config_size());
                }
                path.waypoints()
                    .iter()
                    .map(|q| Configuration::from_iterator(columns.len(), columns.iter().map(|&c| q[c])))
                    .collect()
            }
        };
        let size = waypoints.first().map_or(0, |q| q.len());
        check_dimension("configuration", destination.model().config_size(), size)?;
        for q in &waypoints {
            if let Some(e) = destination.model().bounds_violation(q, BOUNDS_EPSILON) {
                return Err(e.into());
            }
        }

        let new_id = destination.add_path_from_waypoints(waypoints)?;
        info!(
            "[Registry] path {} of {} copied to {} as path {}",
            path_id, self.active, dest, new_id
        );
        Ok(new_id)
    }

    /// Names of the implementations available for a category
    pub fn get_available(&self, category: Category) -> Vec<String> {
        category
            .implementations()
            .unwrap_or_else(|| self.problem_names())
    }

    /// Names selected in the active problem (the active name for `Problem`)
    pub fn get_selected(&self, category: Category) -> Vec<String> {
        match category {
            Category::Problem => vec![self.active.clone()],
            _ => self.active().lock().selected(category),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cspace_core::model::KinematicTree;
    use cspace_core::ErrorKind;

    fn planar() -> Arc<dyn ConfigurationModel> {
        Arc::new(KinematicTree::free_point(&[(-2.0, 2.0), (-2.0, 2.0)], 0.1).unwrap())
    }

    #[test]
    fn test_default_problem_is_active() {
        let registry = ProblemRegistry::new(planar(), PlannerConfig::default()).unwrap();
        assert_eq!(registry.active_name(), DEFAULT_PROBLEM);
        assert_eq!(registry.problem_names(), vec![DEFAULT_PROBLEM]);
        assert_eq!(registry.active().lock().name(), DEFAULT_PROBLEM);
    }

    #[test]
    fn test_select_creates_once() {
        let mut registry = ProblemRegistry::new(planar(), PlannerConfig::default()).unwrap();
        assert!(registry.select_problem("other").unwrap());
        assert!(!registry.select_problem("other").unwrap());
        assert_eq!(registry.active_name(), "other");
        assert_eq!(registry.problem_names(), vec!["default", "other"]);
    }

    #[test]
    fn test_remove_active_rejected() {
        let mut registry = ProblemRegistry::new(planar(), PlannerConfig::default()).unwrap();
        registry.select_problem("other").unwrap();
        let err = registry.remove_problem("other").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);

        registry.remove_problem("default").unwrap();
        assert_eq!(
            registry.remove_problem("default").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_interrupt_handle_shares_flag() {
        let registry = ProblemRegistry::new(planar(), PlannerConfig::default()).unwrap();
        let handle = registry.interrupt_handle(DEFAULT_PROBLEM).unwrap();
        let problem = registry.active();
        let guard = problem.lock();
        handle.raise();
        assert!(guard.interrupt_flag().is_raised());
    }

    #[test]
    fn test_available_and_selected() {
        let mut registry = ProblemRegistry::new(planar(), PlannerConfig::default()).unwrap();
        assert_eq!(
            registry.get_available(Category::Planner),
            vec!["DiffusingPlanner", "PrmPlanner"]
        );
        registry.select_problem("second").unwrap();
        assert_eq!(registry.get_available(Category::Problem), vec!["default", "second"]);
        assert_eq!(registry.get_selected(Category::Problem), vec!["second"]);
        assert_eq!(registry.get_selected(Category::Distance), vec!["WeighedDistance"]);
        assert!(registry.get_selected(Category::PathOptimizer).is_empty());
    }
}
