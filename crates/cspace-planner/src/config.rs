//! Planner configuration
//!
//! Configuration parameters for roadmap growth, validation and path
//! optimization. Loadable from YAML; every field falls back to its default
//! when omitted.

use std::path::Path as FsPath;

use cspace_core::constraints::ProjectionConfig;
use serde::{Deserialize, Serialize};

use crate::error::PlannerError;

/// Main planner configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Constraint projection solver
    pub projection: ProjectionConfig,
    /// Roadmap growth
    pub roadmap: RoadmapConfig,
    /// Solve loop
    pub planning: PlanningConfig,
    /// Configuration and path validation
    pub validation: ValidationConfig,
    /// Path optimization and projection
    pub optimization: OptimizationConfig,
    /// Strategies selected when a problem is created
    pub strategies: StrategyConfig,
}

impl PlannerConfig {
    /// Parse a YAML document; values are range checked
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PlannerError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn from_file<P: AsRef<FsPath>>(path: P) -> Result<Self, PlannerError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml_string(&self) -> Result<String, PlannerError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Roadmap growth configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadmapConfig {
    /// Nodes per component tried when connecting a new node (PRM)
    pub nearest_neighbours: usize,
    /// Maximum length of one diffusion extension (0 = up to the sample)
    pub extension_length: f64,
}

impl Default for RoadmapConfig {
    fn default() -> Self {
        Self {
            nearest_neighbours: 8,
            extension_length: 0.0,
        }
    }
}

/// Solve loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    /// Growth iterations before `solve` gives up
    pub max_iterations: usize,
    /// Probability of extending toward a goal instead of a random sample
    pub goal_bias: f64,
    /// Only extend the component of the initial configuration
    pub restrict_to_init_component: bool,
    /// Attempts at generating a goal configuration from goal constraints
    pub goal_generation_attempts: usize,
    /// Seed of the problem's random generator
    pub seed: u64,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            goal_bias: 0.05,
            restrict_to_init_component: false,
            goal_generation_attempts: 100,
            seed: 0,
        }
    }
}

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Parameter step between checked configurations along a path
    pub discretization_step: f64,
    /// Tolerated penetration depth
    pub penetration: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            discretization_step: 0.05,
            penetration: 0.0,
        }
    }
}

/// Path optimization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    /// Shortcut attempts of the random shortcut optimizer
    pub shortcut_iterations: usize,
    /// Sampling step of the progressive projector
    pub projector_step: f64,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            shortcut_iterations: 50,
            projector_step: 0.1,
        }
    }
}

/// Strategy names (see [`crate::strategy`] for the accepted values)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub planner: String,
    pub distance: String,
    pub steering_method: String,
    pub path_validator: String,
    pub path_projector: String,
    pub path_optimizers: Vec<String>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            planner: "DiffusingPlanner".to_string(),
            distance: "WeighedDistance".to_string(),
            steering_method: "Straight".to_string(),
            path_validator: "Discretized".to_string(),
            path_projector: "None".to_string(),
            path_optimizers: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
planning:
  max_iterations: 500
  seed: 42
validation:
  penetration: 0.01
strategies:
  planner: PrmPlanner
  path_optimizers: [RandomShortcut]
"#;
        let config = PlannerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.planning.max_iterations, 500);
        assert_eq!(config.planning.seed, 42);
        assert_eq!(config.planning.goal_generation_attempts, 100);
        assert_eq!(config.validation.penetration, 0.01);
        assert_eq!(config.validation.discretization_step, 0.05);
        assert_eq!(config.strategies.planner, "PrmPlanner");
        assert_eq!(config.strategies.distance, "WeighedDistance");
        assert_eq!(config.strategies.path_optimizers, vec!["RandomShortcut"]);
        assert_eq!(config.projection.max_iterations, 40);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = PlannerConfig::default();
        let yaml = config.to_yaml_string().unwrap();
        let parsed = PlannerConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.roadmap.nearest_neighbours, config.roadmap.nearest_neighbours);
        assert_eq!(parsed.strategies.path_projector, "None");
    }

    #[test]
    fn test_out_of_range_yaml_rejected() {
        let yaml = r#"
validation:
  discretization_step: -1.0
strategies:
  path_validator: Dichotomy
"#;
        let err = PlannerConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, PlannerError::InvalidParameter { .. }));
    }

    #[test]
    fn test_malformed_yaml() {
        let err = PlannerConfig::from_yaml_str("planning: [1, 2").unwrap_err();
        assert!(matches!(err, PlannerError::Serialization(_)));
    }
}
