//! Tagged runtime parameters
//!
//! Parameters address configuration fields as `section/field` and carry an
//! int, float or string value. Booleans are ints (0 or 1).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::PlannerConfig;
use crate::error::PlannerError;

/// Parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ParameterValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Int(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Float(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::Str(v.to_string())
    }
}

impl ParameterValue {
    fn type_name(&self) -> &'static str {
        match self {
            ParameterValue::Int(_) => "int",
            ParameterValue::Float(_) => "float",
            ParameterValue::Str(_) => "string",
        }
    }
}

/// Value type of a parameter key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Count,
    Seed,
    Flag,
    Positive,
    NonNegative,
    Probability,
}

const PARAMETERS: &[(&str, Kind)] = &[
    ("projection/error_threshold", Kind::Positive),
    ("projection/max_iterations", Kind::Count),
    ("projection/damping", Kind::NonNegative),
    ("projection/singular_threshold", Kind::NonNegative),
    ("roadmap/nearest_neighbours", Kind::Count),
    ("roadmap/extension_length", Kind::NonNegative),
    ("planning/max_iterations", Kind::Count),
    ("planning/goal_bias", Kind::Probability),
    ("planning/restrict_to_init_component", Kind::Flag),
    ("planning/goal_generation_attempts", Kind::Count),
    ("planning/seed", Kind::Seed),
    ("validation/discretization_step", Kind::Positive),
    ("validation/penetration", Kind::NonNegative),
    ("optimization/shortcut_iterations", Kind::Count),
    ("optimization/projector_step", Kind::Positive),
];

fn invalid(key: &str, reason: String) -> PlannerError {
    PlannerError::InvalidParameter {
        key: key.to_string(),
        reason,
    }
}

fn check(key: &str, kind: Kind, value: &ParameterValue) -> Result<ParameterValue, PlannerError> {
    match (kind, value) {
        (Kind::Count, ParameterValue::Int(v)) if *v >= 0 => Ok(value.clone()),
        (Kind::Seed, ParameterValue::Int(v)) if *v >= 0 => Ok(value.clone()),
        (Kind::Flag, ParameterValue::Int(v)) if *v == 0 || *v == 1 => Ok(value.clone()),
        (Kind::Count | Kind::Seed | Kind::Flag, ParameterValue::Int(v)) => {
            Err(invalid(key, format!("{} is out of range", v)))
        }
        // Ints are accepted where floats are expected
        (Kind::Positive | Kind::NonNegative | Kind::Probability, ParameterValue::Int(v)) => {
            check(key, kind, &ParameterValue::Float(*v as f64))
        }
        (Kind::Positive, ParameterValue::Float(v)) if *v > 0.0 => Ok(value.clone()),
        (Kind::NonNegative, ParameterValue::Float(v)) if *v >= 0.0 => Ok(value.clone()),
        (Kind::Probability, ParameterValue::Float(v)) if (0.0..=1.0).contains(v) => Ok(value.clone()),
        (Kind::Positive | Kind::NonNegative | Kind::Probability, ParameterValue::Float(v)) => {
            Err(invalid(key, format!("{} is out of range", v)))
        }
        _ => Err(invalid(key, format!("unexpected {} value", value.type_name()))),
    }
}

fn as_usize(value: &ParameterValue) -> usize {
    match value {
        ParameterValue::Int(v) => *v as usize,
        ParameterValue::Float(v) => *v as usize,
        ParameterValue::Str(_) => 0,
    }
}

fn as_f64(value: &ParameterValue) -> f64 {
    match value {
        ParameterValue::Int(v) => *v as f64,
        ParameterValue::Float(v) => *v,
        ParameterValue::Str(_) => 0.0,
    }
}

impl PlannerConfig {
    /// Names of every settable parameter
    pub fn parameter_names() -> Vec<&'static str> {
        PARAMETERS.iter().map(|(name, _)| *name).collect()
    }

    /// Check every parameter against its range
    ///
    /// Applies the same rules as [`Self::set_parameter`] to a configuration
    /// built some other way (YAML, struct literal).
    pub fn validate(&self) -> Result<(), PlannerError> {
        // Any u64 is a valid seed
        for (key, kind) in PARAMETERS.iter().filter(|(_, kind)| *kind != Kind::Seed) {
            check(key, *kind, &self.get_parameter(key)?)?;
        }
        Ok(())
    }

    /// Set a parameter; the configuration is untouched on error
    pub fn set_parameter(&mut self, key: &str, value: &ParameterValue) -> Result<(), PlannerError> {
        let kind = PARAMETERS
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| PlannerError::UnknownParameter(key.to_string()))?;
        let value = check(key, kind, value)?;

        match key {
            "projection/error_threshold" => self.projection.error_threshold = as_f64(&value),
            "projection/max_iterations" => self.projection.max_iterations = as_usize(&value),
            "projection/damping" => self.projection.damping = as_f64(&value),
            "projection/singular_threshold" => self.projection.singular_threshold = as_f64(&value),
            "roadmap/nearest_neighbours" => self.roadmap.nearest_neighbours = as_usize(&value),
            "roadmap/extension_length" => self.roadmap.extension_length = as_f64(&value),
            "planning/max_iterations" => self.planning.max_iterations = as_usize(&value),
            "planning/goal_bias" => self.planning.goal_bias = as_f64(&value),
            "planning/restrict_to_init_component" => {
                self.planning.restrict_to_init_component = as_usize(&value) == 1
            }
            "planning/goal_generation_attempts" => {
                self.planning.goal_generation_attempts = as_usize(&value)
            }
            "planning/seed" => self.planning.seed = as_usize(&value) as u64,
            "validation/discretization_step" => self.validation.discretization_step = as_f64(&value),
            "validation/penetration" => self.validation.penetration = as_f64(&value),
            "optimization/shortcut_iterations" => {
                self.optimization.shortcut_iterations = as_usize(&value)
            }
            "optimization/projector_step" => self.optimization.projector_step = as_f64(&value),
            _ => return Err(PlannerError::UnknownParameter(key.to_string())),
        }
        Ok(())
    }

    pub fn get_parameter(&self, key: &str) -> Result<ParameterValue, PlannerError> {
        let value = match key {
            "projection/error_threshold" => self.projection.error_threshold.into(),
            "projection/max_iterations" => (self.projection.max_iterations as i64).into(),
            "projection/damping" => self.projection.damping.into(),
            "projection/singular_threshold" => self.projection.singular_threshold.into(),
            "roadmap/nearest_neighbours" => (self.roadmap.nearest_neighbours as i64).into(),
            "roadmap/extension_length" => self.roadmap.extension_length.into(),
            "planning/max_iterations" => (self.planning.max_iterations as i64).into(),
            "planning/goal_bias" => self.planning.goal_bias.into(),
            "planning/restrict_to_init_component" => {
                ParameterValue::Int(self.planning.restrict_to_init_component as i64)
            }
            "planning/goal_generation_attempts" => {
                (self.planning.goal_generation_attempts as i64).into()
            }
            "planning/seed" => (self.planning.seed as i64).into(),
            "validation/discretization_step" => self.validation.discretization_step.into(),
            "validation/penetration" => self.validation.penetration.into(),
            "optimization/shortcut_iterations" => {
                (self.optimization.shortcut_iterations as i64).into()
            }
            "optimization/projector_step" => self.optimization.projector_step.into(),
            _ => return Err(PlannerError::UnknownParameter(key.to_string())),
        };
        Ok(value)
    }
}
