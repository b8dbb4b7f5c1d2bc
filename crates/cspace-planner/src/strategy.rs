//! Strategy catalog
//!
//! One enum per strategy category lists the available implementations by
//! name and builds them.

use std::sync::Arc;

use cspace_core::constraints::ConstraintSystem;
use cspace_core::model::ConfigurationModel;
use cspace_core::validation::ConfigurationValidator;

use crate::config::OptimizationConfig;
use crate::distance::{Distance, NormalizedDistance, WeighedDistance};
use crate::error::PlannerError;
use crate::path::{
    DichotomyValidator, DiscretizedValidator, PathOptimizer, PathProjector, PathValidator,
    ProgressiveProjector, RandomShortcut, SimpleShortcut,
};
use crate::planner::{DiffusingPlanner, PathPlanner, PrmPlanner};
use crate::steering::{SteeringMethod, StraightSteering};

macro_rules! strategy_kind {
    ($(#[$meta:meta])* $kind:ident, $category:literal { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $kind {
            $($variant),+
        }

        impl $kind {
            pub const ALL: &'static [$kind] = &[$($kind::$variant),+];

            pub fn name(&self) -> &'static str {
                match self {
                    $($kind::$variant => $label),+
                }
            }

            pub fn from_name(name: &str) -> Result<Self, PlannerError> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|k| k.name() == name)
                    .ok_or_else(|| PlannerError::UnknownStrategy {
                        category: $category,
                        name: name.to_string(),
                    })
            }

            pub fn names() -> Vec<String> {
                Self::ALL.iter().map(|k| k.name().to_string()).collect()
            }
        }
    };
}

strategy_kind!(
    /// Roadmap growth strategies
    PlannerKind, "planner" {
        Diffusing => "DiffusingPlanner",
        Prm => "PrmPlanner",
    }
);

strategy_kind!(
    DistanceKind, "distance" {
        Weighed => "WeighedDistance",
        Normalized => "NormalizedDistance",
    }
);

strategy_kind!(
    SteeringKind, "steering method" {
        Straight => "Straight",
    }
);

strategy_kind!(
    PathValidatorKind, "path validator" {
        Discretized => "Discretized",
        Dichotomy => "Dichotomy",
    }
);

strategy_kind!(
    /// `None` disables projection
    ProjectorKind, "path projector" {
        None => "None",
        Progressive => "Progressive",
    }
);

strategy_kind!(
    OptimizerKind, "path optimizer" {
        RandomShortcut => "RandomShortcut",
        SimpleShortcut => "SimpleShortcut",
    }
);

impl PlannerKind {
    pub fn build(&self) -> Box<dyn PathPlanner> {
        match self {
            PlannerKind::Diffusing => Box::new(DiffusingPlanner::new()),
            PlannerKind::Prm => Box::new(PrmPlanner::new()),
        }
    }
}

impl DistanceKind {
    pub fn build(&self, model: Arc<dyn ConfigurationModel>) -> Arc<dyn Distance> {
        match self {
            DistanceKind::Weighed => Arc::new(WeighedDistance::new(model)),
            DistanceKind::Normalized => Arc::new(NormalizedDistance::new(model)),
        }
    }
}

impl SteeringKind {
    pub fn build(
        &self,
        model: Arc<dyn ConfigurationModel>,
        distance: Arc<dyn Distance>,
    ) -> Box<dyn SteeringMethod> {
        match self {
            SteeringKind::Straight => Box::new(StraightSteering::new(model, distance)),
        }
    }
}

impl PathValidatorKind {
    pub fn build(&self, validator: ConfigurationValidator, step: f64) -> Box<dyn PathValidator> {
        match self {
            PathValidatorKind::Discretized => Box::new(DiscretizedValidator::new(validator, step)),
            PathValidatorKind::Dichotomy => Box::new(DichotomyValidator::new(validator, step)),
        }
    }
}

impl ProjectorKind {
    pub fn build(
        &self,
        constraints: &ConstraintSystem,
        distance: Arc<dyn Distance>,
        step: f64,
    ) -> Option<Box<dyn PathProjector>> {
        match self {
            ProjectorKind::None => None,
            ProjectorKind::Progressive => Some(Box::new(ProgressiveProjector::new(
                constraints.clone(),
                distance,
                step,
            ))),
        }
    }
}

impl OptimizerKind {
    pub fn build(&self, config: &OptimizationConfig) -> Box<dyn PathOptimizer> {
        match self {
            OptimizerKind::RandomShortcut => Box::new(RandomShortcut::new(config.shortcut_iterations)),
            OptimizerKind::SimpleShortcut => Box::new(SimpleShortcut),
        }
    }
}

/// Strategy categories exposed by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Planner,
    Distance,
    SteeringMethod,
    PathValidator,
    PathProjector,
    PathOptimizer,
    Problem,
}

impl Category {
    pub const ALL: &'static [Category] = &[
        Category::Planner,
        Category::Distance,
        Category::SteeringMethod,
        Category::PathValidator,
        Category::PathProjector,
        Category::PathOptimizer,
        Category::Problem,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Planner => "Planner",
            Category::Distance => "Distance",
            Category::SteeringMethod => "SteeringMethod",
            Category::PathValidator => "PathValidator",
            Category::PathProjector => "PathProjector",
            Category::PathOptimizer => "PathOptimizer",
            Category::Problem => "Problem",
        }
    }

    /// Case-insensitive lookup
    pub fn from_name(name: &str) -> Result<Self, PlannerError> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| PlannerError::UnknownStrategy {
                category: "category",
                name: name.to_string(),
            })
    }

    /// Implementation names, for every category but `Problem`
    pub fn implementations(&self) -> Option<Vec<String>> {
        match self {
            Category::Planner => Some(PlannerKind::names()),
            Category::Distance => Some(DistanceKind::names()),
            Category::SteeringMethod => Some(SteeringKind::names()),
            Category::PathValidator => Some(PathValidatorKind::names()),
            Category::PathProjector => Some(ProjectorKind::names()),
            Category::PathOptimizer => Some(OptimizerKind::names()),
            Category::Problem => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cspace_core::ErrorKind;

    #[test]
    fn test_names_round_trip() {
        for kind in PlannerKind::ALL {
            assert_eq!(PlannerKind::from_name(kind.name()).unwrap(), *kind);
        }
        for kind in OptimizerKind::ALL {
            assert_eq!(OptimizerKind::from_name(kind.name()).unwrap(), *kind);
        }
    }

    #[test]
    fn test_unknown_name() {
        let err = DistanceKind::from_name("Manhattan").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Unknown distance: Manhattan");
    }

    #[test]
    fn test_category_lookup() {
        assert_eq!(Category::from_name("steeringmethod").unwrap(), Category::SteeringMethod);
        assert!(Category::from_name("Roadmap").is_err());
        assert_eq!(
            Category::PathValidator.implementations().unwrap(),
            vec!["Discretized", "Dichotomy"]
        );
        assert!(Category::Problem.implementations().is_none());
    }
}
