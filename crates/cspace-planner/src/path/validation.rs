//! Path validation
//!
//! A path validator checks configurations along a path and returns the
//! longest valid prefix together with the first failure.

use std::fmt::{self, Debug};

use cspace_core::validation::{ConfigurationValidator, ValidationFailure};
use log::trace;

use super::Path;
use crate::error::PlannerError;

/// First invalid configuration found along a path
#[derive(Debug, Clone, PartialEq)]
pub struct PathValidationReport {
    /// Path parameter of the invalid configuration
    pub parameter: f64,
    pub failure: ValidationFailure,
}

impl fmt::Display for PathValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid at parameter {:.4}: {}", self.parameter, self.failure)
    }
}

/// Outcome of a path validation
#[derive(Debug, Clone)]
pub struct PathValidation {
    /// Whole path is valid
    pub valid: bool,
    /// Longest valid prefix (the whole path when valid)
    pub valid_part: Path,
    pub report: Option<PathValidationReport>,
}

pub trait PathValidator: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn validate(&self, path: &Path) -> Result<PathValidation, PlannerError>;
}

fn check_step(step: f64) -> Result<(), PlannerError> {
    if !(step > 0.0) {
        return Err(PlannerError::InvalidParameter {
            key: "validation/discretization_step".to_string(),
            reason: format!("{} is not positive", step),
        });
    }
    Ok(())
}

/// Scan `path` from the start with the given step, stopping at the first
/// invalid sample
fn scan(
    validator: &ConfigurationValidator,
    path: &Path,
    step: f64,
    until: f64,
) -> Result<PathValidation, PlannerError> {
    let mut last_valid: Option<f64> = None;
    for (t, q) in path.sample(step)? {
        if t > until {
            break;
        }
        let report = validator.validate(&q)?;
        if let Some(failure) = report.failures.into_iter().next() {
            trace!("[PathValidation] invalid at parameter {:.4}", t);
            let valid_part = path.extract(0.0, last_valid.unwrap_or(0.0))?;
            return Ok(PathValidation {
                valid: false,
                valid_part,
                report: Some(PathValidationReport {
                    parameter: t,
                    failure,
                }),
            });
        }
        last_valid = Some(t);
    }
    Ok(PathValidation {
        valid: true,
        valid_part: path.clone(),
        report: None,
    })
}

/// Checks samples every `step` from start to end
#[derive(Debug, Clone)]
pub struct DiscretizedValidator {
    validator: ConfigurationValidator,
    step: f64,
}

impl DiscretizedValidator {
    pub fn new(validator: ConfigurationValidator, step: f64) -> Self {
        Self { validator, step }
    }
}

impl PathValidator for DiscretizedValidator {
    fn name(&self) -> &'static str {
        "Discretized"
    }

    fn validate(&self, path: &Path) -> Result<PathValidation, PlannerError> {
        check_step(self.step)?;
        scan(&self.validator, path, self.step, f64::INFINITY)
    }
}

/// Checks the endpoints, then midpoints of ever finer intervals
///
/// Finds collisions in the middle of long paths early. Once a failure is
/// found, the valid prefix is established by a forward scan up to it.
#[derive(Debug, Clone)]
pub struct DichotomyValidator {
    validator: ConfigurationValidator,
    step: f64,
}

impl DichotomyValidator {
    pub fn new(validator: ConfigurationValidator, step: f64) -> Self {
        Self { validator, step }
    }

    /// Parameter of some invalid configuration, if any
    fn find_failure(&self, path: &Path) -> Result<Option<f64>, PlannerError> {
        let length = path.length();
        for t in [0.0, length] {
            if !self.validator.is_valid(&path.config_at(t)?)? {
                return Ok(Some(t));
            }
        }
        let mut intervals = vec![(0.0, length)];
        let mut width = length;
        while width > self.step {
            let mut finer = Vec::with_capacity(intervals.len() * 2);
            for (a, b) in intervals {
                let mid = 0.5 * (a + b);
                if !self.validator.is_valid(&path.config_at(mid)?)? {
                    return Ok(Some(mid));
                }
                finer.push((a, mid));
                finer.push((mid, b));
            }
            intervals = finer;
            width *= 0.5;
        }
        Ok(None)
    }
}

impl PathValidator for DichotomyValidator {
    fn name(&self) -> &'static str {
        "Dichotomy"
    }

    fn validate(&self, path: &Path) -> Result<PathValidation, PlannerError> {
        check_step(self.step)?;
        match self.find_failure(path)? {
            None => Ok(PathValidation {
                valid: true,
                valid_part: path.clone(),
                report: None,
            }),
            Some(failure) => {
                let result = scan(&self.validator, path, self.step, failure)?;
                if !result.valid {
                    return Ok(result);
                }
                // The scan grid missed the failing parameter
                let last_checked = ((failure / self.step).floor() * self.step).min(failure);
                let valid_part = path.extract(0.0, last_checked)?;
                let failure_report = self.validator.validate(&path.config_at(failure)?)?;
                Ok(PathValidation {
                    valid: false,
                    valid_part,
                    report: failure_report.failures.into_iter().next().map(|f| {
                        PathValidationReport {
                            parameter: failure,
                            failure: f,
                        }
                    }),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::WeighedDistance;
    use approx::assert_relative_eq;
    use cspace_core::model::{ConfigurationModel, KinematicTree, Obstacle};
    use nalgebra::{DVector, Point3, Vector3};
    use std::sync::Arc;

    /// Point robot with a thin wall at x = 1
    fn walled() -> (Arc<dyn ConfigurationModel>, ConfigurationValidator) {
        let mut tree = KinematicTree::free_point(&[(-3.0, 3.0), (-3.0, 3.0)], 0.05).unwrap();
        tree.add_obstacle(Obstacle::cuboid(
            "wall",
            Point3::new(1.0, 0.0, 0.0),
            Vector3::new(0.05, 1.0, 1.0),
        ));
        let model: Arc<dyn ConfigurationModel> = Arc::new(tree);
        let validator = ConfigurationValidator::new(model.clone(), 0.0);
        (model, validator)
    }

    fn crossing(model: &Arc<dyn ConfigurationModel>) -> Path {
        let distance = WeighedDistance::new(model.clone());
        Path::straight(
            model.clone(),
            &distance,
            DVector::from_vec(vec![0.0, 0.0]),
            DVector::from_vec(vec![2.0, 0.0]),
        )
        .unwrap()
    }

    #[test]
    fn test_discretized_valid_prefix() {
        let (model, validator) = walled();
        let path_validator = DiscretizedValidator::new(validator, 0.05);
        let result = path_validator.validate(&crossing(&model)).unwrap();
        assert!(!result.valid);
        // Body radius 0.05 touches the wall face at x = 0.9
        assert!(result.valid_part.length() < 0.9 + 1e-9);
        assert!(result.valid_part.length() > 0.8);
        let report = result.report.unwrap();
        assert!(matches!(report.failure, ValidationFailure::Collision(_)));
    }

    #[test]
    fn test_dichotomy_agrees_with_discretized() {
        let (model, validator) = walled();
        let path = crossing(&model);
        let discretized = DiscretizedValidator::new(validator.clone(), 0.05)
            .validate(&path)
            .unwrap();
        let dichotomy = DichotomyValidator::new(validator, 0.05).validate(&path).unwrap();
        assert!(!dichotomy.valid);
        assert_relative_eq!(
            dichotomy.valid_part.length(),
            discretized.valid_part.length(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_non_positive_step_rejected() {
        let (model, validator) = walled();
        let path = crossing(&model);
        for step in [0.0, -1.0, f64::NAN] {
            for path_validator in [
                Box::new(DiscretizedValidator::new(validator.clone(), step)) as Box<dyn PathValidator>,
                Box::new(DichotomyValidator::new(validator.clone(), step)),
            ] {
                let err = path_validator.validate(&path).unwrap_err();
                assert!(matches!(err, PlannerError::InvalidParameter { .. }), "{}", path_validator.name());
            }
        }
    }

    #[test]
    fn test_free_path_is_valid() {
        let (model, validator) = walled();
        let distance = WeighedDistance::new(model.clone());
        let path = Path::straight(
            model,
            &distance,
            DVector::from_vec(vec![0.0, 2.0]),
            DVector::from_vec(vec![2.0, 2.0]),
        )
        .unwrap();
        for path_validator in [
            Box::new(DiscretizedValidator::new(validator.clone(), 0.05)) as Box<dyn PathValidator>,
            Box::new(DichotomyValidator::new(validator.clone(), 0.05)),
        ] {
            let result = path_validator.validate(&path).unwrap();
            assert!(result.valid, "{}", path_validator.name());
            assert_relative_eq!(result.valid_part.length(), 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_invalid_start_gives_empty_prefix() {
        let (model, validator) = walled();
        let distance = WeighedDistance::new(model.clone());
        let path = Path::straight(
            model,
            &distance,
            DVector::from_vec(vec![1.0, 0.0]),
            DVector::from_vec(vec![2.0, 0.0]),
        )
        .unwrap();
        let result = DiscretizedValidator::new(validator, 0.05).validate(&path).unwrap();
        assert!(!result.valid);
        assert_eq!(result.valid_part.length(), 0.0);
    }
}
