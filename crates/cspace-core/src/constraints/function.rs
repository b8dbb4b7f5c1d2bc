//! Differentiable functions of a configuration
//!
//! A numerical constraint is `f(q) = rhs`. The functions below provide the
//! value `f(q)` and its Jacobian with respect to the velocity space.

use std::fmt::Debug;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use crate::error::{check_dimension, CoreError};
use crate::model::ConfigurationModel;
use crate::Configuration;

/// Vector-valued differentiable function of a configuration
pub trait DifferentiableFunction: Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Size of the value vector
    fn output_size(&self) -> usize;

    /// Value f(q)
    fn value(&self, q: &Configuration) -> Result<DVector<f64>, CoreError>;

    /// Jacobian ∂f/∂q (output_size × nv)
    fn jacobian(&self, q: &Configuration) -> Result<DMatrix<f64>, CoreError>;
}

/// Which components of a 3-vector are constrained
pub type Mask = [bool; 3];

fn selected_rows(mask: &Mask, offset: usize) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter(|(_, m)| **m)
        .map(|(i, _)| offset + i)
        .collect()
}

/// World position of a frame, restricted by a mask
#[derive(Debug, Clone)]
pub struct FramePosition {
    name: String,
    model: Arc<dyn ConfigurationModel>,
    frame: String,
    mask: Mask,
}

impl FramePosition {
    pub fn new(
        name: &str,
        model: Arc<dyn ConfigurationModel>,
        frame: &str,
        mask: Mask,
    ) -> Result<Self, CoreError> {
        if !mask.iter().any(|m| *m) {
            return Err(CoreError::InvalidParameter(format!(
                "position constraint {} has an empty mask",
                name
            )));
        }
        // Fail early on unknown frames
        model.frame_placement(&DVector::zeros(model.config_size()), frame)?;
        Ok(Self {
            name: name.to_string(),
            model,
            frame: frame.to_string(),
            mask,
        })
    }
}

impl DifferentiableFunction for FramePosition {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_size(&self) -> usize {
        self.mask.iter().filter(|m| **m).count()
    }

    fn value(&self, q: &Configuration) -> Result<DVector<f64>, CoreError> {
        let placement = self.model.frame_placement(q, &self.frame)?;
        let rows = selected_rows(&self.mask, 0);
        Ok(DVector::from_iterator(
            rows.len(),
            rows.iter().map(|&r| placement.translation.vector[r]),
        ))
    }

    fn jacobian(&self, q: &Configuration) -> Result<DMatrix<f64>, CoreError> {
        let full = self.model.frame_jacobian(q, &self.frame)?;
        Ok(full.select_rows(selected_rows(&self.mask, 0).iter()))
    }
}

/// Orientation of a frame as a rotation vector (log map), restricted by a mask
#[derive(Debug, Clone)]
pub struct FrameOrientation {
    name: String,
    model: Arc<dyn ConfigurationModel>,
    frame: String,
    mask: Mask,
}

impl FrameOrientation {
    pub fn new(
        name: &str,
        model: Arc<dyn ConfigurationModel>,
        frame: &str,
        mask: Mask,
    ) -> Result<Self, CoreError> {
        if !mask.iter().any(|m| *m) {
            return Err(CoreError::InvalidParameter(format!(
                "orientation constraint {} has an empty mask",
                name
            )));
        }
        model.frame_placement(&DVector::zeros(model.config_size()), frame)?;
        Ok(Self {
            name: name.to_string(),
            model,
            frame: frame.to_string(),
            mask,
        })
    }
}

impl DifferentiableFunction for FrameOrientation {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_size(&self) -> usize {
        self.mask.iter().filter(|m| **m).count()
    }

    fn value(&self, q: &Configuration) -> Result<DVector<f64>, CoreError> {
        let placement = self.model.frame_placement(q, &self.frame)?;
        let log = placement.rotation.scaled_axis();
        let rows = selected_rows(&self.mask, 0);
        Ok(DVector::from_iterator(rows.len(), rows.iter().map(|&r| log[r])))
    }

    fn jacobian(&self, q: &Configuration) -> Result<DMatrix<f64>, CoreError> {
        // Angular rows; exact for rotations about a fixed axis
        let full = self.model.frame_jacobian(q, &self.frame)?;
        Ok(full.select_rows(selected_rows(&self.mask, 3).iter()))
    }
}

/// f(q) = A·q + b
#[derive(Debug, Clone)]
pub struct AffineFunction {
    name: String,
    matrix: DMatrix<f64>,
    offset: DVector<f64>,
}

impl AffineFunction {
    pub fn new(
        name: &str,
        model: &dyn ConfigurationModel,
        matrix: DMatrix<f64>,
        offset: DVector<f64>,
    ) -> Result<Self, CoreError> {
        if model.config_size() != model.velocity_size() {
            return Err(CoreError::InvalidParameter(format!(
                "affine constraint {} requires equal configuration and velocity sizes",
                name
            )));
        }
        check_dimension("affine matrix column", model.config_size(), matrix.ncols())?;
        check_dimension("affine offset", matrix.nrows(), offset.len())?;
        Ok(Self {
            name: name.to_string(),
            matrix,
            offset,
        })
    }

    /// Constraint selecting the value of the joints at the given configuration indices
    pub fn selection(
        name: &str,
        model: &dyn ConfigurationModel,
        indices: &[usize],
    ) -> Result<Self, CoreError> {
        let n = model.config_size();
        let mut matrix = DMatrix::zeros(indices.len(), n);
        for (row, &index) in indices.iter().enumerate() {
            if index >= n {
                return Err(CoreError::InvalidParameter(format!(
                    "index {} out of range for configuration size {}",
                    index, n
                )));
            }
            matrix[(row, index)] = 1.0;
        }
        Self::new(name, model, matrix, DVector::zeros(indices.len()))
    }
}

impl DifferentiableFunction for AffineFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_size(&self) -> usize {
        self.matrix.nrows()
    }

    fn value(&self, q: &Configuration) -> Result<DVector<f64>, CoreError> {
        check_dimension("configuration", self.matrix.ncols(), q.len())?;
        Ok(&self.matrix * q + &self.offset)
    }

    fn jacobian(&self, q: &Configuration) -> Result<DMatrix<f64>, CoreError> {
        check_dimension("configuration", self.matrix.ncols(), q.len())?;
        Ok(self.matrix.clone())
    }
}
