//! Piecewise-geodesic paths
//!
//! A path is a sequence of waypoints joined by geodesic segments of the
//! configuration model. The parameter runs over `[0, length]`; each segment
//! spans its length under the metric that built it.

use std::fmt;
use std::sync::Arc;

use cspace_core::error::{check_dimension, CoreError};
use cspace_core::model::ConfigurationModel;
use cspace_core::{Configuration, Velocity};
use nalgebra::DVector;

use crate::distance::Distance;
use crate::error::PlannerError;

/// Parameter tolerance at path ends
const PARAMETER_EPSILON: f64 = 1e-9;

/// Maximum gap between the end of a path and the start of its continuation
pub const CONTINUITY_TOLERANCE: f64 = 1e-6;

#[derive(Clone)]
pub struct Path {
    model: Arc<dyn ConfigurationModel>,
    waypoints: Vec<Configuration>,
    /// Length of segment i (waypoint i to i + 1)
    lengths: Vec<f64>,
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Path")
            .field("waypoints", &self.waypoints.len())
            .field("length", &self.length())
            .finish()
    }
}

impl Path {
    /// Path through the waypoints, segment lengths measured with `distance`
    pub fn new(
        model: Arc<dyn ConfigurationModel>,
        distance: &dyn Distance,
        waypoints: Vec<Configuration>,
    ) -> Result<Self, PlannerError> {
        let lengths = waypoints
            .windows(2)
            .map(|w| distance.distance(&w[0], &w[1]))
            .collect();
        Self::from_parts(model, waypoints, lengths)
    }

    /// Single segment q0 → q1
    pub fn straight(
        model: Arc<dyn ConfigurationModel>,
        distance: &dyn Distance,
        q0: Configuration,
        q1: Configuration,
    ) -> Result<Self, PlannerError> {
        Self::new(model, distance, vec![q0, q1])
    }

    /// Path from waypoints and precomputed segment lengths
    pub fn from_parts(
        model: Arc<dyn ConfigurationModel>,
        waypoints: Vec<Configuration>,
        lengths: Vec<f64>,
    ) -> Result<Self, PlannerError> {
        if waypoints.is_empty() {
            return Err(PlannerError::InvalidArgument(
                "a path needs at least one waypoint".to_string(),
            ));
        }
        check_dimension("segment lengths", waypoints.len() - 1, lengths.len())?;
        for q in &waypoints {
            check_dimension("configuration", model.config_size(), q.len())?;
        }
        if lengths.iter().any(|l| !(*l >= 0.0)) {
            return Err(PlannerError::InvalidArgument(
                "segment lengths must be non-negative".to_string(),
            ));
        }
        Ok(Self {
            model,
            waypoints,
            lengths,
        })
    }

    pub fn model(&self) -> &Arc<dyn ConfigurationModel> {
        &self.model
    }

    pub fn waypoints(&self) -> &[Configuration] {
        &self.waypoints
    }

    pub fn segment_lengths(&self) -> &[f64] {
        &self.lengths
    }

    pub fn length(&self) -> f64 {
        self.lengths.iter().sum()
    }

    pub fn initial(&self) -> &Configuration {
        &self.waypoints[0]
    }

    pub fn end(&self) -> &Configuration {
        &self.waypoints[self.waypoints.len() - 1]
    }

    /// Parameter of every waypoint
    pub fn waypoint_parameters(&self) -> Vec<f64> {
        let mut params = Vec::with_capacity(self.waypoints.len());
        let mut s = 0.0;
        params.push(s);
        for l in &self.lengths {
            s += l;
            params.push(s);
        }
        params
    }

    fn check_parameter(&self, t: f64) -> Result<f64, PlannerError> {
        let length = self.length();
        if !(t >= -PARAMETER_EPSILON && t <= length + PARAMETER_EPSILON) {
            return Err(CoreError::InvalidParameter(format!(
                "path parameter {} outside [0, {}]",
                t, length
            ))
            .into());
        }
        Ok(t.clamp(0.0, length))
    }

    /// Segment index and local fraction of parameter t (already clamped)
    fn locate(&self, t: f64) -> (usize, f64) {
        let mut start = 0.0;
        for (i, l) in self.lengths.iter().enumerate() {
            let last = i + 1 == self.lengths.len();
            if t <= start + l || last {
                let fraction = if *l > 0.0 { ((t - start) / l).clamp(0.0, 1.0) } else { 1.0 };
                return (i, fraction);
            }
            start += l;
        }
        (0, 0.0)
    }

    pub fn config_at(&self, t: f64) -> Result<Configuration, PlannerError> {
        let t = self.check_parameter(t)?;
        if self.lengths.is_empty() {
            return Ok(self.waypoints[0].clone());
        }
        let (i, fraction) = self.locate(t);
        if fraction >= 1.0 {
            return Ok(self.waypoints[i + 1].clone());
        }
        Ok(self
            .model
            .interpolate(&self.waypoints[i], &self.waypoints[i + 1], fraction))
    }

    /// Derivative of the configuration with respect to the parameter
    pub fn velocity_at(&self, t: f64) -> Result<Velocity, PlannerError> {
        let t = self.check_parameter(t)?;
        if self.lengths.is_empty() {
            return Ok(DVector::zeros(self.model.velocity_size()));
        }
        let (i, _) = self.locate(t);
        let l = self.lengths[i];
        if l <= 0.0 {
            return Ok(DVector::zeros(self.model.velocity_size()));
        }
        Ok(self.model.difference(&self.waypoints[i + 1], &self.waypoints[i]) / l)
    }

    /// Sub-path over `[t0, t1]`; reversed when `t0 > t1`
    pub fn extract(&self, t0: f64, t1: f64) -> Result<Path, PlannerError> {
        if t0 > t1 {
            return Ok(self.extract(t1, t0)?.reverse());
        }
        let t0 = self.check_parameter(t0)?;
        let t1 = self.check_parameter(t1)?;

        let params = self.waypoint_parameters();
        let q0 = self.config_at(t0)?;
        let mut waypoints = vec![q0];
        let mut lengths = Vec::new();
        let mut last = t0;
        for (i, &s) in params.iter().enumerate() {
            if s > t0 && s < t1 {
                lengths.push(s - last);
                waypoints.push(self.waypoints[i].clone());
                last = s;
            }
        }
        if t1 > t0 {
            lengths.push(t1 - last);
            waypoints.push(self.config_at(t1)?);
        }
        Self::from_parts(self.model.clone(), waypoints, lengths)
    }

    pub fn reverse(&self) -> Path {
        let mut waypoints = self.waypoints.clone();
        waypoints.reverse();
        let mut lengths = self.lengths.clone();
        lengths.reverse();
        Path {
            model: self.model.clone(),
            waypoints,
            lengths,
        }
    }

    /// Whether `other` starts where this path ends
    pub fn continues_into(&self, other: &Path) -> bool {
        self.end().len() == other.initial().len()
            && self.model.difference(other.initial(), self.end()).norm() <= CONTINUITY_TOLERANCE
    }

    /// Append `other`; returns false (path untouched) when they do not join
    pub fn concat(&mut self, other: &Path) -> bool {
        if !self.continues_into(other) {
            return false;
        }
        self.waypoints.extend(other.waypoints.iter().skip(1).cloned());
        self.lengths.extend_from_slice(&other.lengths);
        true
    }

    /// Configurations every `step` along the path, both ends included
    pub fn sample(&self, step: f64) -> Result<Vec<(f64, Configuration)>, PlannerError> {
        if !(step > 0.0) {
            return Err(PlannerError::InvalidArgument(format!(
                "sampling step must be positive, got {}",
                step
            )));
        }
        let length = self.length();
        let count = (length / step).ceil() as usize;
        let mut samples = Vec::with_capacity(count + 1);
        for k in 0..count {
            let t = k as f64 * step;
            samples.push((t, self.config_at(t)?));
        }
        samples.push((length, self.end().clone()));
        Ok(samples)
    }

    /// Waypoints as plain vectors
    pub fn waypoint_rows(&self) -> Vec<Vec<f64>> {
        self.waypoints.iter().map(|q| q.iter().copied().collect()).collect()
    }
}
