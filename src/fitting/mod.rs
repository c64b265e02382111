//! Fitting a layer model to a measured curve.

pub mod runner;

use crate::data::ReflectivityCurve;
use crate::error::{XrrError, XrrResult};
use crate::fitness::FitnessNorm;
use crate::model::{Bound, LayerStack};
use crate::optimizer::Objective;
use crate::simulator;

pub use runner::{
    CancelToken, FitOutcome, FitProgress, FitReport, FittingSession, ProgressCallback,
    Termination,
};

/// The misfit of a stack against one cropped measurement.
///
/// Holds a template stack; every evaluation works on its own copy.
#[derive(Debug, Clone)]
pub struct FitProblem {
    stack: LayerStack,
    angles: Vec<f64>,
    measured: ReflectivityCurve,
    norm: FitnessNorm,
}

impl FitProblem {
    /// Crops `measured` to `[first_angle, last_angle]` degrees.
    ///
    /// Fails with [`XrrError::InsufficientData`] if fewer than two points
    /// remain.
    pub fn new(
        stack: &LayerStack,
        measured: &ReflectivityCurve,
        norm: FitnessNorm,
        first_angle: f64,
        last_angle: f64,
    ) -> XrrResult<Self> {
        stack.validate()?;
        let measured = measured.crop(first_angle, last_angle);
        if measured.len() < 2 {
            return Err(XrrError::InsufficientData {
                points: measured.len(),
            });
        }
        if let Some(i) = measured.intensity.iter().position(|v| !v.is_finite()) {
            return Err(XrrError::Validation(format!(
                "Measured intensity at {} degrees is not finite",
                measured.angles[i]
            )));
        }

        Ok(Self {
            stack: stack.clone(),
            angles: measured.angles_rad(),
            measured,
            norm,
        })
    }

    pub fn bounds(&self) -> Vec<Bound> {
        self.stack.bounds()
    }

    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    pub fn measured(&self) -> &ReflectivityCurve {
        &self.measured
    }

    pub fn norm(&self) -> FitnessNorm {
        self.norm
    }

    /// Calibrated simulation of the template stack with `params` applied.
    pub fn simulate(&self, params: &[f64]) -> Vec<f64> {
        simulator::simulate_calibrated(&self.angles, &self.stack.with_parameters(params))
    }
}

impl Objective for FitProblem {
    fn evaluate(&self, params: &[f64]) -> XrrResult<f64> {
        let simulated = self.simulate(params);
        if let Some(i) = simulated.iter().position(|v| !v.is_finite()) {
            return Err(XrrError::Evaluation(format!(
                "Simulation produced {} at {} degrees for parameters {:?}",
                simulated[i], self.measured.angles[i], params
            )));
        }
        let error = self.norm.error(&self.measured.intensity, &simulated);
        if !error.is_finite() {
            return Err(XrrError::Evaluation(format!(
                "Fitness is {} for parameters {:?}",
                error, params
            )));
        }
        Ok(error)
    }
}
