//! Measured (or synthetic) reflectivity curves.

pub mod loader;
pub mod noise;

use crate::error::{XrrError, XrrResult};
use crate::model::LayerStack;
use crate::simulator;

/// dB value used for zero intensity.
pub const DB_FLOOR: f64 = -200.0;

pub fn to_db(x: f64) -> f64 {
    if x == 0.0 {
        DB_FLOOR
    } else {
        10.0 * x.log10()
    }
}

pub fn from_db(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

/// Angles in degrees with linear intensities.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReflectivityCurve {
    pub angles: Vec<f64>,
    pub intensity: Vec<f64>,
}

impl ReflectivityCurve {
    pub fn new(angles: Vec<f64>, intensity: Vec<f64>) -> XrrResult<Self> {
        if angles.len() != intensity.len() {
            return Err(XrrError::Validation(format!(
                "{} angles but {} intensities",
                angles.len(),
                intensity.len()
            )));
        }
        Ok(Self { angles, intensity })
    }

    pub fn from_db(angles: Vec<f64>, db: &[f64]) -> XrrResult<Self> {
        Self::new(angles, db.iter().map(|&v| from_db(v)).collect())
    }

    /// Calibrated simulation of `stack` at `angles` (degrees).
    pub fn simulate(angles: Vec<f64>, stack: &LayerStack) -> Self {
        let intensity = simulator::simulate_degrees(&angles, stack);
        Self { angles, intensity }
    }

    /// `n` evenly spaced angles from `first` to `last` degrees.
    pub fn angle_grid(first: f64, last: f64, n: usize) -> Vec<f64> {
        simulator::profile::linspace(n, first, last)
    }

    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    pub fn angles_rad(&self) -> Vec<f64> {
        self.angles.iter().map(|a| a.to_radians()).collect()
    }

    pub fn to_db(&self) -> Vec<f64> {
        self.intensity.iter().map(|&v| to_db(v)).collect()
    }

    /// Points with `first <= angle <= last`.
    pub fn crop(&self, first: f64, last: f64) -> Self {
        let (angles, intensity) = self
            .angles
            .iter()
            .zip(&self.intensity)
            .filter(|(&a, _)| a >= first && a <= last)
            .map(|(&a, &i)| (a, i))
            .unzip();
        Self { angles, intensity }
    }

    /// Poisson counting noise for a detector where one photon has linear
    /// intensity `photon`.
    pub fn with_noise<R: rand::Rng + ?Sized>(&self, photon: f64, rng: &mut R) -> XrrResult<Self> {
        if !(photon > 0.0 && photon.is_finite()) {
            return Err(XrrError::Config(format!(
                "Photon intensity must be positive, got {}",
                photon
            )));
        }
        let intensity = self
            .intensity
            .iter()
            .map(|&v| noise::poisson(rng, v / photon) as f64 * photon)
            .collect();
        Ok(Self {
            angles: self.angles.clone(),
            intensity,
        })
    }
}
