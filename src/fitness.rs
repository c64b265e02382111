//! Scalar misfit between a measured and a simulated curve.

use crate::error::{XrrError, XrrResult};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Intensities are floored here before taking logarithms (-200 dB).
pub const LOG_FLOOR: f64 = 1e-20;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NormKind {
    Chi2,
    Log,
    Sqrt,
    RelChi2,
}

/// Misfit strategy, chosen once per fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitnessNorm {
    /// Mean of squared residuals over a Poisson variance estimate.
    Chi2,
    /// Power mean of `|ln m - ln s|`.
    Log { p: f64 },
    /// Power mean of `|sqrt m - sqrt s|`.
    Sqrt { p: f64 },
    /// Power mean of `|T(m) - T(s)|` with `T` switching from sqrt to log at
    /// `threshold` (linear intensity).
    RelChi2 { threshold: f64, p: f64 },
}

impl FitnessNorm {
    /// Builds a norm from its kind, exponent and a threshold in dB.
    pub fn from_settings(kind: NormKind, p: f64, threshold_db: f64) -> XrrResult<Self> {
        if !(p > 0.0 && p.is_finite()) {
            return Err(XrrError::Config(format!(
                "Norm exponent must be positive, got {}",
                p
            )));
        }
        Ok(match kind {
            NormKind::Chi2 => FitnessNorm::Chi2,
            NormKind::Log => FitnessNorm::Log { p },
            NormKind::Sqrt => FitnessNorm::Sqrt { p },
            NormKind::RelChi2 => {
                let threshold = 10f64.powf(threshold_db / 10.0);
                if !(threshold > 0.0 && threshold.is_finite()) {
                    return Err(XrrError::Config(format!(
                        "Threshold {} dB is not a usable intensity",
                        threshold_db
                    )));
                }
                FitnessNorm::RelChi2 { threshold, p }
            }
        })
    }

    pub fn kind(&self) -> NormKind {
        match self {
            FitnessNorm::Chi2 => NormKind::Chi2,
            FitnessNorm::Log { .. } => NormKind::Log,
            FitnessNorm::Sqrt { .. } => NormKind::Sqrt,
            FitnessNorm::RelChi2 { .. } => NormKind::RelChi2,
        }
    }

    /// Misfit of `simulated` against `measured`. Zero for identical curves,
    /// NaN if either curve holds a non-finite value.
    ///
    /// # Panics
    ///
    /// If the curves are empty or differ in length.
    pub fn error(&self, measured: &[f64], simulated: &[f64]) -> f64 {
        assert_eq!(
            measured.len(),
            simulated.len(),
            "measured and simulated curves differ in length"
        );
        assert!(!measured.is_empty(), "cannot compare empty curves");

        if measured
            .iter()
            .chain(simulated)
            .any(|v| !v.is_finite())
        {
            return f64::NAN;
        }

        match *self {
            FitnessNorm::Chi2 => chi2(measured, simulated),
            FitnessNorm::Log { p } => transformed_power_mean(measured, simulated, p, log_transform),
            FitnessNorm::Sqrt { p } => {
                transformed_power_mean(measured, simulated, p, sqrt_transform)
            }
            FitnessNorm::RelChi2 { threshold, p } => {
                let t = RelChi2Transform::new(threshold);
                transformed_power_mean(measured, simulated, p, |x| t.apply(x))
            }
        }
    }
}

fn log_transform(x: f64) -> f64 {
    x.max(LOG_FLOOR).ln()
}

fn sqrt_transform(x: f64) -> f64 {
    x.max(0.0).sqrt()
}

fn chi2(measured: &[f64], simulated: &[f64]) -> f64 {
    let floor = measured
        .iter()
        .copied()
        .filter(|&m| m > 0.0)
        .fold(f64::INFINITY, f64::min);
    let floor = if floor.is_finite() { floor } else { 1.0 };

    let sum: f64 = measured
        .iter()
        .zip(simulated)
        .map(|(&m, &s)| {
            let d = m - s;
            d * d / m.max(floor)
        })
        .sum();
    sum / measured.len() as f64
}

fn transformed_power_mean<T: Fn(f64) -> f64>(
    measured: &[f64],
    simulated: &[f64],
    p: f64,
    transform: T,
) -> f64 {
    power_mean(
        measured
            .iter()
            .zip(simulated)
            .map(|(&m, &s)| (transform(m) - transform(s)).abs()),
        p,
    )
}

/// `(mean |x|^p)^(1/p)` with exact forms for p = 1 and p = 2.
pub fn power_mean<I: ExactSizeIterator<Item = f64>>(values: I, p: f64) -> f64 {
    let count = values.len() as f64;
    if p == 1.0 {
        return values.sum::<f64>() / count;
    }
    if p == 2.0 {
        let sum: f64 = values.map(|v| v * v).sum();
        return sum.sqrt() / count.sqrt();
    }
    let sum: f64 = values.map(|v| v.powf(p)).sum();
    if sum == 0.0 {
        return 0.0;
    }
    (sum.ln() / p).exp() / (count.ln() / p).exp()
}

/// `sqrt(x)` below `threshold`, a matching `A ln x + B` above it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelChi2Transform {
    threshold: f64,
    a: f64,
    b: f64,
}

impl RelChi2Transform {
    pub fn new(threshold: f64) -> Self {
        let root = threshold.sqrt();
        let a = root / 2.0;
        Self {
            threshold,
            a,
            b: root - a * threshold.ln(),
        }
    }

    pub fn apply(&self, x: f64) -> f64 {
        if x <= self.threshold {
            x.max(0.0).sqrt()
        } else {
            self.a * x.ln() + self.b
        }
    }
}
