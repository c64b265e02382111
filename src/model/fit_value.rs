use crate::error::{XrrError, XrrResult};
use serde::{Deserialize, Serialize};

/// One fittable scalar with its search range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitValue {
    pub min: f64,
    pub expected: f64,
    pub max: f64,
    #[serde(default)]
    pub enabled: bool,
}

/// `(lo, hi, initial)` for one dimension of the search space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub lo: f64,
    pub hi: f64,
    pub initial: f64,
}

impl Bound {
    pub fn fixed(value: f64) -> Self {
        Self {
            lo: value,
            hi: value,
            initial: value,
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.lo == self.hi
    }

    pub fn validate(&self) -> XrrResult<()> {
        let finite = self.lo.is_finite() && self.hi.is_finite() && self.initial.is_finite();
        if !finite || self.lo > self.initial || self.initial > self.hi {
            return Err(XrrError::Config(format!(
                "Invalid bound: lo={} initial={} hi={}",
                self.lo, self.initial, self.hi
            )));
        }
        Ok(())
    }
}

impl FitValue {
    pub fn new(min: f64, expected: f64, max: f64, enabled: bool) -> XrrResult<Self> {
        let value = Self {
            min,
            expected,
            max,
            enabled,
        };
        value.validate()?;
        Ok(value)
    }

    /// Value that never takes part in a fit.
    pub fn fixed(value: f64) -> Self {
        Self {
            min: value,
            expected: value,
            max: value,
            enabled: false,
        }
    }

    pub fn validate(&self) -> XrrResult<()> {
        if !(self.min <= self.expected && self.expected <= self.max) {
            return Err(XrrError::Config(format!(
                "Fit value {} outside range [{}, {}]",
                self.expected, self.min, self.max
            )));
        }
        Ok(())
    }

    /// Search range as seen by the optimizer; disabled values collapse to a point.
    pub fn bound(&self) -> Bound {
        if self.enabled {
            Bound {
                lo: self.min,
                hi: self.max,
                initial: self.expected,
            }
        } else {
            Bound::fixed(self.expected)
        }
    }

    pub fn set_expected(&mut self, value: f64) {
        self.expected = value.clamp(self.min, self.max);
    }
}
