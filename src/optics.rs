//! Optical constants of layer materials at X-ray wavelengths.
//!
//! The simulator only needs `delta` and `beta` per unit mass density. They
//! follow from the anomalous scattering factors `f1`/`f2` of the elements in
//! a compound, which are supplied through an [`ElementLookup`].

use crate::error::{XrrError, XrrResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// Classical electron radius (m)
pub const R_ELECTRON: f64 = 2.817940325e-15;

/// Avogadro's number (mol^-1)
pub const AVOGADRO: f64 = 6.0221415e23;

/// Cu K-alpha1 wavelength (m)
pub const CU_K_ALPHA: f64 = 1.54056e-10;

/// Scattering data of one element at one wavelength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatteringFactors {
    pub f1: f64,
    pub f2: f64,
    /// Atomic mass in g/mol
    pub atomic_mass: f64,
}

/// Source of per-element scattering factors.
pub trait ElementLookup: Send + Sync {
    fn scattering(&self, symbol: &str, lambda: f64) -> XrrResult<ScatteringFactors>;
}

/// Minimal table for Cu K-alpha. Enough for oxide/silicon stacks; anything
/// else has to come from an external lookup.
#[derive(Debug, Clone, Default)]
pub struct BuiltinTable;

const BUILTIN_TOLERANCE: f64 = 0.001e-10;

const BUILTIN_CU_K_ALPHA: [(&str, ScatteringFactors); 3] = [
    (
        "Al",
        ScatteringFactors {
            f1: 13.21,
            f2: 0.2416,
            atomic_mass: 26.982,
        },
    ),
    (
        "Si",
        ScatteringFactors {
            f1: 14.26,
            f2: 0.3249,
            atomic_mass: 28.086,
        },
    ),
    (
        "O",
        ScatteringFactors {
            f1: 8.052,
            f2: 3.3705e-2,
            atomic_mass: 15.999,
        },
    ),
];

impl ElementLookup for BuiltinTable {
    fn scattering(&self, symbol: &str, lambda: f64) -> XrrResult<ScatteringFactors> {
        if (lambda - CU_K_ALPHA).abs() <= BUILTIN_TOLERANCE {
            if let Some((_, f)) = BUILTIN_CU_K_ALPHA.iter().find(|(s, _)| *s == symbol) {
                return Ok(*f);
            }
        }
        Err(XrrError::UnknownElement {
            symbol: symbol.to_string(),
            lambda,
        })
    }
}

/// `delta` and `beta` divided by mass density (m³/kg).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OpticalConstants {
    pub delta_per_density: f64,
    pub beta_per_density: f64,
}

impl OpticalConstants {
    pub fn delta(&self, density: f64) -> f64 {
        density * self.delta_per_density
    }

    pub fn beta(&self, density: f64) -> f64 {
        density * self.beta_per_density
    }
}

/// Stoichiometric formula, element symbol to atom count.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Compound {
    pub atoms: BTreeMap<String, f64>,
}

impl Compound {
    pub fn new<S: Into<String>>(atoms: impl IntoIterator<Item = (S, f64)>) -> Self {
        Self {
            atoms: atoms.into_iter().map(|(s, n)| (s.into(), n)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn optical_constants(
        &self,
        lookup: &dyn ElementLookup,
        lambda: f64,
    ) -> XrrResult<OpticalConstants> {
        if self.atoms.is_empty() {
            return Ok(OpticalConstants::default());
        }

        // kg/mol
        let mut molar_mass = 0.0;
        let mut f1_sum = 0.0;
        let mut f2_sum = 0.0;
        for (symbol, &count) in &self.atoms {
            let f = lookup.scattering(symbol, lambda)?;
            molar_mass += count * f.atomic_mass / 1e3;
            f1_sum += count * f.f1;
            f2_sum += count * f.f2;
        }
        if molar_mass <= 0.0 {
            return Err(XrrError::Config(format!(
                "Compound {:?} has non-positive molar mass",
                self.atoms
            )));
        }

        let electrons_per_kg = f1_sum * AVOGADRO / molar_mass;
        let absorption_per_kg = f2_sum * AVOGADRO / molar_mass;
        let factor = lambda * lambda * R_ELECTRON / (2.0 * PI);

        Ok(OpticalConstants {
            delta_per_density: factor * electrons_per_kg,
            beta_per_density: factor * absorption_per_kg,
        })
    }
}

/// Two compounds mixed by mole fraction of the second one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Composition {
    pub first: Compound,
    pub second: Compound,
    pub fraction: f64,
}

impl Composition {
    pub fn pure(compound: Compound) -> Self {
        Self {
            first: compound,
            second: Compound::default(),
            fraction: 0.0,
        }
    }

    pub fn optical_constants(
        &self,
        lookup: &dyn ElementLookup,
        lambda: f64,
    ) -> XrrResult<OpticalConstants> {
        if !(0.0..=1.0).contains(&self.fraction) {
            return Err(XrrError::Config(format!(
                "Composition fraction {} outside [0, 1]",
                self.fraction
            )));
        }
        self.atoms().optical_constants(lookup, lambda)
    }

    /// Atom counts of the mixture, `first * (1 - f) + second * f`.
    pub fn atoms(&self) -> Compound {
        let mut atoms: BTreeMap<String, f64> = BTreeMap::new();
        let parts = [
            (&self.first, 1.0 - self.fraction),
            (&self.second, self.fraction),
        ];
        for (compound, weight) in parts {
            if weight == 0.0 {
                continue;
            }
            for (symbol, count) in &compound.atoms {
                *atoms.entry(symbol.clone()).or_insert(0.0) += count * weight;
            }
        }
        Compound { atoms }
    }
}
