use super::fit_value::FitValue;
use crate::error::XrrResult;
use crate::optics::{Composition, ElementLookup, OpticalConstants};
use serde::{Deserialize, Serialize};

/// Roughness shape for which the finite-roughness term vanishes in practice
/// and the interface profile is a plain error function.
pub const GAUSSIAN_ROUGHNESS_SHAPE: f64 = 10.0;

fn default_roughness_shape() -> f64 {
    GAUSSIAN_ROUGHNESS_SHAPE
}

/// One film (or the substrate). All lengths in m, densities in kg/m³.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub thickness: FitValue,
    pub density: FitValue,
    /// Roughness of the interface on top of this layer.
    pub roughness: FitValue,
    #[serde(default = "default_roughness_shape")]
    pub roughness_shape: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<Composition>,
    #[serde(default)]
    pub optics: OpticalConstants,
}

impl Layer {
    pub fn new(
        name: &str,
        thickness: FitValue,
        density: FitValue,
        roughness: FitValue,
        optics: OpticalConstants,
    ) -> Self {
        Self {
            name: name.to_string(),
            thickness,
            density,
            roughness,
            roughness_shape: GAUSSIAN_ROUGHNESS_SHAPE,
            composition: None,
            optics,
        }
    }

    pub fn with_roughness_shape(mut self, beta_f: f64) -> Self {
        self.roughness_shape = beta_f;
        self
    }

    /// Recomputes `optics` from `composition`, if one is set.
    pub fn resolve_optics(&mut self, lookup: &dyn ElementLookup, lambda: f64) -> XrrResult<()> {
        if let Some(composition) = &self.composition {
            self.optics = composition.optical_constants(lookup, lambda)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> XrrResult<()> {
        self.thickness.validate()?;
        self.density.validate()?;
        self.roughness.validate()?;
        Ok(())
    }

    pub fn delta(&self) -> f64 {
        self.optics.delta(self.density.expected)
    }

    pub fn beta(&self) -> f64 {
        self.optics.beta(self.density.expected)
    }
}
