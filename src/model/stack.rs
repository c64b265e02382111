use super::fit_value::{Bound, FitValue};
use super::layer::Layer;
use crate::error::{XrrError, XrrResult};
use crate::optics::ElementLookup;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Stack-wide entries at the head of every parameter vector.
pub const GLOBAL_PARAMETERS: usize = 3;

fn default_beam() -> FitValue {
    FitValue::fixed(1e4)
}

fn default_scale() -> FitValue {
    FitValue {
        min: -100.0,
        expected: 0.0,
        max: 100.0,
        enabled: false,
    }
}

fn default_baseline() -> FitValue {
    FitValue {
        min: -200.0,
        expected: -200.0,
        max: 100.0,
        enabled: false,
    }
}

/// A full sample description: films on a substrate plus instrument scalars.
///
/// Films are ordered top to bottom. Vacuum is implicitly above `layers[0]`
/// and the semi-infinite `substrate` below the last film.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerStack {
    /// Wavelength (m)
    pub lambda: f64,
    /// Instrument angular resolution, standard deviation (rad)
    #[serde(default)]
    pub resolution: f64,
    /// Angular zero offset (degrees)
    #[serde(default)]
    pub offset: f64,
    /// Beam footprint factor, reflectivity is scaled by `min(1, beam * sin(angle))`
    #[serde(default = "default_beam")]
    pub beam: FitValue,
    /// Multiplicative calibration (dB)
    #[serde(default = "default_scale")]
    pub scale: FitValue,
    /// Additive background (dB)
    #[serde(default = "default_baseline")]
    pub baseline: FitValue,
    #[serde(default)]
    pub layers: Vec<Layer>,
    pub substrate: Layer,
}

impl LayerStack {
    pub fn new(lambda: f64, substrate: Layer) -> Self {
        Self {
            lambda,
            resolution: 0.0,
            offset: 0.0,
            beam: default_beam(),
            scale: default_scale(),
            baseline: default_baseline(),
            layers: Vec::new(),
            substrate,
        }
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Reads a JSON model and resolves layer compositions through `lookup`.
    pub fn load_from_file<P: AsRef<Path>>(path: P, lookup: &dyn ElementLookup) -> XrrResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content, lookup)
    }

    pub fn from_json(content: &str, lookup: &dyn ElementLookup) -> XrrResult<Self> {
        let mut stack: LayerStack = serde_json::from_str(content)?;
        stack.resolve_optics(lookup)?;
        stack.validate()?;
        Ok(stack)
    }

    pub fn to_json(&self) -> XrrResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn resolve_optics(&mut self, lookup: &dyn ElementLookup) -> XrrResult<()> {
        let lambda = self.lambda;
        for layer in self.layers.iter_mut() {
            layer.resolve_optics(lookup, lambda)?;
        }
        self.substrate.resolve_optics(lookup, lambda)
    }

    pub fn validate(&self) -> XrrResult<()> {
        if !(self.lambda > 0.0 && self.lambda.is_finite()) {
            return Err(XrrError::Config(format!(
                "Wavelength must be positive, got {}",
                self.lambda
            )));
        }
        if !(self.resolution >= 0.0) {
            return Err(XrrError::Config(format!(
                "Resolution must be non-negative, got {}",
                self.resolution
            )));
        }
        self.beam.validate()?;
        self.scale.validate()?;
        self.baseline.validate()?;
        for layer in &self.layers {
            layer.validate()?;
        }
        self.substrate.validate()?;
        if self.substrate.thickness.enabled {
            return Err(XrrError::Config(format!(
                "Substrate '{}' is semi-infinite, its thickness cannot be fitted",
                self.substrate.name
            )));
        }
        Ok(())
    }

    /// Number of films, excluding the substrate.
    pub fn film_count(&self) -> usize {
        self.layers.len()
    }

    /// Films plus the substrate, each contributing thickness, density and
    /// roughness slots.
    pub fn parameter_count(&self) -> usize {
        GLOBAL_PARAMETERS + 3 * (self.layers.len() + 1)
    }

    /// Films top to bottom, then the substrate.
    fn all_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().chain(std::iter::once(&self.substrate))
    }

    /// Search bounds in parameter-vector order.
    pub fn bounds(&self) -> Vec<Bound> {
        self.fit_values().map(|v| v.bound()).collect()
    }

    /// Current expected values in parameter-vector order.
    pub fn parameters(&self) -> Vec<f64> {
        self.fit_values().map(|v| v.expected).collect()
    }

    pub fn parameter_names(&self) -> Vec<String> {
        let mut names = vec![
            "scale".to_string(),
            "baseline".to_string(),
            "beam".to_string(),
        ];
        for suffix in ["thickness", "density", "roughness"] {
            for (i, layer) in self.all_layers().enumerate() {
                names.push(format!("{}#{}.{}", layer.name, i, suffix));
            }
        }
        names
    }

    /// Writes a parameter vector back into the stack.
    ///
    /// # Panics
    ///
    /// If `params.len()` differs from [`LayerStack::parameter_count`].
    pub fn apply_parameters(&mut self, params: &[f64]) {
        assert_eq!(
            params.len(),
            self.parameter_count(),
            "parameter vector length does not match a stack of {} films",
            self.layers.len()
        );
        let n = self.layers.len() + 1;
        self.scale.set_expected(params[0]);
        self.baseline.set_expected(params[1]);
        self.beam.set_expected(params[2]);
        let layers = self
            .layers
            .iter_mut()
            .chain(std::iter::once(&mut self.substrate));
        for (i, layer) in layers.enumerate() {
            layer.thickness.set_expected(params[GLOBAL_PARAMETERS + i]);
            layer.density.set_expected(params[GLOBAL_PARAMETERS + n + i]);
            layer.roughness.set_expected(params[GLOBAL_PARAMETERS + 2 * n + i]);
        }
    }

    /// Copy of the stack with `params` applied.
    pub fn with_parameters(&self, params: &[f64]) -> LayerStack {
        let mut copy = self.clone();
        copy.apply_parameters(params);
        copy
    }

    fn fit_values(&self) -> impl Iterator<Item = &FitValue> {
        [&self.scale, &self.baseline, &self.beam]
            .into_iter()
            .chain(self.all_layers().map(|l| &l.thickness))
            .chain(self.all_layers().map(|l| &l.density))
            .chain(self.all_layers().map(|l| &l.roughness))
    }
}
