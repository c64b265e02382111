//! Depth profiles of the layer model: density, delta or beta as a function of
//! depth below the surface, with interfaces smeared by their roughness.

use crate::model::{Layer, LayerStack, GAUSSIAN_ROUGHNESS_SHAPE};
use serde::Serialize;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum ProfileProperty {
    Density,
    Delta,
    Beta,
}

impl ProfileProperty {
    fn of(&self, layer: &Layer) -> f64 {
        match self {
            ProfileProperty::Density => layer.density.expected,
            ProfileProperty::Delta => layer.delta(),
            ProfileProperty::Beta => layer.beta(),
        }
    }
}

/// Complementary error function, Abramowitz-Stegun 7.1.26.
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.3275911 * z);
    let poly = t
        * (0.254829592
            + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    let tail = poly * (-z * z).exp();
    if x >= 0.0 {
        tail
    } else {
        2.0 - tail
    }
}

fn normal_cdf(x: f64, mean: f64, stddev: f64) -> f64 {
    let d = x - mean;
    if d == 0.0 {
        return 0.5;
    }
    let z = d / stddev / std::f64::consts::SQRT_2;
    if z.is_infinite() {
        return if z > 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - 0.5 * erfc(z)
}

fn all_layers(stack: &LayerStack) -> impl Iterator<Item = &Layer> {
    stack.layers.iter().chain(std::iter::once(&stack.substrate))
}

/// `n` evenly spaced depths (m) covering every interface with a 4 sigma margin.
pub fn depths(n: usize, stack: &LayerStack) -> Vec<f64> {
    const MARGIN_STDDEVS: f64 = 4.0;

    let mut min: f64 = 0.0;
    let mut max: f64 = 0.0;
    let mut depth = 0.0;
    for layer in all_layers(stack) {
        let sigma = layer.roughness.expected;
        min = min.min(depth - MARGIN_STDDEVS * sigma);
        max = max.max(depth + MARGIN_STDDEVS * sigma);
        let span = max - min;
        min -= 0.05 * span;
        max += 0.05 * span;
        depth += layer.thickness.expected;
    }
    linspace(n, min, max)
}

pub fn linspace(n: usize, min: f64, max: f64) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![min],
        _ => (0..n)
            .map(|i| min + i as f64 * (max - min) / (n - 1) as f64)
            .collect(),
    }
}

/// Evaluates `property` at each of `ds`.
///
/// Each interface contributes the step between the layers it separates,
/// spread by a normal CDF truncated at `roughness_shape` standard
/// deviations. With `stair` set, roughness is ignored.
pub fn depth_profile(
    ds: &[f64],
    stack: &LayerStack,
    stair: bool,
    property: ProfileProperty,
) -> Vec<f64> {
    struct Step {
        depth: f64,
        sigma: f64,
        half_width: f64,
        jump: f64,
    }

    let mut steps = Vec::with_capacity(stack.layers.len() + 1);
    let mut depth = 0.0;
    let mut previous = 0.0;
    for layer in all_layers(stack) {
        let sigma = if stair { 0.0 } else { layer.roughness.expected };
        let shape = if stair {
            GAUSSIAN_ROUGHNESS_SHAPE
        } else {
            layer.roughness_shape
        };
        let value = property.of(layer);
        steps.push(Step {
            depth,
            sigma,
            half_width: sigma * shape,
            jump: value - previous,
        });
        previous = value;
        depth += layer.thickness.expected;
    }

    ds.iter()
        .map(|&x| {
            steps
                .iter()
                .map(|s| {
                    if x <= s.depth - s.half_width {
                        0.0
                    } else if x >= s.depth + s.half_width {
                        s.jump
                    } else {
                        let lo = normal_cdf(s.depth - s.half_width, s.depth, s.sigma);
                        let hi = normal_cdf(s.depth + s.half_width, s.depth, s.sigma);
                        s.jump * (normal_cdf(x, s.depth, s.sigma) - lo) / (hi - lo)
                    }
                })
                .sum()
        })
        .collect()
}
