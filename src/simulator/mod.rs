//! Forward model: layer stack and grazing angles in, reflected intensity out.
//!
//! `simulate` is a pure function of its inputs and runs single threaded;
//! parallelism lives one level up, across optimizer trials.

pub mod parratt;
pub mod profile;
pub mod resolution;

use crate::model::LayerStack;
use parratt::Slabs;

/// Flattens `stack` into per-slab arrays, ambient first, substrate last.
pub fn slabs(stack: &LayerStack) -> Slabs {
    let mut slabs = Slabs::ambient();
    for layer in &stack.layers {
        slabs.push(
            layer.delta(),
            layer.beta(),
            layer.thickness.expected,
            layer.roughness.expected,
            layer.roughness_shape,
        );
    }
    let sub = &stack.substrate;
    slabs.push(
        sub.delta(),
        sub.beta(),
        0.0,
        sub.roughness.expected,
        sub.roughness_shape,
    );
    slabs
}

/// Footprint factor `min(1, beam * sin(a))`.
#[inline]
pub fn footprint(beam: f64, a: f64) -> f64 {
    (beam * a.sin()).min(1.0)
}

/// Simulated reflectivity at `angles` (rad).
///
/// Includes the beam footprint and instrumental broadening but not the
/// scale/baseline calibration, see [`simulate_calibrated`].
pub fn simulate(angles: &[f64], stack: &LayerStack) -> Vec<f64> {
    let offset = stack.offset.to_radians();
    let beam = stack.beam.expected;

    let mut intensity = parratt::specular(&slabs(stack), stack.lambda, angles, offset);
    for (value, &alpha) in intensity.iter_mut().zip(angles) {
        *value *= footprint(beam, alpha - offset);
    }

    resolution::broaden(angles, intensity, stack.resolution)
}

/// Applies the stack's scale and baseline (both dB) to a simulated curve.
pub fn calibrate(intensity: &mut [f64], stack: &LayerStack) {
    let factor = 10f64.powf(stack.scale.expected / 10.0);
    let floor = 10f64.powf(stack.baseline.expected / 10.0);
    for value in intensity.iter_mut() {
        *value = *value * factor + floor;
    }
}

/// Simulated curve directly comparable to a measurement.
pub fn simulate_calibrated(angles: &[f64], stack: &LayerStack) -> Vec<f64> {
    let mut intensity = simulate(angles, stack);
    calibrate(&mut intensity, stack);
    intensity
}

/// Convenience wrapper taking angles in degrees.
pub fn simulate_degrees(angles_deg: &[f64], stack: &LayerStack) -> Vec<f64> {
    let angles: Vec<f64> = angles_deg.iter().map(|a| a.to_radians()).collect();
    simulate_calibrated(&angles, stack)
}
