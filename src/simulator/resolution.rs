/// Kernel half width in standard deviations.
const KERNEL_STDDEVS: f64 = 4.0;

/// Relative tolerance on the angle step for a grid to count as uniform.
const SPACING_TOLERANCE: f64 = 1e-4;

/// Whether every step of `x` equals the mean step within a relative tolerance.
/// Arrays with fewer than three points are trivially uniform.
pub fn is_uniformly_spaced(x: &[f64]) -> bool {
    if x.len() < 3 {
        return true;
    }
    let dx = (x[x.len() - 1] - x[0]) / (x.len() - 1) as f64;
    let lo = (1.0 - SPACING_TOLERANCE) * dx;
    let hi = (1.0 + SPACING_TOLERANCE) * dx;
    x.windows(2).all(|w| {
        let diff = w[1] - w[0];
        diff >= lo.min(hi) && diff <= hi.max(lo)
    })
}

/// Normalized Gaussian kernel of odd length for a grid step `step` and
/// standard deviation `stddev`, both in the same unit.
///
/// Returns `None` when the kernel would be a single point.
pub fn gaussian_kernel(step: f64, stddev: f64) -> Option<Vec<f64>> {
    if !(step > 0.0 && step.is_finite() && stddev > 0.0) {
        return None;
    }
    let side = (KERNEL_STDDEVS * stddev / step).round();
    if !(side >= 1.0 && side.is_finite()) {
        return None;
    }
    let side = side as usize;

    let mut kernel: Vec<f64> = (0..=2 * side)
        .map(|i| {
            let x = step * (i as f64 - side as f64) / stddev;
            (-x * x / 2.0).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= sum);
    Some(kernel)
}

/// Centered convolution with an odd-length kernel; output has the length of
/// `data`, samples beyond either end count as zero.
pub fn convolve_same(kernel: &[f64], data: &[f64]) -> Vec<f64> {
    let side = kernel.len() / 2;
    let n = data.len();
    (0..n)
        .map(|k| {
            let center = k + side;
            let lo = center.saturating_sub(n - 1);
            let hi = kernel.len().min(center + 1);
            (lo..hi).map(|j| data[center - j] * kernel[j]).sum()
        })
        .collect()
}

/// Applies instrumental broadening of `stddev` rad to `intensity` sampled at
/// `angles` rad. Non-uniform or degenerate grids are returned untouched.
pub fn broaden(angles: &[f64], intensity: Vec<f64>, stddev: f64) -> Vec<f64> {
    if angles.len() < 2 || !is_uniformly_spaced(angles) {
        return intensity;
    }
    let step = (angles[angles.len() - 1] - angles[0]) / (angles.len() - 1) as f64;
    match gaussian_kernel(step, stddev) {
        Some(kernel) => convolve_same(&kernel, &intensity),
        None => intensity,
    }
}
