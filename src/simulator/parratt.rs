use num_complex::Complex64;
use std::f64::consts::PI;

/// Flattened optical description of a stack, index 0 being the ambient and
/// the last index the substrate.
///
/// `roughness[i]` and `roughness_shape[i]` describe the interface on top of
/// layer `i`; their entries at index 0 are never read.
#[derive(Debug, Clone, Default)]
pub struct Slabs {
    pub delta: Vec<f64>,
    pub beta: Vec<f64>,
    pub thickness: Vec<f64>,
    pub roughness: Vec<f64>,
    pub roughness_shape: Vec<f64>,
}

impl Slabs {
    pub fn ambient() -> Self {
        let mut slabs = Self::default();
        slabs.push(0.0, 0.0, 0.0, 0.0, 0.0);
        slabs
    }

    pub fn push(&mut self, delta: f64, beta: f64, thickness: f64, roughness: f64, shape: f64) {
        self.delta.push(delta);
        self.beta.push(beta);
        self.thickness.push(thickness);
        self.roughness.push(roughness);
        self.roughness_shape.push(shape);
    }

    pub fn len(&self) -> usize {
        self.delta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delta.is_empty()
    }
}

#[inline]
fn c(re: f64) -> Complex64 {
    Complex64::new(re, 0.0)
}

/// Perpendicular wavevector in slab `i` at grazing angle `a` (rad, offset removed).
///
/// Principal square root, so the imaginary part is never positive and
/// `exp(-2i kz d)` decays with depth.
#[inline]
fn wavevector(k0: f64, a: f64, delta: f64, beta: f64) -> Complex64 {
    Complex64::new(a * a - 2.0 * delta, -2.0 * beta).sqrt() * k0
}

/// Additive correction to the Nevot-Croce factor for a finite roughness
/// shape `beta_f`. Goes to zero as `q -> 0` and for large `beta_f`.
#[inline]
pub fn finite_roughness_term(sigma: f64, beta_f: f64, q: f64) -> f64 {
    let s2q2 = sigma * sigma * q * q;
    let bf2 = beta_f * beta_f;
    let divisor = s2q2 + bf2;
    if divisor == 0.0 {
        return 0.0;
    }
    s2q2 / PI.sqrt() * (-bf2 / 2.0).exp() / divisor
}

/// Complex reflection amplitude of the whole stack at one angle.
///
/// `a` is the grazing angle in radians with the zero offset already removed.
pub fn amplitude(slabs: &Slabs, k0: f64, a: f64) -> Complex64 {
    let n = slabs.len();
    if n < 2 {
        return Complex64::new(0.0, 0.0);
    }

    let q = 2.0 * k0 * a;
    let mut below = wavevector(k0, a, slabs.delta[n - 1], slabs.beta[n - 1]);
    let mut r_total = c(0.0);

    for i in (1..n).rev() {
        let above = wavevector(k0, a, slabs.delta[i - 1], slabs.beta[i - 1]);
        let sigma = slabs.roughness[i];

        let mut fresnel = (above - below) / (above + below);
        if !(fresnel.re.is_finite() && fresnel.im.is_finite()) {
            fresnel = c(0.0);
        }

        let damping = (above * below * (-2.0 * sigma * sigma)).exp()
            + finite_roughness_term(sigma, slabs.roughness_shape[i], q);
        let rough = damping * fresnel;

        let phase = (Complex64::new(0.0, -2.0) * below * slabs.thickness[i]).exp();
        let b = phase * r_total;
        r_total = (b + rough) / (b * rough + 1.0);

        below = above;
    }

    r_total
}

/// `|R|^2` for every angle, before footprint or broadening.
pub fn specular(slabs: &Slabs, lambda: f64, angles: &[f64], offset: f64) -> Vec<f64> {
    let k0 = 2.0 * PI / lambda;
    angles
        .iter()
        .map(|&alpha| amplitude(slabs, k0, alpha - offset).norm_sqr())
        .collect()
}
