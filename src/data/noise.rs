use rand::Rng;
use rand_distr::{Distribution, Poisson};

/// Draws a Poisson count. Non-positive or non-finite means give 0.
pub fn poisson<R: Rng + ?Sized>(rng: &mut R, mean: f64) -> u64 {
    if !(mean > 0.0 && mean.is_finite()) {
        return 0;
    }
    match Poisson::new(mean) {
        Ok(dist) => dist.sample(rng) as u64,
        Err(_) => 0,
    }
}
