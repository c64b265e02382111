use crate::model::Bound;
use fastrand::Rng;

/// Uniform sample inside `bounds`; fixed dimensions take their value exactly.
pub fn random_vector(rng: &mut Rng, bounds: &[Bound]) -> Vec<f64> {
    bounds
        .iter()
        .map(|b| {
            if b.is_fixed() {
                b.lo
            } else {
                b.lo + rng.f64() * (b.hi - b.lo)
            }
        })
        .collect()
}

/// `N` distinct indices below `n`, none of them in `exclude`.
///
/// The caller guarantees `n - exclude.len() >= N`.
pub fn pick_distinct<const N: usize>(rng: &mut Rng, n: usize, exclude: &[usize]) -> [usize; N] {
    let mut picked = [usize::MAX; N];
    for k in 0..N {
        picked[k] = loop {
            let candidate = rng.usize(0..n);
            if !exclude.contains(&candidate) && !picked[..k].contains(&candidate) {
                break candidate;
            }
        };
    }
    picked
}

/// `base + km * (a - b)`
pub fn differential(base: &[f64], a: &[f64], b: &[f64], km: f64) -> Vec<f64> {
    base.iter()
        .zip(a.iter().zip(b))
        .map(|(&x, (&p, &q))| x + km * (p - q))
        .collect()
}

/// `base + kr * (a + b - 2 base)`
pub fn recombination(base: &[f64], a: &[f64], b: &[f64], kr: f64) -> Vec<f64> {
    base.iter()
        .zip(a.iter().zip(b))
        .map(|(&x, (&p, &q))| x + kr * (p + q - 2.0 * x))
        .collect()
}

/// Binomial crossover over the positions in `dims`.
///
/// Each listed position comes from `mutant` with probability `cr`, and one
/// randomly chosen listed position always does. Other positions keep the
/// parent's value.
pub fn binomial_crossover(
    rng: &mut Rng,
    parent: &[f64],
    mutant: &[f64],
    cr: f64,
    dims: &[usize],
) -> Vec<f64> {
    let mut trial = parent.to_vec();
    if dims.is_empty() {
        return trial;
    }
    let forced = dims[rng.usize(0..dims.len())];
    for &j in dims {
        if j == forced || rng.f64() < cr {
            trial[j] = mutant[j];
        }
    }
    trial
}

/// Reflects out-of-range values once at the violated bound, then clamps.
/// Fixed dimensions are reset to their value.
pub fn repair(x: &mut [f64], bounds: &[Bound]) {
    for (v, b) in x.iter_mut().zip(bounds) {
        if b.is_fixed() {
            *v = b.lo;
            continue;
        }
        if *v < b.lo {
            *v = b.lo + (b.lo - *v);
        } else if *v > b.hi {
            *v = b.hi - (*v - b.hi);
        }
        *v = v.clamp(b.lo, b.hi);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(n: usize) -> Vec<Bound> {
        (0..n)
            .map(|_| Bound {
                lo: 0.0,
                hi: 1.0,
                initial: 0.5,
            })
            .collect()
    }

    #[test]
    fn test_repair_reflects_once() {
        let bounds = unit(3);
        let mut x = vec![-0.25, 1.5, 3.5];
        repair(&mut x, &bounds);
        assert_eq!(x, vec![0.25, 0.5, 0.0]);
    }

    #[test]
    fn test_pick_distinct_excludes() {
        let mut rng = Rng::with_seed(3);
        for _ in 0..200 {
            let [a, b, c] = pick_distinct::<3>(&mut rng, 5, &[2]);
            assert!(a != b && b != c && a != c);
            assert!(![a, b, c].contains(&2));
        }
    }

    #[test]
    fn test_crossover_takes_forced_dimension() {
        let mut rng = Rng::with_seed(11);
        let parent = vec![0.0; 4];
        let mutant = vec![1.0; 4];
        for _ in 0..50 {
            let trial = binomial_crossover(&mut rng, &parent, &mutant, 0.0, &[1, 3]);
            assert_eq!(trial[0], 0.0);
            assert_eq!(trial[2], 0.0);
            assert_eq!(trial[1] + trial[3], 1.0);
        }
    }
}
