use super::Individual;
use crate::model::Bound;
use nalgebra::{DMatrix, DVector};

/// Principal axes of the population, used by CovDE to mutate along
/// correlated directions.
///
/// Works on the free dimensions only, each scaled to the unit interval so
/// that thicknesses (nm) and densities (kg/m³) are comparable.
#[derive(Debug, Clone)]
pub struct Rotation {
    free: Vec<usize>,
    lo: Vec<f64>,
    span: Vec<f64>,
    /// Columns are orthonormal eigenvectors.
    basis: DMatrix<f64>,
}

impl Rotation {
    pub fn from_population(population: &[Individual], bounds: &[Bound], free: &[usize]) -> Self {
        let k = free.len();
        let lo: Vec<f64> = free.iter().map(|&j| bounds[j].lo).collect();
        let span: Vec<f64> = free.iter().map(|&j| bounds[j].hi - bounds[j].lo).collect();

        let mut rotation = Self {
            free: free.to_vec(),
            lo,
            span,
            basis: DMatrix::identity(k, k),
        };
        if k < 2 || population.len() < 2 {
            return rotation;
        }

        let points: Vec<DVector<f64>> = population
            .iter()
            .map(|ind| rotation.normalize(ind.params()))
            .collect();
        let mut mean = DVector::zeros(k);
        for p in &points {
            mean += p;
        }
        mean /= points.len() as f64;

        let mut cov = DMatrix::zeros(k, k);
        for p in &points {
            let d = p - &mean;
            cov += &d * d.transpose();
        }
        cov /= (points.len() - 1) as f64;

        let eigen = nalgebra::SymmetricEigen::new(cov);
        if eigen.eigenvectors.iter().all(|v| v.is_finite()) {
            rotation.basis = eigen.eigenvectors;
        }
        rotation
    }

    fn normalize(&self, x: &[f64]) -> DVector<f64> {
        DVector::from_iterator(
            self.free.len(),
            self.free
                .iter()
                .zip(self.lo.iter().zip(&self.span))
                .map(|(&j, (&lo, &span))| (x[j] - lo) / span),
        )
    }

    /// Coordinates of `x` along the principal axes.
    pub fn to_local(&self, x: &[f64]) -> Vec<f64> {
        let u = self.normalize(x);
        (self.basis.transpose() * u).iter().copied().collect()
    }

    /// Inverse of [`Rotation::to_local`]; dimensions outside the rotation are
    /// copied from `template`.
    pub fn to_global(&self, local: &[f64], template: &[f64]) -> Vec<f64> {
        let y = DVector::from_column_slice(local);
        let u = &self.basis * y;
        let mut x = template.to_vec();
        for (i, &j) in self.free.iter().enumerate() {
            x[j] = self.lo[i] + self.span[i] * u[i];
        }
        x
    }

    pub fn dimension(&self) -> usize {
        self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_basis() {
        let bounds = vec![
            Bound {
                lo: 0.0,
                hi: 10.0,
                initial: 1.0,
            },
            Bound::fixed(3.0),
            Bound {
                lo: -1.0,
                hi: 1.0,
                initial: 0.0,
            },
        ];
        let population: Vec<Individual> = [
            [1.0, 3.0, 0.1],
            [2.0, 3.0, 0.3],
            [4.0, 3.0, 0.6],
            [7.0, 3.0, -0.2],
        ]
        .iter()
        .map(|p| Individual::new(p.to_vec(), 0.0))
        .collect();

        let rot = Rotation::from_population(&population, &bounds, &[0, 2]);
        let x = [5.0, 3.0, -0.5];
        let back = rot.to_global(&rot.to_local(&x), &x);
        for (a, b) in x.iter().zip(&back) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
