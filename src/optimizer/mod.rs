pub mod covariance;
pub mod mutation;

use self::covariance::Rotation;
use crate::config::FitConfig;
use crate::error::{XrrError, XrrResult};
use crate::model::Bound;
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::{Display, EnumIter, EnumString};
use tracing::debug;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Classic differential evolution
    De,
    /// Mutation and crossover in the population's principal axes
    CovDe,
    /// Differential step or recombination, chosen at random per trial
    EitherOr,
}

/// Base vector of the differential step.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BaseVector {
    Rand,
    Best,
}

/// Something that maps a parameter vector to a misfit. Called concurrently.
pub trait Objective: Send + Sync {
    fn evaluate(&self, params: &[f64]) -> XrrResult<f64>;
}

impl<F> Objective for F
where
    F: Fn(&[f64]) -> XrrResult<f64> + Send + Sync,
{
    fn evaluate(&self, params: &[f64]) -> XrrResult<f64> {
        self(params)
    }
}

#[derive(Debug, Clone)]
pub struct DeSettings {
    pub popsize: usize,
    pub algorithm: Algorithm,
    pub base: BaseVector,
    pub km: f64,
    pub kr: f64,
    pub pm: f64,
    pub cr: f64,
    pub cov_period: usize,
    pub seed: Option<u64>,
}

impl Default for DeSettings {
    fn default() -> Self {
        Self {
            popsize: 40,
            algorithm: Algorithm::De,
            base: BaseVector::Rand,
            km: 0.7,
            kr: 0.85,
            pm: 0.5,
            cr: 0.5,
            cov_period: 1,
            seed: None,
        }
    }
}

impl From<&FitConfig> for DeSettings {
    fn from(cfg: &FitConfig) -> Self {
        Self {
            popsize: cfg.fit.popsize,
            algorithm: cfg.fit.algorithm,
            base: cfg.fit.base,
            km: cfg.advanced.km,
            kr: cfg.advanced.kr(),
            pm: cfg.advanced.pm,
            cr: cfg.advanced.cr,
            cov_period: cfg.advanced.cov_period,
            seed: cfg.fit.seed,
        }
    }
}

impl DeSettings {
    pub fn validate(&self) -> XrrResult<()> {
        if self.popsize < 4 {
            return Err(XrrError::Config(format!(
                "Population size must be at least 4, got {}",
                self.popsize
            )));
        }
        if !(self.km > 0.0 && self.km.is_finite()) || !self.kr.is_finite() {
            return Err(XrrError::Config(format!(
                "Invalid mutation factors km={} kr={}",
                self.km, self.kr
            )));
        }
        if !(0.0..=1.0).contains(&self.cr) || !(0.0..=1.0).contains(&self.pm) {
            return Err(XrrError::Config(format!(
                "Probabilities out of range: cr={} pm={}",
                self.cr, self.pm
            )));
        }
        if self.cov_period == 0 {
            return Err(XrrError::Config(
                "Covariance period must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// A parameter vector and its fitness, always evaluated together.
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    params: Vec<f64>,
    fitness: f64,
}

impl Individual {
    pub(crate) fn new(params: Vec<f64>, fitness: f64) -> Self {
        Self { params, fitness }
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }
}

/// Greedy selection: ties go to the trial, NaN never wins.
#[inline]
pub fn accepts(trial: f64, parent: f64) -> bool {
    !trial.is_nan() && (parent.is_nan() || trial <= parent)
}

#[inline]
fn rank_key(fitness: f64) -> f64 {
    if fitness.is_nan() {
        f64::INFINITY
    } else {
        fitness
    }
}

/// Fitness ranking of one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationStats {
    /// Indices into the population, best first.
    pub order: Vec<usize>,
    pub best: f64,
    pub median: f64,
    pub worst: f64,
}

impl PopulationStats {
    pub fn of(population: &[Individual]) -> Self {
        let mut order: Vec<usize> = (0..population.len()).collect();
        order.sort_by(|&a, &b| {
            rank_key(population[a].fitness).total_cmp(&rank_key(population[b].fitness))
        });
        let at = |k: usize| population[order[k]].fitness;
        let n = order.len();
        Self {
            best: at(0),
            median: at(n / 2),
            worst: at(n - 1),
            order,
        }
    }

    pub fn best_index(&self) -> usize {
        self.order[0]
    }
}

/// Differential evolution over a box-bounded space.
///
/// Each call to [`DeOptimizer::advance`] runs one generation: every trial is
/// built from the previous population, all trials are evaluated on the pool,
/// and only then does selection replace parents.
pub struct DeOptimizer<O: Objective> {
    bounds: Vec<Bound>,
    free: Vec<usize>,
    objective: O,
    settings: DeSettings,
    pool: Arc<ThreadPool>,
    population: Vec<Individual>,
    stats: PopulationStats,
    rotation: Option<Rotation>,
    rng: fastrand::Rng,
    generation: usize,
    poisoned: bool,
}

impl<O: Objective> DeOptimizer<O> {
    /// Seeds and evaluates the initial population: the initial guess plus
    /// `popsize - 1` uniform samples.
    pub fn new(
        bounds: Vec<Bound>,
        objective: O,
        settings: DeSettings,
        pool: Arc<ThreadPool>,
    ) -> XrrResult<Self> {
        settings.validate()?;
        if bounds.is_empty() {
            return Err(XrrError::Config("Empty parameter space".to_string()));
        }
        for bound in &bounds {
            bound.validate()?;
        }

        let mut rng = if let Some(s) = settings.seed {
            fastrand::Rng::with_seed(s)
        } else {
            fastrand::Rng::new()
        };

        let free: Vec<usize> = bounds
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.is_fixed())
            .map(|(j, _)| j)
            .collect();

        let mut candidates = Vec::with_capacity(settings.popsize);
        candidates.push(bounds.iter().map(|b| b.initial).collect::<Vec<f64>>());
        for _ in 1..settings.popsize {
            candidates.push(mutation::random_vector(&mut rng, &bounds));
        }

        let fitness: Vec<f64> = pool.install(|| {
            candidates
                .par_iter()
                .map(|c| objective.evaluate(c))
                .collect::<XrrResult<Vec<f64>>>()
        })?;

        let population: Vec<Individual> = candidates
            .into_iter()
            .zip(fitness)
            .map(|(p, f)| Individual::new(p, f))
            .collect();
        let stats = PopulationStats::of(&population);

        debug!(
            "DE initialized: {} individuals, {} of {} dimensions free, {} ({} base)",
            settings.popsize,
            free.len(),
            bounds.len(),
            settings.algorithm,
            settings.base
        );

        Ok(Self {
            bounds,
            free,
            objective,
            settings,
            pool,
            population,
            stats,
            rotation: None,
            rng,
            generation: 0,
            poisoned: false,
        })
    }

    /// Runs one generation.
    ///
    /// An evaluation error aborts the generation before any selection and
    /// leaves the optimizer poisoned.
    pub fn advance(&mut self) -> XrrResult<&PopulationStats> {
        if self.poisoned {
            return Err(XrrError::Poisoned);
        }

        if self.settings.algorithm == Algorithm::CovDe
            && (self.rotation.is_none() || self.generation % self.settings.cov_period == 0)
        {
            self.rotation = Some(Rotation::from_population(
                &self.population,
                &self.bounds,
                &self.free,
            ));
        }

        let seeds: Vec<u64> = (0..self.population.len())
            .map(|_| self.rng.u64(..))
            .collect();

        let builder = TrialBuilder {
            population: &self.population,
            bounds: &self.bounds,
            free: &self.free,
            settings: &self.settings,
            best: self.stats.best_index(),
            rotation: self.rotation.as_ref(),
        };
        let objective = &self.objective;

        let evaluated = self.pool.install(|| {
            seeds
                .par_iter()
                .enumerate()
                .map(|(i, &seed)| {
                    let mut rng = fastrand::Rng::with_seed(seed);
                    let trial = builder.build(i, &mut rng);
                    let fitness = objective.evaluate(&trial)?;
                    Ok(Individual::new(trial, fitness))
                })
                .collect::<XrrResult<Vec<Individual>>>()
        });

        let trials = match evaluated {
            Ok(trials) => trials,
            Err(e) => {
                self.poisoned = true;
                return Err(e);
            }
        };

        for (parent, trial) in self.population.iter_mut().zip(trials) {
            if accepts(trial.fitness, parent.fitness) {
                *parent = trial;
            }
        }

        self.generation += 1;
        self.stats = PopulationStats::of(&self.population);
        Ok(&self.stats)
    }

    pub fn stats(&self) -> &PopulationStats {
        &self.stats
    }

    pub fn best(&self) -> &Individual {
        &self.population[self.stats.order[0]]
    }

    pub fn median(&self) -> &Individual {
        &self.population[self.stats.order[self.stats.order.len() / 2]]
    }

    pub fn worst(&self) -> &Individual {
        &self.population[self.stats.order[self.stats.order.len() - 1]]
    }

    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    pub fn bounds(&self) -> &[Bound] {
        &self.bounds
    }

    pub fn objective(&self) -> &O {
        &self.objective
    }

    pub fn settings(&self) -> &DeSettings {
        &self.settings
    }

    /// Completed generations.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}

/// Read-only view of one generation used to build trial vectors.
struct TrialBuilder<'a> {
    population: &'a [Individual],
    bounds: &'a [Bound],
    free: &'a [usize],
    settings: &'a DeSettings,
    best: usize,
    rotation: Option<&'a Rotation>,
}

impl TrialBuilder<'_> {
    fn build(&self, i: usize, rng: &mut fastrand::Rng) -> Vec<f64> {
        let parent = &self.population[i].params;
        let np = self.population.len();
        let s = self.settings;

        let (base, a, b) = match s.base {
            BaseVector::Rand => {
                let [r0, r1, r2] = mutation::pick_distinct::<3>(rng, np, &[i]);
                (r0, r1, r2)
            }
            BaseVector::Best => {
                let [r1, r2] = mutation::pick_distinct::<2>(rng, np, &[i, self.best]);
                (self.best, r1, r2)
            }
        };
        let (base, a, b) = (
            &self.population[base].params,
            &self.population[a].params,
            &self.population[b].params,
        );

        let mut trial = match (s.algorithm, self.rotation) {
            (Algorithm::CovDe, Some(rot)) => {
                let mutant = mutation::differential(
                    &rot.to_local(base),
                    &rot.to_local(a),
                    &rot.to_local(b),
                    s.km,
                );
                let local_dims: Vec<usize> = (0..rot.dimension()).collect();
                let local = mutation::binomial_crossover(
                    rng,
                    &rot.to_local(parent),
                    &mutant,
                    s.cr,
                    &local_dims,
                );
                rot.to_global(&local, parent)
            }
            (Algorithm::EitherOr, _) => {
                if rng.f64() < s.pm {
                    mutation::recombination(base, a, b, s.kr)
                } else {
                    mutation::differential(base, a, b, s.km)
                }
            }
            _ => {
                let mutant = mutation::differential(base, a, b, s.km);
                mutation::binomial_crossover(rng, parent, &mutant, s.cr, self.free)
            }
        };

        mutation::repair(&mut trial, self.bounds);
        trial
    }
}
