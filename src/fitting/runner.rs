use super::FitProblem;
use crate::config::FitConfig;
use crate::data::ReflectivityCurve;
use crate::error::{XrrError, XrrResult};
use crate::fitness::FitnessNorm;
use crate::model::LayerStack;
use crate::optimizer::{DeOptimizer, DeSettings};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Cooperative stop flag, checked between generations only.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Termination {
    /// Stop after this many generations.
    Iterations(usize),
    /// Stop once `worst / best - 1 < 10^-figures`.
    Autostop { figures: u32 },
}

impl Termination {
    pub fn from_config(cfg: &FitConfig) -> Self {
        if cfg.fit.autostop {
            Termination::Autostop {
                figures: cfg.fit.autostop_figures,
            }
        } else {
            Termination::Iterations(cfg.fit.iterations)
        }
    }
}

/// Relative spread test of the autostop policy. A population whose worst
/// equals its best has converged regardless of scale.
pub fn converged(best: f64, worst: f64, figures: u32) -> bool {
    if worst <= best {
        return true;
    }
    worst / best - 1.0 < 0.1f64.powi(figures as i32)
}

/// State after one generation.
#[derive(Debug, Clone)]
pub struct FitProgress {
    pub iteration: usize,
    pub best: f64,
    pub median: f64,
    pub worst: f64,
    pub parameters: Vec<f64>,
    /// Session stack with the best parameters applied.
    pub stack: LayerStack,
}

impl FitProgress {
    pub fn message(&self) -> String {
        format!(
            "iteration = {}, bestfit = {:.4e}, medianfit = {:.4e}",
            self.iteration, self.best, self.median
        )
    }
}

pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, progress: &FitProgress);
}

impl<F> ProgressCallback for F
where
    F: Fn(&FitProgress) + Send + Sync,
{
    fn on_progress(&self, progress: &FitProgress) {
        self(progress)
    }
}

#[derive(Debug, Clone)]
pub struct FitReport {
    pub stack: LayerStack,
    pub parameters: Vec<f64>,
    pub best: f64,
    pub iterations: usize,
    pub elapsed: Duration,
    /// Human readable summary, present when performance reporting is on.
    pub performance: Option<String>,
}

#[derive(Debug)]
pub enum FitOutcome {
    Converged(FitReport),
    IterationsExhausted(FitReport),
    Cancelled(FitReport),
    /// The run aborted; `last_progress` is the last complete generation.
    Failed {
        error: XrrError,
        last_progress: Option<FitProgress>,
    },
}

impl FitOutcome {
    pub fn report(&self) -> Option<&FitReport> {
        match self {
            FitOutcome::Converged(r)
            | FitOutcome::IterationsExhausted(r)
            | FitOutcome::Cancelled(r) => Some(r),
            FitOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, FitOutcome::Failed { .. })
    }
}

/// Drives one optimizer over generations and keeps a private stack copy up
/// to date with the best parameters.
pub struct FittingSession {
    optimizer: DeOptimizer<FitProblem>,
    stack: LayerStack,
    termination: Termination,
    report_perf: bool,
    started: Instant,
    last_progress: Option<FitProgress>,
}

impl FittingSession {
    /// Validates the data, then creates the worker pool and the optimizer.
    ///
    /// Insufficient data is reported before any thread is spawned.
    pub fn new(
        stack: &LayerStack,
        measured: &ReflectivityCurve,
        config: &FitConfig,
    ) -> XrrResult<Self> {
        config.validate()?;
        let norm = FitnessNorm::from_settings(
            config.norm.norm,
            config.norm.pnorm,
            config.norm.threshold_db,
        )?;
        let problem = FitProblem::new(
            stack,
            measured,
            norm,
            config.fit.first_angle,
            config.fit.last_angle,
        )?;
        let settings = DeSettings::from(config);
        settings.validate()?;

        let num_threads = config.fit.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        });
        let pool = Arc::new(
            rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build()?,
        );
        info!(
            "Fitting {} points with {} ({} norm), {} individuals on {} threads",
            problem.measured().len(),
            settings.algorithm,
            norm.kind(),
            settings.popsize,
            num_threads
        );

        Self::with_problem(
            problem,
            settings,
            pool,
            Termination::from_config(config),
            config.advanced.report_perf,
        )
    }

    /// Lower level constructor for callers that build their own problem/pool.
    pub fn with_problem(
        problem: FitProblem,
        settings: DeSettings,
        pool: Arc<rayon::ThreadPool>,
        termination: Termination,
        report_perf: bool,
    ) -> XrrResult<Self> {
        let started = Instant::now();
        let stack = problem.stack().clone();
        let bounds = problem.bounds();
        let optimizer = DeOptimizer::new(bounds, problem, settings, pool)?;

        let mut session = Self {
            optimizer,
            stack,
            termination,
            report_perf,
            started,
            last_progress: None,
        };
        session.last_progress = Some(session.snapshot());
        Ok(session)
    }

    fn snapshot(&mut self) -> FitProgress {
        let best = self.optimizer.best().params().to_vec();
        self.stack.apply_parameters(&best);
        let stats = self.optimizer.stats();
        FitProgress {
            iteration: self.optimizer.generation(),
            best: stats.best,
            median: stats.median,
            worst: stats.worst,
            parameters: best,
            stack: self.stack.clone(),
        }
    }

    /// Advances one generation and publishes the new best stack.
    pub fn step(&mut self) -> XrrResult<FitProgress> {
        self.optimizer.advance()?;
        let progress = self.snapshot();
        debug!("{}", progress.message());
        self.last_progress = Some(progress.clone());
        Ok(progress)
    }

    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    pub fn optimizer(&self) -> &DeOptimizer<FitProblem> {
        &self.optimizer
    }

    pub fn last_progress(&self) -> Option<&FitProgress> {
        self.last_progress.as_ref()
    }

    fn should_stop(&self, progress: &FitProgress) -> bool {
        match self.termination {
            Termination::Iterations(n) => progress.iteration >= n,
            Termination::Autostop { figures } => {
                converged(progress.best, progress.worst, figures)
            }
        }
    }

    fn report(&self) -> FitReport {
        let elapsed = self.started.elapsed();
        let best = self.optimizer.stats().best;
        let iterations = self.optimizer.generation();
        let performance = self.report_perf.then(|| {
            format!(
                "Fitting took {:.2} seconds and {} iterations to obtain fitting error value {:.4e}",
                elapsed.as_secs_f64(),
                iterations,
                best
            )
        });
        FitReport {
            stack: self.stack.clone(),
            parameters: self.optimizer.best().params().to_vec(),
            best,
            iterations,
            elapsed,
            performance,
        }
    }

    /// Runs until the termination policy or `cancel` stops it.
    ///
    /// `cancel` is only looked at between generations; a generation in
    /// flight always completes.
    pub fn run<CB: ProgressCallback>(mut self, cancel: &CancelToken, callback: CB) -> FitOutcome {
        loop {
            if cancel.is_cancelled() {
                info!("Fit cancelled after {} iterations", self.optimizer.generation());
                return FitOutcome::Cancelled(self.report());
            }

            let progress = match self.step() {
                Ok(p) => p,
                Err(error) => {
                    warn!("Fit aborted: {}", error);
                    return FitOutcome::Failed {
                        error,
                        last_progress: self.last_progress.take(),
                    };
                }
            };
            callback.on_progress(&progress);

            if self.should_stop(&progress) {
                let report = self.report();
                if let Some(summary) = &report.performance {
                    info!("{}", summary);
                }
                return match self.termination {
                    Termination::Iterations(_) => FitOutcome::IterationsExhausted(report),
                    Termination::Autostop { .. } => FitOutcome::Converged(report),
                };
            }
        }
    }
}
