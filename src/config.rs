use crate::error::{XrrError, XrrResult};
use crate::fitness::NormKind;
use crate::optimizer::{Algorithm, BaseVector};
use clap::{parser::ValueSource, ArgMatches, Args};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Args, Debug, Clone, Serialize, Deserialize, Default)]
pub struct FitConfig {
    #[command(flatten)]
    #[serde(default)]
    pub fit: FitParams,
    #[command(flatten)]
    #[serde(default)]
    pub norm: NormParams,
    #[command(flatten)]
    #[serde(default)]
    pub advanced: AdvancedFitOptions,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitParams {
    /// Population size
    #[arg(long, default_value_t = 40)]
    pub popsize: usize,
    /// Generations to run unless autostop is set
    #[arg(long, default_value_t = 200)]
    pub iterations: usize,
    /// Stop once the population spread is below 10^-figures
    #[arg(long, default_value_t = false)]
    pub autostop: bool,
    #[arg(long, default_value_t = 3)]
    pub autostop_figures: u32,
    #[arg(long, default_value_t = Algorithm::De)]
    pub algorithm: Algorithm,
    #[arg(long, default_value_t = BaseVector::Rand)]
    pub base: BaseVector,
    /// First angle of the fit range (degrees)
    #[arg(long, default_value_t = 0.0)]
    pub first_angle: f64,
    /// Last angle of the fit range (degrees)
    #[arg(long, default_value_t = 90.0)]
    pub last_angle: f64,
    /// Worker threads, defaults to available parallelism
    #[arg(long)]
    pub threads: Option<usize>,
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            popsize: 40,
            iterations: 200,
            autostop: false,
            autostop_figures: 3,
            algorithm: Algorithm::De,
            base: BaseVector::Rand,
            first_angle: 0.0,
            last_angle: 90.0,
            threads: None,
            seed: None,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormParams {
    #[arg(long, default_value_t = NormKind::RelChi2)]
    pub norm: NormKind,
    /// Exponent of the power mean
    #[arg(long, default_value_t = 2.0)]
    pub pnorm: f64,
    /// Switch point of the relchi2 transform (dB)
    #[arg(long, default_value_t = -70.0, allow_negative_numbers = true)]
    pub threshold_db: f64,
}

impl Default for NormParams {
    fn default() -> Self {
        Self {
            norm: NormKind::RelChi2,
            pnorm: 2.0,
            threshold_db: -70.0,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedFitOptions {
    /// Mutation factor
    #[arg(long, default_value_t = 0.7)]
    pub km: f64,
    /// Recombination factor, defaults to (km + 1) / 2
    #[arg(long)]
    pub kr: Option<f64>,
    /// Probability of the recombination step in either-or mode
    #[arg(long, default_value_t = 0.5)]
    pub pm: f64,
    /// Crossover probability
    #[arg(long, default_value_t = 0.5)]
    pub cr: f64,
    /// Generations between covariance updates (covde)
    #[arg(long, default_value_t = 1)]
    pub cov_period: usize,
    #[arg(long, default_value_t = false)]
    pub report_perf: bool,
}

impl Default for AdvancedFitOptions {
    fn default() -> Self {
        Self {
            km: 0.7,
            kr: None,
            pm: 0.5,
            cr: 0.5,
            cov_period: 1,
            report_perf: false,
        }
    }
}

impl AdvancedFitOptions {
    pub fn kr(&self) -> f64 {
        self.kr.unwrap_or(0.5 * (self.km + 1.0))
    }
}

impl FitConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> XrrResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: FitConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> XrrResult<()> {
        if self.fit.first_angle > self.fit.last_angle {
            return Err(XrrError::Config(format!(
                "Fit range [{}, {}] is empty",
                self.fit.first_angle, self.fit.last_angle
            )));
        }
        if !self.fit.autostop && self.fit.iterations == 0 {
            return Err(XrrError::Config(
                "Iteration count must be positive".to_string(),
            ));
        }
        if self.fit.threads == Some(0) {
            return Err(XrrError::Config("Thread count must be positive".to_string()));
        }
        Ok(())
    }

    /// Overwrites fields that were given explicitly on the command line.
    pub fn merge_from_cli(&mut self, cli: &FitConfig, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($group:ident . $field:ident) => {
                if matches.value_source(stringify!($field)) == Some(ValueSource::CommandLine) {
                    self.$group.$field = cli.$group.$field.clone();
                }
            };
        }

        update_if_present!(fit.popsize);
        update_if_present!(fit.iterations);
        update_if_present!(fit.autostop);
        update_if_present!(fit.autostop_figures);
        update_if_present!(fit.algorithm);
        update_if_present!(fit.base);
        update_if_present!(fit.first_angle);
        update_if_present!(fit.last_angle);
        update_if_present!(fit.threads);
        update_if_present!(fit.seed);

        update_if_present!(norm.norm);
        update_if_present!(norm.pnorm);
        update_if_present!(norm.threshold_db);

        update_if_present!(advanced.km);
        update_if_present!(advanced.kr);
        update_if_present!(advanced.pm);
        update_if_present!(advanced.cr);
        update_if_present!(advanced.cov_period);
        update_if_present!(advanced.report_perf);
    }
}
