use crate::reports;
use clap::{ArgMatches, Args};
use std::fs;
use std::thread;
use std::time::Duration;
use tracing::info;
use xrrfit::config::FitConfig;
use xrrfit::data::loader;
use xrrfit::error::XrrResult;
use xrrfit::fitting::{CancelToken, FitOutcome, FitProgress, FittingSession};
use xrrfit::model::LayerStack;

#[derive(Args, Debug, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub config: FitConfig,

    /// Measured curve, `angle_deg,intensity` CSV
    #[arg(short, long)]
    pub data: String,

    /// Measured intensities are in dB
    #[arg(long, default_value_t = false)]
    pub db: bool,

    /// JSON fit settings; explicit flags override it
    #[arg(long)]
    pub settings: Option<String>,

    /// Stop after this many seconds
    #[arg(short = 'T', long)]
    pub time: Option<u64>,

    /// Print progress every N generations
    #[arg(long, default_value_t = 10)]
    pub report_every: usize,

    /// Where to write the fitted model (JSON)
    #[arg(short, long)]
    pub out: Option<String>,

    /// Where to write measured and fitted curves (CSV)
    #[arg(long)]
    pub curve_out: Option<String>,
}

/// Exit status: Ok(true) when the fit produced a result.
pub fn run(args: FitArgs, stack: &LayerStack, matches: &ArgMatches) -> XrrResult<bool> {
    let config = match &args.settings {
        Some(path) => {
            info!("Loading fit settings from {}", path);
            let mut file_config = FitConfig::load_from_file(path)?;
            file_config.merge_from_cli(&args.config, matches);
            file_config
        }
        None => args.config.clone(),
    };

    let measured = loader::load_curve(&args.data, args.db)?;
    info!("Loaded {} points from {}", measured.len(), args.data);

    reports::print_stack("Initial model", stack);

    let session = FittingSession::new(stack, &measured, &config)?;
    let cancel = CancelToken::new();
    if let Some(secs) = args.time {
        let token = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(secs));
            token.cancel();
        });
    }

    let every = args.report_every.max(1);
    let outcome = session.run(&cancel, move |p: &FitProgress| {
        if p.iteration % every == 0 {
            println!(
                "Gen {:5} | Best: {:.4e} | Median: {:.4e} | Worst: {:.4e}",
                p.iteration, p.best, p.median, p.worst
            );
        }
    });

    reports::print_outcome(stack, &outcome);

    let report = match &outcome {
        FitOutcome::Failed { .. } => return Ok(false),
        _ => outcome.report(),
    };
    if let Some(report) = report {
        if let Some(path) = &args.out {
            fs::write(path, report.stack.to_json()?)?;
            info!("Wrote fitted model to {}", path);
        }
        if let Some(path) = &args.curve_out {
            let cropped = measured.crop(config.fit.first_angle, config.fit.last_angle);
            let fitted = xrrfit::simulator::simulate_degrees(&cropped.angles, &report.stack);
            loader::save_columns(
                path,
                (loader::ANGLE_COLUMN, cropped.angles.as_slice()),
                &[
                    ("measured", cropped.intensity.as_slice()),
                    ("fitted", fitted.as_slice()),
                ],
            )?;
            info!("Wrote curves to {}", path);
        }
    }
    Ok(true)
}
