use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io;
use tracing::info;
use xrrfit::data::{loader, ReflectivityCurve};
use xrrfit::error::XrrResult;
use xrrfit::model::LayerStack;

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// First angle (degrees)
    #[arg(long, default_value_t = 0.0)]
    pub from: f64,
    /// Last angle (degrees)
    #[arg(long, default_value_t = 5.0)]
    pub to: f64,
    #[arg(long, default_value_t = 2000)]
    pub points: usize,
    /// Add Poisson noise, one photon having this linear intensity
    #[arg(long)]
    pub photons: Option<f64>,
    #[arg(short = 'S', long)]
    pub seed: Option<u64>,
    /// Write intensities in dB
    #[arg(long, default_value_t = false)]
    pub db: bool,
    /// Output CSV, stdout if omitted
    #[arg(short, long)]
    pub out: Option<String>,
}

pub fn run(args: SimulateArgs, stack: &LayerStack) -> XrrResult<()> {
    let angles = ReflectivityCurve::angle_grid(args.from, args.to, args.points);
    let mut curve = ReflectivityCurve::simulate(angles, stack);

    if let Some(photon) = args.photons {
        let mut rng = if let Some(s) = args.seed {
            StdRng::seed_from_u64(s)
        } else {
            StdRng::from_entropy()
        };
        curve = curve.with_noise(photon, &mut rng)?;
    }

    let values = if args.db {
        curve.to_db()
    } else {
        curve.intensity.clone()
    };
    let column = if args.db { "intensity_db" } else { "intensity" };

    let index = (loader::ANGLE_COLUMN, curve.angles.as_slice());
    let columns = [(column, values.as_slice())];
    match &args.out {
        Some(path) => {
            loader::save_columns(path, index, &columns)?;
            info!("Wrote {} points to {}", curve.len(), path);
        }
        None => loader::write_columns(io::stdout().lock(), index, &columns)?,
    }
    Ok(())
}
