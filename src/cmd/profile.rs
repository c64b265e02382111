use clap::Args;
use std::io;
use xrrfit::data::loader;
use xrrfit::error::XrrResult;
use xrrfit::model::LayerStack;
use xrrfit::simulator::profile::{depth_profile, depths, ProfileProperty};

#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    #[arg(long, default_value_t = 500)]
    pub points: usize,
    #[arg(long, default_value_t = ProfileProperty::Density)]
    pub property: ProfileProperty,
    /// Ignore interface roughness
    #[arg(long, default_value_t = false)]
    pub stair: bool,
    #[arg(short, long)]
    pub out: Option<String>,
}

pub fn run(args: ProfileArgs, stack: &LayerStack) -> XrrResult<()> {
    let ds = depths(args.points, stack);
    let values = depth_profile(&ds, stack, args.stair, args.property);
    let depth_nm: Vec<f64> = ds.iter().map(|d| d * 1e9).collect();
    let name = args.property.to_string();
    let index = ("depth_nm", depth_nm.as_slice());
    let columns = [(name.as_str(), values.as_slice())];

    match &args.out {
        Some(path) => loader::save_columns(path, index, &columns),
        None => loader::write_columns(io::stdout().lock(), index, &columns),
    }
}
