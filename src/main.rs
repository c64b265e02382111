use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use std::process;
use tracing::{error, info, Level};
use xrrfit::model::LayerStack;
use xrrfit::optics::BuiltinTable;

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Layer model (JSON)
    #[arg(global = true, short, long, default_value = "model.json")]
    model: String,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the simulated reflectivity of the model
    Simulate(cmd::simulate::SimulateArgs),
    /// Fit the model to a measured curve
    Fit(cmd::fit::FitArgs),
    /// Write the depth profile of the model
    Profile(cmd::profile::ProfileArgs),
}

fn main() {
    // Raw matches tell explicit flags apart from defaults.
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    info!("Loading model: {}", cli.model);
    let stack = LayerStack::load_from_file(&cli.model, &BuiltinTable).unwrap_or_else(|e| {
        error!("Cannot load model {}: {}", cli.model, e);
        process::exit(1);
    });

    let result = match cli.command {
        Commands::Simulate(args) => cmd::simulate::run(args, &stack),
        Commands::Profile(args) => cmd::profile::run(args, &stack),
        Commands::Fit(args) => {
            let sub_matches = matches
                .subcommand_matches("fit")
                .cloned()
                .unwrap_or_default();
            match cmd::fit::run(args, &stack, &sub_matches) {
                Ok(true) => Ok(()),
                Ok(false) => process::exit(1),
                Err(e) => Err(e),
            }
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        process::exit(1);
    }
}
