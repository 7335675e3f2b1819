//! CLI frontend for the sd stock-and-flow simulation engine.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sd",
    about = "sd: run and inspect stock-and-flow simulations",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Knobs shared by every command that runs the model.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Days to simulate (50..=520)
    #[arg(long, default_value = "100")]
    duration: f64,

    /// Days per tick (1..=2)
    #[arg(long, default_value = "1")]
    time_step: f64,

    /// Override a live parameter before the run, e.g. --set contacts=4
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = commands::parse_assignment)]
    overrides: Vec<(String, f64)>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the epidemic model and print the stocks
    Run {
        #[command(flatten)]
        run: RunArgs,

        /// Print a row every this many ticks
        #[arg(short, long, default_value = "10")]
        every: u64,

        /// Show the full event log
        #[arg(short, long)]
        verbose: bool,
    },

    /// List the model's parameters and their ranges
    Params,

    /// Print the resolved evaluation order
    Order,

    /// Run the model and export every logged series
    Export {
        /// Output format: json, csv
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        run: RunArgs,
    },
}

fn main() {
    // Quiet by default; RUST_LOG overrides.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_secs()
        .try_init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            run,
            every,
            verbose,
        } => commands::run::run(&run, every, verbose),
        Commands::Params => commands::params::run(),
        Commands::Order => commands::order::run(),
        Commands::Export {
            format,
            output,
            run,
        } => commands::export::run(&run, &format, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
