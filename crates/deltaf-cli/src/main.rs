mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "deltaf", about = "Fluorescence dF/F analysis tool")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the frames, channels and time span of a table
    Info(commands::info::InfoArgs),
    /// Normalize a table to percent change from baseline
    Delta(commands::delta::DeltaArgs),
    /// Normalize a table and aggregate channels by label group
    Group(commands::group::GroupArgs),
    /// Run the full analysis from a config file
    Run(commands::pipeline::RunArgs),
    /// Run the analysis in every experiment folder
    Batch(commands::batch::BatchArgs),
    /// Print or save a default config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Delta(args) => commands::delta::run(args),
        Commands::Group(args) => commands::group::run(args),
        Commands::Run(args) => commands::pipeline::run(args),
        Commands::Batch(args) => commands::batch::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
