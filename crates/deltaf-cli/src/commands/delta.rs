use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use deltaf_core::pipeline::run_pipeline_quiet;

use super::args::{build_config, NormalizeArgs, TableArgs};
use crate::summary::print_output_summary;

#[derive(Args)]
pub struct DeltaArgs {
    #[command(flatten)]
    pub table: TableArgs,

    #[command(flatten)]
    pub normalize: NormalizeArgs,

    /// Output delta table
    #[arg(short, long, default_value = "dff.csv")]
    pub output: PathBuf,
}

pub fn run(args: &DeltaArgs) -> Result<()> {
    let config = build_config(&args.table, &args.normalize, None, &args.output, None)?;

    println!("Normalizing {}", args.table.file.display());
    let output = run_pipeline_quiet(&config)
        .with_context(|| format!("Failed to normalize {}", args.table.file.display()))?;

    if let Some(response) = &output.response {
        for (label, value) in output.series.labels.iter().zip(response) {
            println!("  {label:<20}{value:>10.2} %");
        }
    }
    print_output_summary(&output);
    Ok(())
}
