use anyhow::{Context, Result};
use clap::Args;
use deltaf_core::io::source::load_series;

use super::args::TableArgs;

#[derive(Args)]
pub struct InfoArgs {
    #[command(flatten)]
    pub table: TableArgs,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let loaded = load_series(&args.table.source(), &args.table.timing())
        .with_context(|| format!("Failed to load {}", args.table.file.display()))?;
    let series = &loaded.series;
    let (first, last) = series.time.span();
    let unit = series.time.unit().abbreviation();

    println!("File:        {}", args.table.file.display());
    println!("Frames:      {}", series.n_frames());
    println!("Channels:    {}", series.n_channels());
    println!("Time:        {first:.3} - {last:.3} {unit}");
    println!("Labels:      {}", series.labels.join(", "));

    Ok(())
}
