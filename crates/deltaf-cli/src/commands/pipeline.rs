use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use deltaf_core::pipeline::config::PipelineConfig;
use deltaf_core::pipeline::{run_pipeline, PipelineStage};
use indicatif::{ProgressBar, ProgressStyle};

use crate::summary::{print_output_summary, print_pipeline_summary};

#[derive(Args)]
pub struct RunArgs {
    /// Pipeline config file (TOML); relative paths resolve against its folder
    pub config: PathBuf,

    /// Output directory, overriding the config
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Read a config file and resolve its relative paths against `base`.
pub fn load_config(path: &Path, base: &Path) -> Result<PipelineConfig> {
    let config = PipelineConfig::load(path)
        .with_context(|| format!("Invalid pipeline config {}", path.display()))?;
    Ok(config.resolved(base))
}

/// Number of stages a config will report, for sizing the progress bar.
fn stage_count(config: &PipelineConfig) -> u64 {
    let optional = [
        config.bin.is_some_and(|f| f > 1),
        config.response.is_some(),
        config.grouping.is_some(),
        config.output.dir.is_some(),
    ];
    2 + optional.iter().filter(|&&on| on).count() as u64
}

pub fn run(args: &RunArgs) -> Result<()> {
    let base = args
        .config
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let mut config = load_config(&args.config, &base)?;
    if let Some(dir) = &args.output {
        config.output.dir = Some(dir.clone());
    }

    print_pipeline_summary(&config);

    let pb = ProgressBar::new(stage_count(&config));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:20} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );

    let bar = pb.clone();
    let output = run_pipeline(&config, move |stage: PipelineStage| {
        bar.set_message(stage.to_string());
        bar.inc(1);
    })
    .with_context(|| format!("Pipeline failed for {}", args.config.display()))?;

    pb.finish_with_message("Done");
    println!();
    print_output_summary(&output);

    Ok(())
}
