use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use console::Style;
use deltaf_core::pipeline::run_pipeline_quiet;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{info, warn};

use super::pipeline::load_config;

#[derive(Args)]
pub struct BatchArgs {
    /// Experiment folders, or parents whose subfolders are experiments
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Config file name looked up in each experiment folder
    #[arg(long, default_value = "analysis.toml")]
    pub config_name: String,

    /// Worker threads (default: all cores)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

/// Outcome of one experiment folder.
struct FolderReport {
    folder: PathBuf,
    result: Result<usize>,
}

/// Expand `paths` into folders that hold `config_name`, sorted and deduplicated.
fn find_experiments(paths: &[PathBuf], config_name: &str) -> Result<Vec<PathBuf>> {
    let mut folders = Vec::new();
    for path in paths {
        if path.join(config_name).is_file() {
            folders.push(path.clone());
            continue;
        }
        let entries = std::fs::read_dir(path)
            .with_context(|| format!("Failed to list {}", path.display()))?;
        for entry in entries {
            let child = entry?.path();
            if child.is_dir() && child.join(config_name).is_file() {
                folders.push(child);
            }
        }
    }
    folders.sort();
    folders.dedup();
    Ok(folders)
}

fn process_folder(folder: &Path, config_name: &str) -> Result<usize> {
    let config = load_config(&folder.join(config_name), folder)?;
    let output = run_pipeline_quiet(&config)
        .with_context(|| format!("Analysis failed in {}", folder.display()))?;
    Ok(output.written.len())
}

pub fn run(args: &BatchArgs) -> Result<()> {
    let folders = find_experiments(&args.paths, &args.config_name)?;
    if folders.is_empty() {
        anyhow::bail!("No folder contains {}", args.config_name);
    }
    info!(folders = folders.len(), "Batch started");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.jobs.unwrap_or(0))
        .build()?;

    let pb = ProgressBar::new(folders.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:20} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    pb.set_message("Experiments");

    let reports: Vec<FolderReport> = pool.install(|| {
        folders
            .par_iter()
            .map(|folder| {
                let result = process_folder(folder, &args.config_name);
                if let Err(e) = &result {
                    warn!(folder = %folder.display(), error = %e, "Experiment failed");
                }
                pb.inc(1);
                FolderReport {
                    folder: folder.clone(),
                    result,
                }
            })
            .collect()
    });
    pb.finish_with_message("Done");

    let ok = Style::new().green();
    let failed = Style::new().red().bold();
    let mut failures = 0;
    println!();
    for report in &reports {
        match &report.result {
            Ok(files) => println!(
                "  {:<8}{} ({files} file(s))",
                ok.apply_to("ok"),
                report.folder.display()
            ),
            Err(e) => {
                failures += 1;
                println!(
                    "  {:<8}{}: {e:#}",
                    failed.apply_to("failed"),
                    report.folder.display()
                );
            }
        }
    }
    println!();
    println!(
        "{} of {} experiment(s) succeeded",
        reports.len() - failures,
        reports.len()
    );

    if failures > 0 {
        anyhow::bail!("{failures} experiment(s) failed");
    }
    Ok(())
}
