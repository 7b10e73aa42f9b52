use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use deltaf_core::group::GroupingConfig;
use deltaf_core::pipeline::config::{OutputConfig, PipelineConfig};
use deltaf_core::series::TimeWindow;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save a full default PipelineConfig as TOML.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let config = PipelineConfig {
        response: Some(TimeWindow {
            start: 30.0,
            end: 60.0,
        }),
        grouping: Some(GroupingConfig::Prefix {
            delimiter: '_',
            tokens: 1,
        }),
        output: OutputConfig {
            dir: Some(PathBuf::from("analysis")),
            ..OutputConfig::default()
        },
        ..PipelineConfig::default()
    };
    let toml_str = config.to_toml_string()?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Default config saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
