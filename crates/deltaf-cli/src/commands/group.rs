use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use deltaf_core::group::GroupingConfig;
use deltaf_core::pipeline::run_pipeline_quiet;

use super::args::{build_config, NormalizeArgs, TableArgs};
use crate::summary::print_output_summary;

#[derive(Clone, Copy, ValueEnum)]
pub enum RuleArg {
    Exact,
    Substring,
    Prefix,
}

#[derive(Args)]
pub struct GroupArgs {
    #[command(flatten)]
    pub table: TableArgs,

    #[command(flatten)]
    pub normalize: NormalizeArgs,

    /// How labels map to groups
    #[arg(long, value_enum, default_value = "prefix")]
    pub rule: RuleArg,

    /// Substring pattern (repeatable)
    #[arg(long = "pattern")]
    pub patterns: Vec<String>,

    /// Label delimiter for the prefix rule
    #[arg(long, default_value = "_")]
    pub split_on: char,

    /// Number of leading label tokens forming the group key
    #[arg(long, default_value = "1")]
    pub tokens: usize,

    /// Output delta table
    #[arg(short, long, default_value = "dff.csv")]
    pub output: PathBuf,

    /// Output group table, written next to the delta table
    #[arg(long, default_value = "dff-groups.csv")]
    pub groups_output: String,
}

impl GroupArgs {
    fn grouping(&self) -> Result<GroupingConfig> {
        Ok(match self.rule {
            RuleArg::Exact => GroupingConfig::Exact,
            RuleArg::Substring => {
                if self.patterns.is_empty() {
                    anyhow::bail!("--rule substring needs at least one --pattern");
                }
                GroupingConfig::Substring {
                    patterns: self.patterns.clone(),
                }
            }
            RuleArg::Prefix => GroupingConfig::Prefix {
                delimiter: self.split_on,
                tokens: self.tokens,
            },
        })
    }
}

pub fn run(args: &GroupArgs) -> Result<()> {
    let config = build_config(
        &args.table,
        &args.normalize,
        Some(args.grouping()?),
        &args.output,
        Some(args.groups_output.clone()),
    )?;

    println!("Grouping {}", args.table.file.display());
    let output = run_pipeline_quiet(&config)
        .with_context(|| format!("Failed to group {}", args.table.file.display()))?;

    print_output_summary(&output);
    Ok(())
}
