use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use deltaf_core::group::GroupingConfig;
use deltaf_core::io::source::{SeriesSource, TimeSource, Timing};
use deltaf_core::io::table::{FirstColumn, TableOptions};
use deltaf_core::normalize::{DeltaConfig, DeltaMethod};
use deltaf_core::pipeline::config::{BaselineConfig, OutputConfig, PipelineConfig};
use deltaf_core::series::{TimeUnit, TimeWindow};

#[derive(Clone, Copy, ValueEnum)]
pub enum FirstColumnArg {
    FrameIndex,
    Time,
    Channel,
}

impl From<FirstColumnArg> for FirstColumn {
    fn from(arg: FirstColumnArg) -> Self {
        match arg {
            FirstColumnArg::FrameIndex => Self::FrameIndex,
            FirstColumnArg::Time => Self::Time,
            FirstColumnArg::Channel => Self::Channel,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum UnitArg {
    Sec,
    Min,
}

impl From<UnitArg> for TimeUnit {
    fn from(arg: UnitArg) -> Self {
        match arg {
            UnitArg::Sec => Self::Seconds,
            UnitArg::Min => Self::Minutes,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MethodArg {
    /// Mean baseline, (F / F0 - 1) * 100
    Ratio,
    /// Percentile baseline on a ratio signal
    Percentile,
}

/// Where to read a table and how to build its time axis.
#[derive(Args)]
pub struct TableArgs {
    /// Input intensity table (CSV or other delimited text)
    pub file: PathBuf,

    /// Field delimiter
    #[arg(long, default_value = ",")]
    pub delimiter: char,

    /// Meaning of the first column
    #[arg(long, value_enum, default_value = "frame-index")]
    pub first_column: FirstColumnArg,

    /// Frame period, ignored with --time-column
    #[arg(long, default_value = "1.0")]
    pub period: f64,

    /// Take times from the first column (requires --first-column time)
    #[arg(long)]
    pub time_column: bool,

    /// Unit of times stored in the first column
    #[arg(long, value_enum, default_value = "sec")]
    pub column_unit: UnitArg,

    /// Unit of the resulting time axis
    #[arg(long, value_enum, default_value = "sec")]
    pub unit: UnitArg,
}

impl TableArgs {
    pub fn source(&self) -> SeriesSource {
        SeriesSource::Table {
            path: self.file.clone(),
            options: TableOptions {
                delimiter: self.delimiter,
                first_column: self.first_column.into(),
            },
        }
    }

    pub fn timing(&self) -> Timing {
        let source = if self.time_column {
            TimeSource::Column {
                unit: self.column_unit.into(),
            }
        } else {
            TimeSource::Period {
                period: self.period,
            }
        };
        Timing {
            unit: self.unit.into(),
            source,
        }
    }
}

/// Baseline and normalization options.
#[derive(Args)]
pub struct NormalizeArgs {
    /// Baseline window start, in the axis unit
    #[arg(long, allow_hyphen_values = true)]
    pub baseline_start: Option<f64>,

    /// Baseline window end (exclusive)
    #[arg(long)]
    pub baseline_end: Option<f64>,

    /// Experiment tag file to take the baseline from instead
    #[arg(long, conflicts_with_all = ["baseline_start", "baseline_end"])]
    pub tags: Option<PathBuf>,

    /// Normalization method
    #[arg(long, value_enum, default_value = "ratio")]
    pub method: MethodArg,

    /// Baseline percentile for the percentile method
    #[arg(long, default_value = "20")]
    pub percentile: f64,

    /// Channel index every channel is divided by before the percentile method
    #[arg(long)]
    pub denominator: Option<usize>,

    /// Channel index whose delta is subtracted from all others
    #[arg(long)]
    pub reference: Option<usize>,

    /// Average blocks of this many frames first
    #[arg(long)]
    pub bin: Option<usize>,

    /// Response window as START,END
    #[arg(long, value_parser = parse_window)]
    pub response: Option<TimeWindow>,
}

impl NormalizeArgs {
    pub fn baseline(&self) -> anyhow::Result<BaselineConfig> {
        if let Some(path) = &self.tags {
            return Ok(BaselineConfig::Tags { path: path.clone() });
        }
        match (self.baseline_start, self.baseline_end) {
            (Some(start), Some(end)) => Ok(BaselineConfig::Window { start, end }),
            _ => anyhow::bail!("Provide --baseline-start and --baseline-end, or --tags"),
        }
    }

    pub fn delta(&self) -> DeltaConfig {
        let method = match self.method {
            MethodArg::Ratio => DeltaMethod::RatioPercent,
            MethodArg::Percentile => DeltaMethod::SubtractThenRatio {
                denominator: self.denominator,
            },
        };
        DeltaConfig {
            method,
            percentile: self.percentile,
            reference: self.reference,
        }
    }
}

fn parse_window(text: &str) -> Result<TimeWindow, String> {
    let (start, end) = text
        .split_once(',')
        .ok_or_else(|| format!("expected START,END, got '{text}'"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid bound '{s}': {e}"))
    };
    TimeWindow::new(parse(start)?, parse(end)?).map_err(|e| e.to_string())
}

/// Assemble a pipeline config whose delta table is written to `output`.
pub fn build_config(
    table: &TableArgs,
    normalize: &NormalizeArgs,
    grouping: Option<GroupingConfig>,
    output: &Path,
    groups_name: Option<String>,
) -> anyhow::Result<PipelineConfig> {
    let defaults = OutputConfig::default();
    let (dir, delta_name) = split_output(output, &defaults.delta_name);
    Ok(PipelineConfig {
        source: table.source(),
        timing: table.timing(),
        baseline: normalize.baseline()?,
        delta: normalize.delta(),
        bin: normalize.bin,
        response: normalize.response,
        grouping,
        output: OutputConfig {
            dir: Some(dir),
            delta_name,
            groups_name: groups_name.unwrap_or(defaults.groups_name),
        },
    })
}

/// Split an output file path into directory and file name.
fn split_output(output: &Path, fallback: &str) -> (PathBuf, String) {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| fallback.to_string());
    (dir, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window() {
        let w = parse_window("30, 60").unwrap();
        assert_eq!((w.start, w.end), (30.0, 60.0));
        assert!(parse_window("60,30").is_err());
        assert!(parse_window("30").is_err());
    }

    #[test]
    fn test_split_output() {
        let (dir, name) = split_output(Path::new("dff.csv"), "x.csv");
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, "dff.csv");
        let (dir, name) = split_output(Path::new("out/run1.csv"), "x.csv");
        assert_eq!(dir, PathBuf::from("out"));
        assert_eq!(name, "run1.csv");
    }
}
