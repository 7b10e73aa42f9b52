use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DeltaError, Result};
use crate::group::GroupingConfig;
use crate::io::source::{SeriesSource, Timing};
use crate::io::table::TableOptions;
use crate::normalize::DeltaConfig;
use crate::series::TimeWindow;

/// Default delta table file name.
pub const DELTA_CSV: &str = "dff.csv";

/// Default group statistics file name.
pub const GROUPS_CSV: &str = "dff-groups.csv";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub source: SeriesSource,
    #[serde(default)]
    pub timing: Timing,
    pub baseline: BaselineConfig,
    #[serde(default)]
    pub delta: DeltaConfig,
    /// Average non-overlapping blocks of this many frames before normalizing.
    #[serde(default)]
    pub bin: Option<usize>,
    /// Window whose per-channel mean delta is reported as the response.
    #[serde(default)]
    pub response: Option<TimeWindow>,
    #[serde(default)]
    pub grouping: Option<GroupingConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: SeriesSource::Table {
                path: PathBuf::from("results.csv"),
                options: TableOptions::default(),
            },
            timing: Timing::default(),
            baseline: BaselineConfig::Window {
                start: 0.0,
                end: 10.0,
            },
            delta: DeltaConfig::default(),
            bin: None,
            response: None,
            grouping: None,
            output: OutputConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| DeltaError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| DeltaError::Config(e.to_string()))
    }

    /// Copy with every relative path joined onto `base` (an experiment folder).
    pub fn resolved(&self, base: &Path) -> Self {
        let baseline = match &self.baseline {
            BaselineConfig::Tags { path } => BaselineConfig::Tags {
                path: base.join(path),
            },
            window => window.clone(),
        };
        Self {
            source: self.source.resolved(base),
            baseline,
            output: OutputConfig {
                dir: self.output.dir.as_ref().map(|d| base.join(d)),
                ..self.output.clone()
            },
            ..self.clone()
        }
    }
}

/// Where the baseline window comes from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BaselineConfig {
    /// Explicit bounds, in the time axis unit.
    Window { start: f64, end: f64 },
    /// The `baseline` tag of an experiment tag file (times in minutes).
    Tags { path: PathBuf },
}

impl fmt::Display for BaselineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Window { start, end } => write!(f, "[{start}, {end})"),
            Self::Tags { path } => write!(f, "tags in {}", path.display()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for output tables; nothing is written when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_delta_name")]
    pub delta_name: String,
    #[serde(default = "default_groups_name")]
    pub groups_name: String,
}

fn default_delta_name() -> String {
    DELTA_CSV.to_string()
}

fn default_groups_name() -> String {
    GROUPS_CSV.to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            delta_name: default_delta_name(),
            groups_name: default_groups_name(),
        }
    }
}
