use std::fmt;
use std::path::{Path, PathBuf};

use ndarray::Array3;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DeltaError, Result};
use crate::io::cache::{ArrayCache, CacheStatus};
use crate::io::stack::{list_frames, read_stack, timestamps_from_filenames};
use crate::io::table::{load_table, TableOptions};
use crate::normalize::{label_warnings, ratio_matrix, ZeroBaselineWarning};
use crate::roi::{roi_traces, NamedRoi, Roi};
use crate::series::{IntensityMatrix, Series, TimeAxis, TimeUnit};

/// Name of the per-folder directory holding cached stacks.
pub const CACHE_DIR_NAME: &str = ".deltaf";

/// Where per-frame times come from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeSource {
    /// Fixed frame period, in the axis unit.
    Period { period: f64 },
    /// Timestamps in the table's first column, recorded in `unit`.
    Column {
        #[serde(default)]
        unit: TimeUnit,
    },
    /// Timestamps in seconds encoded as frame file names.
    Filenames,
}

impl fmt::Display for TimeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Period { period } => write!(f, "Period ({period} per frame)"),
            Self::Column { unit } => write!(f, "Time column ({unit})"),
            Self::Filenames => write!(f, "File names"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    /// Unit of the resulting time axis.
    #[serde(default)]
    pub unit: TimeUnit,
    pub source: TimeSource,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            unit: TimeUnit::Seconds,
            source: TimeSource::Period { period: 1.0 },
        }
    }
}

/// A folder of single-frame TIFFs reduced to per-ROI traces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StackSource {
    pub folder: PathBuf,
    /// File-name pattern selecting the signal channel, e.g. `_Ch2_`.
    pub channel: String,
    /// File-name pattern of a reference channel; when set, traces become signal / reference.
    #[serde(default)]
    pub ratio_to: Option<String>,
    pub rois: Vec<NamedRoi>,
    /// Reuse decoded stacks from `<folder>/.deltaf` while the frame count is unchanged.
    #[serde(default = "default_cache")]
    pub cache: bool,
}

fn default_cache() -> bool {
    true
}

/// Raw input of one recording.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeriesSource {
    Table {
        path: PathBuf,
        #[serde(default)]
        options: TableOptions,
    },
    Stack(StackSource),
}

impl SeriesSource {
    /// Copy with relative paths joined onto `base`.
    pub fn resolved(&self, base: &Path) -> Self {
        match self {
            Self::Table { path, options } => Self::Table {
                path: base.join(path),
                options: options.clone(),
            },
            Self::Stack(stack) => Self::Stack(StackSource {
                folder: base.join(&stack.folder),
                ..stack.clone()
            }),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Table { path, .. } => path,
            Self::Stack(stack) => &stack.folder,
        }
    }
}

/// A loaded series plus what happened while loading it.
#[derive(Clone, Debug)]
pub struct LoadedSeries {
    pub series: Series,
    /// Zero denominators replaced while forming a ratio.
    pub warnings: Vec<ZeroBaselineWarning>,
    /// Cache outcome per stack read, in read order.
    pub cache: Vec<CacheStatus>,
}

/// Load a recording into a time axis, intensity matrix, and channel labels.
pub fn load_series(source: &SeriesSource, timing: &Timing) -> Result<LoadedSeries> {
    match source {
        SeriesSource::Table { path, options } => {
            let raw = load_table(path, options)?;
            let time = match &timing.source {
                TimeSource::Period { period } => {
                    TimeAxis::from_period(*period, raw.data.nrows(), timing.unit)?
                }
                TimeSource::Column { unit } => {
                    let times = raw.times.as_deref().ok_or_else(|| {
                        DeltaError::Config(
                            "time column requested but the table's first column is not 'time'"
                                .into(),
                        )
                    })?;
                    TimeAxis::from_timestamps(times, *unit, timing.unit)?
                }
                TimeSource::Filenames => {
                    return Err(DeltaError::Config(
                        "file-name timestamps need an image stack source".into(),
                    ))
                }
            };
            let series = Series::new(time, IntensityMatrix::new(raw.data), raw.labels)?;
            Ok(LoadedSeries {
                series,
                warnings: Vec::new(),
                cache: Vec::new(),
            })
        }
        SeriesSource::Stack(stack) => load_stack_series(stack, timing),
    }
}

fn load_stack_series(source: &StackSource, timing: &Timing) -> Result<LoadedSeries> {
    let cache = source
        .cache
        .then(|| ArrayCache::new(source.folder.join(CACHE_DIR_NAME)));
    let mut statuses = Vec::new();
    let rois: Vec<Roi> = source.rois.iter().map(|r| r.region.clone()).collect();
    let labels: Vec<String> = source.rois.iter().map(|r| r.name.clone()).collect();

    let frames = list_frames(&source.folder, &source.channel)?;
    if frames.is_empty() {
        return Err(DeltaError::InvalidParameter(format!(
            "no frames matching '{}' in {}",
            source.channel,
            source.folder.display()
        )));
    }
    let signal = read_channel(&frames, &source.channel, cache.as_ref(), &mut statuses)?;
    let mut matrix = roi_traces(&signal, &rois)?;
    let mut warnings = Vec::new();

    if let Some(pattern) = &source.ratio_to {
        let reference_frames = list_frames(&source.folder, pattern)?;
        if reference_frames.len() != frames.len() {
            return Err(DeltaError::ShapeMismatch {
                expected: format!("{} '{}' frames", frames.len(), source.channel),
                actual: format!("{} '{}' frames", reference_frames.len(), pattern),
            });
        }
        let reference = read_channel(&reference_frames, pattern, cache.as_ref(), &mut statuses)?;
        let reference = roi_traces(&reference, &rois)?;
        let (ratio, ratio_warnings) = ratio_matrix(&matrix, &reference)?;
        matrix = ratio;
        warnings = ratio_warnings;
        label_warnings(&mut warnings, &labels);
    }

    let time = match &timing.source {
        TimeSource::Period { period } => TimeAxis::from_period(*period, frames.len(), timing.unit)?,
        TimeSource::Filenames => {
            let stamps = timestamps_from_filenames(&frames)?;
            TimeAxis::from_timestamps(&stamps, TimeUnit::Seconds, timing.unit)?
        }
        TimeSource::Column { .. } => {
            return Err(DeltaError::Config(
                "a time column needs a table source".into(),
            ))
        }
    };

    info!(
        folder = %source.folder.display(),
        frames = frames.len(),
        rois = rois.len(),
        ratio = source.ratio_to.is_some(),
        "Stack reduced to ROI traces"
    );

    Ok(LoadedSeries {
        series: Series::new(time, matrix, labels)?,
        warnings,
        cache: statuses,
    })
}

fn read_channel(
    frames: &[PathBuf],
    pattern: &str,
    cache: Option<&ArrayCache>,
    statuses: &mut Vec<CacheStatus>,
) -> Result<Array3<f64>> {
    match cache {
        Some(cache) => {
            let key = format!("stack{pattern}");
            let (stack, status) = cache.load_or_compute(&key, || read_stack(frames), frames.len())?;
            statuses.push(status);
            Ok(stack)
        }
        None => read_stack(frames),
    }
}
