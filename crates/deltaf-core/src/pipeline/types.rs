use std::path::PathBuf;

use crate::group::GroupMap;
use crate::io::cache::CacheStatus;
use crate::normalize::{DeltaOutput, ZeroBaselineWarning};
use crate::series::{Series, TimeWindow};

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Loading,
    Binning,
    Normalizing,
    Measuring,
    Aggregating,
    Writing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "Loading series"),
            Self::Binning => write!(f, "Binning frames"),
            Self::Normalizing => write!(f, "Normalizing"),
            Self::Measuring => write!(f, "Measuring response"),
            Self::Aggregating => write!(f, "Aggregating groups"),
            Self::Writing => write!(f, "Writing output"),
        }
    }
}

/// Everything one pipeline run produced.
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    /// Raw series after optional binning.
    pub series: Series,
    pub baseline: TimeWindow,
    pub delta: DeltaOutput,
    /// Per-channel mean delta over the response window.
    pub response: Option<Vec<f64>>,
    pub groups: Option<GroupMap>,
    /// Zero substitutions made while loading (ratio denominators).
    pub load_warnings: Vec<ZeroBaselineWarning>,
    pub cache: Vec<CacheStatus>,
    pub written: Vec<PathBuf>,
}

impl PipelineOutput {
    /// All zero substitutions, from loading and from normalization.
    pub fn warnings(&self) -> impl Iterator<Item = &ZeroBaselineWarning> {
        self.load_warnings.iter().chain(self.delta.warnings.iter())
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started.
    fn begin_stage(&self, _stage: PipelineStage) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter, used when `run_pipeline` delegates.
pub(super) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
