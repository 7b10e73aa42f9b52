use std::sync::Arc;

use tracing::info;

use crate::error::{DeltaError, Result};
use crate::group::{aggregate_by_group, GroupingRule};
use crate::io::export::{write_delta_csv, write_groups_csv};
use crate::io::source::load_series;
use crate::normalize::{compute_delta, label_warnings};
use crate::response::window_means;
use crate::series::{TimeAxis, TimeWindow};
use crate::tags::{baseline_from_tags, load_tags};

use super::config::{BaselineConfig, PipelineConfig};
use super::types::{NoOpReporter, PipelineOutput, PipelineStage, ProgressReporter};

/// Resolve the configured baseline into a window on `time`'s unit.
pub fn resolve_baseline_config(baseline: &BaselineConfig, time: &TimeAxis) -> Result<TimeWindow> {
    match baseline {
        BaselineConfig::Window { start, end } => TimeWindow::new(*start, *end),
        BaselineConfig::Tags { path } => {
            let tags = load_tags(path)?;
            baseline_from_tags(&tags, time.unit()).ok_or_else(|| {
                DeltaError::Config(format!(
                    "no baseline tag and no tags to infer one from in {}",
                    path.display()
                ))
            })
        }
    }
}

/// Run the full analysis with a thread-safe progress reporter.
pub fn run_pipeline_reported(
    config: &PipelineConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<PipelineOutput> {
    reporter.begin_stage(PipelineStage::Loading);
    let loaded = load_series(&config.source, &config.timing)?;
    info!(
        source = %config.source.path().display(),
        frames = loaded.series.n_frames(),
        channels = loaded.series.n_channels(),
        "Series loaded"
    );
    reporter.finish_stage();

    let series = match config.bin {
        Some(factor) if factor > 1 => {
            reporter.begin_stage(PipelineStage::Binning);
            let binned = loaded.series.bin(factor)?;
            info!(factor, frames = binned.n_frames(), "Frames binned");
            reporter.finish_stage();
            binned
        }
        _ => loaded.series,
    };

    reporter.begin_stage(PipelineStage::Normalizing);
    let baseline = resolve_baseline_config(&config.baseline, &series.time)?;
    let mut delta = compute_delta(&series.time, &series.matrix, &baseline, &config.delta)?;
    label_warnings(&mut delta.warnings, &series.labels);
    info!(
        baseline = %baseline,
        method = %config.delta.method,
        samples = delta.baseline_range.len(),
        substitutions = delta.warnings.len(),
        "Normalized to baseline"
    );
    reporter.finish_stage();

    let response = match &config.response {
        Some(window) => {
            reporter.begin_stage(PipelineStage::Measuring);
            let means = window_means(&series.time, &delta.matrix, window)?;
            reporter.finish_stage();
            Some(means)
        }
        None => None,
    };

    let groups = match &config.grouping {
        Some(grouping) => {
            reporter.begin_stage(PipelineStage::Aggregating);
            let rule = GroupingRule::from(grouping);
            let groups = aggregate_by_group(&delta.matrix, &series.labels, &rule)?;
            info!(rule = %grouping, groups = groups.len(), "Channels grouped");
            reporter.finish_stage();
            Some(groups)
        }
        None => None,
    };

    let mut written = Vec::new();
    if let Some(dir) = &config.output.dir {
        reporter.begin_stage(PipelineStage::Writing);
        std::fs::create_dir_all(dir)?;

        let path = dir.join(&config.output.delta_name);
        write_delta_csv(
            &path,
            &series.time,
            &delta.matrix,
            &series.labels,
            response.as_deref(),
        )?;
        written.push(path);

        if let Some(groups) = &groups {
            let path = dir.join(&config.output.groups_name);
            write_groups_csv(&path, &series.time, groups)?;
            written.push(path);
        }
        info!(dir = %dir.display(), files = written.len(), "Output written");
        reporter.finish_stage();
    }

    Ok(PipelineOutput {
        series,
        baseline,
        delta,
        response,
        groups,
        load_warnings: loaded.warnings,
        cache: loaded.cache,
        written,
    })
}

struct FnReporter<F>(F);

impl<F> ProgressReporter for FnReporter<F>
where
    F: Fn(PipelineStage) + Send + Sync,
{
    fn begin_stage(&self, stage: PipelineStage) {
        (self.0)(stage)
    }
}

/// Run the full analysis.
///
/// `on_stage` is called as each stage begins.
pub fn run_pipeline<F>(config: &PipelineConfig, on_stage: F) -> Result<PipelineOutput>
where
    F: Fn(PipelineStage) + Send + Sync + 'static,
{
    run_pipeline_reported(config, Arc::new(FnReporter(on_stage)))
}

/// Run the full analysis without progress reporting.
pub fn run_pipeline_quiet(config: &PipelineConfig) -> Result<PipelineOutput> {
    run_pipeline_reported(config, Arc::new(NoOpReporter))
}
