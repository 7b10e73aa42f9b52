pub mod config;
mod orchestrator;
mod types;

pub use orchestrator::{
    resolve_baseline_config, run_pipeline, run_pipeline_quiet, run_pipeline_reported,
};
pub use types::{PipelineOutput, PipelineStage, ProgressReporter};
