use ndarray::{s, Axis};

use crate::error::{DeltaError, Result};
use crate::series::{IntensityMatrix, TimeAxis, TimeWindow};

/// Per-channel mean over a time window, e.g. the mean ΔF/F during a drug application.
pub fn window_means(time: &TimeAxis, matrix: &IntensityMatrix, window: &TimeWindow) -> Result<Vec<f64>> {
    window.validate()?;
    if time.len() != matrix.n_frames() {
        return Err(DeltaError::ShapeMismatch {
            expected: format!("{} frames (time axis)", time.len()),
            actual: format!("{} frames (matrix)", matrix.n_frames()),
        });
    }
    let range = time
        .window_indices(window)
        .range()
        .ok_or(DeltaError::EmptyWindow {
            start: window.start,
            end: window.end,
        })?;

    let means = matrix
        .data()
        .slice(s![range, ..])
        .mean_axis(Axis(0))
        .map(|m| m.to_vec())
        .unwrap_or_default();
    Ok(means)
}
