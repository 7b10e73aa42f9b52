//! Baseline normalization: raw intensities to percent change from baseline.

use std::fmt;
use std::ops::Range;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::consts::{DEFAULT_BASELINE_PERCENTILE, PARALLEL_CHANNEL_THRESHOLD, PERCENT};
use crate::error::{DeltaError, Result};
use crate::series::{BaselineWindow, IntensityMatrix, TimeAxis};

/// How the baseline is established and the delta expressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeltaMethod {
    /// Baseline is the window mean; delta is `(value / baseline - 1) * 100`.
    #[default]
    RatioPercent,
    /// Ratio signal (G/R) with a lower-percentile baseline.
    ///
    /// With `denominator` set, every channel is first divided frame by frame
    /// by that channel; otherwise the matrix already holds a ratio. Delta is
    /// `(ratio - baseline) / baseline * 100`.
    SubtractThenRatio {
        #[serde(default)]
        denominator: Option<usize>,
    },
}

impl fmt::Display for DeltaMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RatioPercent => write!(f, "Ratio Percent"),
            Self::SubtractThenRatio {
                denominator: Some(d),
            } => write!(f, "Ratio Percentile (G/R over channel {d})"),
            Self::SubtractThenRatio { denominator: None } => write!(f, "Ratio Percentile"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeltaConfig {
    #[serde(default)]
    pub method: DeltaMethod,
    /// Baseline percentile for [`DeltaMethod::SubtractThenRatio`] (0-100).
    #[serde(default = "default_percentile")]
    pub percentile: f64,
    /// Channel whose delta is subtracted from every other channel's delta.
    #[serde(default)]
    pub reference: Option<usize>,
}

fn default_percentile() -> f64 {
    DEFAULT_BASELINE_PERCENTILE
}

impl Default for DeltaConfig {
    fn default() -> Self {
        Self {
            method: DeltaMethod::default(),
            percentile: DEFAULT_BASELINE_PERCENTILE,
            reference: None,
        }
    }
}

/// What a zero value was substituted in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZeroSubstitution {
    /// The channel's baseline value was exactly zero.
    Baseline,
    /// A ratio denominator channel held exact zeros in this many frames.
    Denominator { frames: usize },
}

/// Report of a zero replaced by the channel's smallest positive value.
#[derive(Clone, Debug, PartialEq)]
pub struct ZeroBaselineWarning {
    pub channel: usize,
    /// Channel label, once the caller has attached it with [`label_warnings`].
    pub label: Option<String>,
    pub kind: ZeroSubstitution,
    pub substitute: f64,
}

impl fmt::Display for ZeroBaselineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "channel {} ({label}): ", self.channel)?,
            None => write!(f, "channel {}: ", self.channel)?,
        }
        match self.kind {
            ZeroSubstitution::Baseline => {
                write!(f, "zero baseline replaced with {}", self.substitute)
            }
            ZeroSubstitution::Denominator { frames } => write!(
                f,
                "{frames} zero denominator value(s) replaced with {}",
                self.substitute
            ),
        }
    }
}

/// Attach channel labels to warnings produced from an unlabeled matrix.
pub fn label_warnings(warnings: &mut [ZeroBaselineWarning], labels: &[String]) {
    for w in warnings {
        w.label = labels.get(w.channel).cloned();
    }
}

/// Result of [`compute_delta`].
#[derive(Clone, Debug)]
pub struct DeltaOutput {
    /// Percent change from baseline, same shape as the input.
    pub matrix: IntensityMatrix,
    /// Baseline value used for each channel, after any zero substitution.
    pub baselines: Vec<f64>,
    /// Sample range the baseline window resolved to.
    pub baseline_range: Range<usize>,
    pub warnings: Vec<ZeroBaselineWarning>,
}

/// Resolve a baseline window to its half-open sample range.
pub fn resolve_baseline(time: &TimeAxis, window: &BaselineWindow) -> Result<Range<usize>> {
    window.validate()?;
    let indices = time.window_indices(window);
    indices.range().ok_or_else(|| {
        let (axis_start, axis_end) = time.span();
        DeltaError::EmptyBaselineWindow {
            start: window.start,
            end: window.end,
            first_index: indices.first,
            end_index: indices.end,
            axis_start,
            axis_end,
        }
    })
}

/// Percentile by linear interpolation between closest ranks.
///
/// The rank of `p` is `p / 100 * (n - 1)`, matching NumPy's default, so the
/// 20th percentile of `[5, 6, 7, 8, 9, 10]` is `6.0`.
pub fn percentile(values: &[f64], p: f64) -> Result<f64> {
    if !(0.0..=100.0).contains(&p) {
        return Err(DeltaError::InvalidParameter(format!(
            "percentile {p} outside 0..=100"
        )));
    }
    if values.is_empty() {
        return Err(DeltaError::InvalidParameter(
            "percentile of an empty slice".into(),
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Smallest strictly positive value, used in place of a zero divisor.
pub fn smallest_positive(values: ArrayView1<f64>) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|&v| v > 0.0)
        .min_by(f64::total_cmp)
}

/// Element-wise `numerator / denominator` of two same-shaped matrices.
///
/// Exact zeros in each denominator channel are replaced by that channel's
/// smallest positive value and reported.
pub fn ratio_matrix(
    numerator: &IntensityMatrix,
    denominator: &IntensityMatrix,
) -> Result<(IntensityMatrix, Vec<ZeroBaselineWarning>)> {
    if numerator.data().dim() != denominator.data().dim() {
        return Err(DeltaError::ShapeMismatch {
            expected: format!("{:?}", numerator.data().dim()),
            actual: format!("{:?}", denominator.data().dim()),
        });
    }

    let mut data = numerator.data().clone();
    let mut warnings = Vec::new();
    for c in 0..denominator.n_channels() {
        let (divisor, warning) = nonzero_channel(denominator.data().column(c), c)?;
        if let Some(w) = warning {
            warnings.push(w);
        }
        data.column_mut(c).zip_mut_with(&divisor, |n, &d| *n /= d);
    }
    report(&warnings);
    Ok((IntensityMatrix::new(data), warnings))
}

/// Copy of `values` with exact zeros replaced by the smallest positive value.
fn nonzero_channel(
    values: ArrayView1<f64>,
    channel: usize,
) -> Result<(Array1<f64>, Option<ZeroBaselineWarning>)> {
    let zeros = values.iter().filter(|&&v| v == 0.0).count();
    if zeros == 0 {
        return Ok((values.to_owned(), None));
    }
    let substitute =
        smallest_positive(values).ok_or(DeltaError::UnrecoverableZeroBaseline { channel })?;
    let fixed = values.mapv(|v| if v == 0.0 { substitute } else { v });
    Ok((
        fixed,
        Some(ZeroBaselineWarning {
            channel,
            label: None,
            kind: ZeroSubstitution::Denominator { frames: zeros },
            substitute,
        }),
    ))
}

fn report(warnings: &[ZeroBaselineWarning]) {
    for w in warnings {
        warn!(channel = w.channel, substitute = w.substitute, kind = ?w.kind, "Zero divisor substituted");
    }
}

/// Convert a raw matrix into percent change from each channel's baseline.
///
/// The input is never modified; a new matrix of the same shape is returned.
pub fn compute_delta(
    time: &TimeAxis,
    matrix: &IntensityMatrix,
    window: &BaselineWindow,
    config: &DeltaConfig,
) -> Result<DeltaOutput> {
    if time.len() != matrix.n_frames() {
        return Err(DeltaError::ShapeMismatch {
            expected: format!("{} frames (time axis)", time.len()),
            actual: format!("{} frames (matrix)", matrix.n_frames()),
        });
    }
    let range = resolve_baseline(time, window)?;
    if let Some(r) = config.reference {
        matrix.check_channel(r)?;
    }

    let mut warnings = Vec::new();
    let ratio;
    let work: ArrayView2<f64> = match config.method {
        DeltaMethod::SubtractThenRatio {
            denominator: Some(d),
        } => {
            matrix.check_channel(d)?;
            let (divisor, warning) = nonzero_channel(matrix.data().column(d), d)?;
            warnings.extend(warning);
            let mut data = matrix.data().clone();
            for mut column in data.axis_iter_mut(Axis(1)) {
                column.zip_mut_with(&divisor, |v, &r| *v /= r);
            }
            ratio = data;
            ratio.view()
        }
        _ => matrix.data().view(),
    };

    let normalize = |c: usize| -> Result<(Array1<f64>, f64, Option<ZeroBaselineWarning>)> {
        let column = work.column(c);
        let slice = column.slice(ndarray::s![range.clone()]);
        let raw = match config.method {
            DeltaMethod::RatioPercent => slice.mean().unwrap_or(0.0),
            DeltaMethod::SubtractThenRatio { .. } => {
                percentile(&slice.to_vec(), config.percentile)?
            }
        };

        let (baseline, warning) = if raw == 0.0 {
            let substitute = smallest_positive(column)
                .ok_or(DeltaError::UnrecoverableZeroBaseline { channel: c })?;
            let warning = ZeroBaselineWarning {
                channel: c,
                label: None,
                kind: ZeroSubstitution::Baseline,
                substitute,
            };
            (substitute, Some(warning))
        } else {
            (raw, None)
        };

        let delta = column.mapv(|v| (v - baseline) / baseline * PERCENT);
        Ok((delta, baseline, warning))
    };

    let n_channels = matrix.n_channels();
    let per_channel: Vec<_> = if n_channels >= PARALLEL_CHANNEL_THRESHOLD {
        (0..n_channels)
            .into_par_iter()
            .map(normalize)
            .collect::<Result<_>>()?
    } else {
        (0..n_channels).map(normalize).collect::<Result<_>>()?
    };

    let mut delta = Array2::<f64>::zeros((matrix.n_frames(), n_channels));
    let mut baselines = Vec::with_capacity(n_channels);
    for (c, (column, baseline, warning)) in per_channel.into_iter().enumerate() {
        delta.column_mut(c).assign(&column);
        baselines.push(baseline);
        warnings.extend(warning);
    }

    if let Some(r) = config.reference {
        let reference = delta.column(r).to_owned();
        for (c, mut column) in delta.axis_iter_mut(Axis(1)).enumerate() {
            if c != r {
                column -= &reference;
            }
        }
    }

    report(&warnings);
    debug!(
        method = %config.method,
        channels = n_channels,
        baseline_start = range.start,
        baseline_end = range.end,
        "Delta computed"
    );

    Ok(DeltaOutput {
        matrix: IntensityMatrix::new(delta),
        baselines,
        baseline_range: range,
        warnings,
    })
}
