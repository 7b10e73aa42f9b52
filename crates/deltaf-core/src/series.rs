use std::collections::HashSet;
use std::fmt;

use ndarray::{s, Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::consts::SECONDS_PER_MINUTE;
use crate::error::{DeltaError, Result};

/// Unit of a time axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[default]
    Seconds,
    Minutes,
}

impl TimeUnit {
    /// Factor converting a value in `self` into `target`.
    pub fn factor_to(self, target: TimeUnit) -> f64 {
        match (self, target) {
            (Self::Seconds, Self::Minutes) => 1.0 / SECONDS_PER_MINUTE,
            (Self::Minutes, Self::Seconds) => SECONDS_PER_MINUTE,
            _ => 1.0,
        }
    }

    pub fn abbreviation(self) -> &'static str {
        match self {
            Self::Seconds => "sec",
            Self::Minutes => "min",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds => write!(f, "Seconds"),
            Self::Minutes => write!(f, "Minutes"),
        }
    }
}

/// Strictly increasing, zero-based sample times of a recording.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeAxis {
    values: Array1<f64>,
    unit: TimeUnit,
}

/// Half-open index range `[first, end)` a time window maps onto.
///
/// `first` is `None` when the window starts after the last sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowIndices {
    pub first: Option<usize>,
    pub end: usize,
}

impl WindowIndices {
    /// The sample range, if it is non-empty.
    pub fn range(&self) -> Option<std::ops::Range<usize>> {
        match self.first {
            Some(first) if first < self.end => Some(first..self.end),
            _ => None,
        }
    }
}

impl TimeAxis {
    /// Build an axis where sample `i` sits at `i * period`.
    pub fn from_period(period: f64, len: usize, unit: TimeUnit) -> Result<Self> {
        if !period.is_finite() || period <= 0.0 {
            return Err(DeltaError::InvalidTimeAxis(format!(
                "frame period must be positive, got {period}"
            )));
        }
        let values = Array1::from_iter((0..len).map(|i| i as f64 * period));
        Ok(Self { values, unit })
    }

    /// Build an axis from absolute per-frame timestamps.
    ///
    /// Timestamps are made relative to the first one and converted from
    /// `source` into `unit`.
    pub fn from_timestamps(timestamps: &[f64], source: TimeUnit, unit: TimeUnit) -> Result<Self> {
        if let Some(i) = timestamps.iter().position(|t| !t.is_finite()) {
            return Err(DeltaError::InvalidTimeAxis(format!(
                "timestamp {i} is not finite"
            )));
        }
        for (i, pair) in timestamps.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(DeltaError::InvalidTimeAxis(format!(
                    "timestamps must be strictly increasing (index {} is {} after {})",
                    i + 1,
                    pair[1],
                    pair[0]
                )));
            }
        }

        let origin = timestamps.first().copied().unwrap_or(0.0);
        let factor = source.factor_to(unit);
        let values = Array1::from_iter(timestamps.iter().map(|t| (t - origin) * factor));
        Ok(Self { values, unit })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// First and last sample times, or `(0, 0)` for an empty axis.
    pub fn span(&self) -> (f64, f64) {
        match (self.values.first(), self.values.last()) {
            (Some(&a), Some(&b)) => (a, b),
            _ => (0.0, 0.0),
        }
    }

    /// Same samples expressed in another unit.
    pub fn to_unit(&self, unit: TimeUnit) -> TimeAxis {
        let factor = self.unit.factor_to(unit);
        Self {
            values: self.values.mapv(|t| t * factor),
            unit,
        }
    }

    /// Map a window onto sample indices.
    ///
    /// `first` is the first index with `t >= start`, `end` the first index
    /// with `t >= end` (or the axis length when no sample reaches it).
    pub fn window_indices(&self, window: &TimeWindow) -> WindowIndices {
        let first = self.values.iter().position(|&t| t >= window.start);
        let end = self
            .values
            .iter()
            .position(|&t| t >= window.end)
            .unwrap_or(self.values.len());
        WindowIndices { first, end }
    }
}

/// A `[start, end)` interval in time-axis units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

/// Interval presumed to hold resting, pre-stimulus signal.
pub type BaselineWindow = TimeWindow;

impl TimeWindow {
    pub fn new(start: f64, end: f64) -> Result<Self> {
        let window = Self { start, end };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.start.is_finite() || !self.end.is_finite() || self.start >= self.end {
            return Err(DeltaError::InvalidWindow {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Frames x channels intensity values.
///
/// A channel is an ROI, a wavelength channel, or a line-scan bin.
#[derive(Clone, Debug, PartialEq)]
pub struct IntensityMatrix {
    data: Array2<f64>,
}

impl IntensityMatrix {
    pub fn new(data: Array2<f64>) -> Self {
        Self { data }
    }

    /// Build a matrix from one vector per channel.
    pub fn from_channels(channels: &[Vec<f64>]) -> Result<Self> {
        let frames = channels.first().map_or(0, Vec::len);
        let mut data = Array2::<f64>::zeros((frames, channels.len()));
        for (c, values) in channels.iter().enumerate() {
            if values.len() != frames {
                return Err(DeltaError::ShapeMismatch {
                    expected: format!("{frames} frames"),
                    actual: format!("{} frames in channel {c}", values.len()),
                });
            }
            data.column_mut(c).assign(&ArrayView1::from(values.as_slice()));
        }
        Ok(Self { data })
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.data
    }

    pub fn n_frames(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_channels(&self) -> usize {
        self.data.ncols()
    }

    pub fn channel(&self, index: usize) -> Result<ArrayView1<'_, f64>> {
        self.check_channel(index)?;
        Ok(self.data.column(index))
    }

    pub fn check_channel(&self, index: usize) -> Result<()> {
        if index >= self.n_channels() {
            return Err(DeltaError::ChannelOutOfRange {
                index,
                total: self.n_channels(),
            });
        }
        Ok(())
    }

    /// Average non-overlapping blocks of `factor` frames.
    ///
    /// A trailing partial block is discarded.
    pub fn bin(&self, factor: usize) -> Result<Self> {
        check_bin_factor(factor, self.n_frames())?;
        let blocks = self.n_frames() / factor;
        let mut data = Array2::<f64>::zeros((blocks, self.n_channels()));
        for (b, mut row) in data.axis_iter_mut(Axis(0)).enumerate() {
            let block = self.data.slice(s![b * factor..(b + 1) * factor, ..]);
            if let Some(mean) = block.mean_axis(Axis(0)) {
                row.assign(&mean);
            }
        }
        Ok(Self { data })
    }
}

fn check_bin_factor(factor: usize, frames: usize) -> Result<()> {
    if factor == 0 || factor > frames {
        return Err(DeltaError::InvalidParameter(format!(
            "bin factor {factor} must be between 1 and the frame count ({frames})"
        )));
    }
    Ok(())
}

/// A loaded recording: time axis, raw intensities, and one label per channel.
#[derive(Clone, Debug)]
pub struct Series {
    pub time: TimeAxis,
    pub matrix: IntensityMatrix,
    pub labels: Vec<String>,
}

impl Series {
    /// Assemble a series, checking that the pieces agree in shape and labels are unique.
    pub fn new(time: TimeAxis, matrix: IntensityMatrix, labels: Vec<String>) -> Result<Self> {
        if time.len() != matrix.n_frames() {
            return Err(DeltaError::ShapeMismatch {
                expected: format!("{} frames (time axis)", time.len()),
                actual: format!("{} frames (matrix)", matrix.n_frames()),
            });
        }
        if labels.len() != matrix.n_channels() {
            return Err(DeltaError::ShapeMismatch {
                expected: format!("{} labels", matrix.n_channels()),
                actual: format!("{} labels", labels.len()),
            });
        }
        check_unique_labels(&labels)?;
        Ok(Self {
            time,
            matrix,
            labels,
        })
    }

    pub fn n_frames(&self) -> usize {
        self.matrix.n_frames()
    }

    pub fn n_channels(&self) -> usize {
        self.matrix.n_channels()
    }

    /// Index of the channel with the given label.
    pub fn channel_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Average non-overlapping blocks of `factor` frames in both time and intensity.
    pub fn bin(&self, factor: usize) -> Result<Self> {
        check_bin_factor(factor, self.n_frames())?;
        let blocks = self.n_frames() / factor;
        let times = Array1::from_iter((0..blocks).map(|b| {
            self.time
                .values()
                .slice(s![b * factor..(b + 1) * factor])
                .mean()
                .unwrap_or(0.0)
        }));
        let time = TimeAxis {
            values: times,
            unit: self.time.unit(),
        };
        Ok(Self {
            time,
            matrix: self.matrix.bin(factor)?,
            labels: self.labels.clone(),
        })
    }
}

pub(crate) fn check_unique_labels(labels: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(labels.len());
    for label in labels {
        if !seen.insert(label.as_str()) {
            return Err(DeltaError::MalformedInput {
                row: 0,
                reason: format!("duplicate channel label '{label}'"),
            });
        }
    }
    Ok(())
}
