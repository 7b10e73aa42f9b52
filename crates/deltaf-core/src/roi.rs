use ndarray::{Array2, Array3, ArrayView2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::error::{DeltaError, Result};
use crate::series::IntensityMatrix;

/// A spatial region whose pixels are averaged per frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Roi {
    /// Rectangle with inclusive column (`x`) and row (`y`) bounds.
    Rect {
        x1: usize,
        x2: usize,
        y1: usize,
        y2: usize,
    },
    /// Arbitrary `[x, y]` pixel coordinates.
    Pixels { pixels: Vec<[usize; 2]> },
}

/// A named ROI, as listed in a pipeline config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedRoi {
    pub name: String,
    pub region: Roi,
}

impl Roi {
    /// `(row, col)` coordinates covered by this ROI in a `height x width` frame.
    pub fn coordinates(&self, height: usize, width: usize) -> Result<Vec<(usize, usize)>> {
        match self {
            Self::Rect { x1, x2, y1, y2 } => {
                if x1 > x2 || y1 > y2 {
                    return Err(DeltaError::InvalidRoi(format!(
                        "rectangle bounds are inverted: x {x1}..={x2}, y {y1}..={y2}"
                    )));
                }
                if *x2 >= width || *y2 >= height {
                    return Err(DeltaError::InvalidRoi(format!(
                        "rectangle x {x1}..={x2}, y {y1}..={y2} exceeds {width}x{height} frame"
                    )));
                }
                Ok((*y1..=*y2)
                    .flat_map(|row| (*x1..=*x2).map(move |col| (row, col)))
                    .collect())
            }
            Self::Pixels { pixels } => {
                if pixels.is_empty() {
                    return Err(DeltaError::InvalidRoi("pixel list is empty".into()));
                }
                pixels
                    .iter()
                    .map(|&[x, y]| {
                        if x >= width || y >= height {
                            Err(DeltaError::InvalidRoi(format!(
                                "pixel ({x}, {y}) outside {width}x{height} frame"
                            )))
                        } else {
                            Ok((y, x))
                        }
                    })
                    .collect()
            }
        }
    }
}

/// Mean intensity of the pixels covered by `roi`.
pub fn roi_mean(frame: ArrayView2<f64>, roi: &Roi) -> Result<f64> {
    let (h, w) = frame.dim();
    let coords = roi.coordinates(h, w)?;
    let sum: f64 = coords.iter().map(|&(r, c)| frame[[r, c]]).sum();
    Ok(sum / coords.len() as f64)
}

/// Per-frame ROI means of a `(frame, height, width)` stack, one channel per ROI.
pub fn roi_traces(stack: &Array3<f64>, rois: &[Roi]) -> Result<IntensityMatrix> {
    let (frames, h, w) = stack.dim();
    let coords: Vec<Vec<(usize, usize)>> = rois
        .iter()
        .map(|roi| roi.coordinates(h, w))
        .collect::<Result<_>>()?;

    let reduce = |frame: ArrayView2<f64>| -> Vec<f64> {
        coords
            .iter()
            .map(|px| px.iter().map(|&(r, c)| frame[[r, c]]).sum::<f64>() / px.len() as f64)
            .collect()
    };

    let rows: Vec<Vec<f64>> = if frames >= PARALLEL_FRAME_THRESHOLD {
        stack
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(reduce)
            .collect()
    } else {
        stack.axis_iter(Axis(0)).map(reduce).collect()
    };

    let mut data = Array2::<f64>::zeros((frames, rois.len()));
    for (f, row) in rows.into_iter().enumerate() {
        for (c, v) in row.into_iter().enumerate() {
            data[[f, c]] = v;
        }
    }
    Ok(IntensityMatrix::new(data))
}
