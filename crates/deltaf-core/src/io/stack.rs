use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3};
use rayon::prelude::*;
use tracing::debug;

use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::error::{DeltaError, Result};

/// Sorted single-frame TIFF files in `folder` whose names contain `pattern`.
pub fn list_frames(folder: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
        })
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains(pattern))
        })
        .collect();
    paths.sort();
    debug!(folder = %folder.display(), pattern, count = paths.len(), "Listed frames");
    Ok(paths)
}

/// Load one grayscale frame as raw 16-bit intensities.
pub fn load_frame(path: &Path) -> Result<Array2<f64>> {
    let img = image::open(path)?;
    let gray = img.to_luma16();
    let (w, h) = gray.dimensions();
    let mut data = Array2::<f64>::zeros((h as usize, w as usize));

    for row in 0..h as usize {
        for col in 0..w as usize {
            data[[row, col]] = gray.get_pixel(col as u32, row as u32).0[0] as f64;
        }
    }

    Ok(data)
}

/// Read an ordered list of single-frame images into a `(frame, height, width)` stack.
///
/// Every frame must have the dimensions of the first one.
pub fn read_stack(paths: &[PathBuf]) -> Result<Array3<f64>> {
    if paths.is_empty() {
        return Err(DeltaError::InvalidParameter("no frames to read".into()));
    }

    let frames: Vec<Array2<f64>> = if paths.len() >= PARALLEL_FRAME_THRESHOLD {
        paths.par_iter().map(|p| load_frame(p)).collect::<Result<_>>()?
    } else {
        paths.iter().map(|p| load_frame(p)).collect::<Result<_>>()?
    };

    let (h, w) = frames[0].dim();
    let mut stack = Array3::<f64>::zeros((frames.len(), h, w));
    for (i, (frame, path)) in frames.iter().zip(paths).enumerate() {
        if frame.dim() != (h, w) {
            return Err(DeltaError::MalformedInput {
                row: i + 1,
                reason: format!(
                    "frame {} is {}x{}, expected {}x{}",
                    path.display(),
                    frame.ncols(),
                    frame.nrows(),
                    w,
                    h
                ),
            });
        }
        stack.index_axis_mut(ndarray::Axis(0), i).assign(frame);
    }

    debug!(frames = frames.len(), height = h, width = w, "Stack assembled");
    Ok(stack)
}

/// Per-frame acquisition times (seconds) encoded as file stems, e.g. `1534.25.tif`.
pub fn timestamps_from_filenames(paths: &[PathBuf]) -> Result<Vec<f64>> {
    paths
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            stem.trim().parse::<f64>().map_err(|_| DeltaError::MalformedInput {
                row: i + 1,
                reason: format!("file name '{}' is not a timestamp", path.display()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_from_filenames() {
        let paths = vec![PathBuf::from("a/12.5.tif"), PathBuf::from("a/14.tif")];
        assert_eq!(timestamps_from_filenames(&paths).unwrap(), vec![12.5, 14.0]);
    }

    #[test]
    fn test_bad_timestamp_names_row() {
        let paths = vec![PathBuf::from("1.tif"), PathBuf::from("TSeries_Ch2_001.tif")];
        let err = timestamps_from_filenames(&paths).unwrap_err();
        assert!(matches!(err, DeltaError::MalformedInput { row: 2, .. }));
    }
}
