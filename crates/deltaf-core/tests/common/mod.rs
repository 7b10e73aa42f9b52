#![allow(dead_code)]

use std::path::{Path, PathBuf};

use deltaf_core::series::{IntensityMatrix, TimeAxis, TimeUnit};
use image::{ImageBuffer, Luma};

/// Write `text` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

/// One-second axis of `len` samples.
pub fn seconds(len: usize) -> TimeAxis {
    TimeAxis::from_period(1.0, len, TimeUnit::Seconds).unwrap()
}

/// Matrix whose columns are the given channels.
pub fn matrix(channels: &[Vec<f64>]) -> IntensityMatrix {
    IntensityMatrix::from_channels(channels).unwrap()
}

pub fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Save a 16-bit grayscale TIFF whose pixels come from `pixel(x, y)`.
pub fn write_tiff16(path: &Path, width: u32, height: u32, pixel: impl Fn(u32, u32) -> u16) {
    let img: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_fn(width, height, |x, y| Luma([pixel(x, y)]));
    img.save(path).unwrap();
}

/// ImageJ Multi-Measure style table: frame index column plus one column per ROI.
pub fn multi_measure_csv(names: &[&str], channels: &[Vec<f64>]) -> String {
    let mut text = String::from(" ");
    for name in names {
        text.push(',');
        text.push_str(name);
    }
    text.push('\n');
    let frames = channels.first().map_or(0, Vec::len);
    for f in 0..frames {
        text.push_str(&(f + 1).to_string());
        for channel in channels {
            text.push(',');
            text.push_str(&channel[f].to_string());
        }
        text.push('\n');
    }
    text
}
