use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeltaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed input at row {row}: {reason}")]
    MalformedInput { row: usize, reason: String },

    #[error(
        "Baseline window [{start}, {end}) resolved to indices [{first_index:?}, {end_index}) \
         and contains no samples (time axis spans {axis_start}..={axis_end})"
    )]
    EmptyBaselineWindow {
        start: f64,
        end: f64,
        first_index: Option<usize>,
        end_index: usize,
        axis_start: f64,
        axis_end: f64,
    },

    #[error("Time window [{start}, {end}) contains no samples")]
    EmptyWindow { start: f64, end: f64 },

    #[error("Invalid time window [{start}, {end})")]
    InvalidWindow { start: f64, end: f64 },

    #[error("Group '{group}' has no member channels")]
    DegenerateGroup { group: String },

    #[error("Channel {channel} has a zero baseline and no positive value to substitute")]
    UnrecoverableZeroBaseline { channel: usize },

    #[error("Channel index {index} out of range (total: {total})")]
    ChannelOutOfRange { index: usize, total: usize },

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Invalid time axis: {0}")]
    InvalidTimeAxis(String),

    #[error("Invalid ROI: {0}")]
    InvalidRoi(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DeltaError>;
