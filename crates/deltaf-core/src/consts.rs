/// Default lower percentile used for ratio baselines.
pub const DEFAULT_BASELINE_PERCENTILE: f64 = 20.0;

/// Minimum channel count to normalize channels with Rayon parallelism.
pub const PARALLEL_CHANNEL_THRESHOLD: usize = 64;

/// Minimum frame count to reduce ROI traces with frame-level Rayon parallelism.
pub const PARALLEL_FRAME_THRESHOLD: usize = 16;

/// Multiplier converting a fractional change into percent.
pub const PERCENT: f64 = 100.0;

/// Seconds per minute, for time-unit conversion.
pub const SECONDS_PER_MINUTE: f64 = 60.0;

/// Magic bytes at the start of every cached array file.
pub const CACHE_MAGIC: &[u8; 4] = b"DFFC";

/// Version of the cached array layout. Files with any other version are recomputed.
pub const CACHE_VERSION: u32 = 1;

/// File extension for cached arrays.
pub const CACHE_EXTENSION: &str = "dfc";

/// Decimal places used when writing delta and group tables.
pub const CSV_DECIMALS: usize = 5;

/// Name of the tag that marks the baseline period in an experiment tag file.
pub const BASELINE_TAG: &str = "baseline";
