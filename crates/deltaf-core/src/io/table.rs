use std::fmt;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DeltaError, Result};
use crate::series::check_unique_labels;

/// Meaning of the leftmost column of an exported table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstColumn {
    /// Running frame number; discarded (ImageJ Multi-Measure exports).
    #[default]
    FrameIndex,
    /// Per-frame timestamps.
    Time,
    /// No index column: every column is a channel.
    Channel,
}

impl fmt::Display for FirstColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrameIndex => write!(f, "Frame Index"),
            Self::Time => write!(f, "Time"),
            Self::Channel => write!(f, "Channel"),
        }
    }
}

/// How to read a delimited intensity table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableOptions {
    /// Field delimiter (single ASCII character).
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub first_column: FirstColumn,
}

fn default_delimiter() -> char {
    ','
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            first_column: FirstColumn::default(),
        }
    }
}

/// A parsed intensity table, before a time axis is attached.
#[derive(Clone, Debug)]
pub struct RawTable {
    /// One label per channel column.
    pub labels: Vec<String>,
    /// Leftmost column values when it holds timestamps.
    pub times: Option<Vec<f64>>,
    /// Frames x channels.
    pub data: Array2<f64>,
    /// Whether an incomplete trailing row was dropped.
    pub dropped_trailing_row: bool,
}

/// Read and parse a table file.
pub fn load_table(path: &Path, options: &TableOptions) -> Result<RawTable> {
    let text = std::fs::read_to_string(path)?;
    let table = parse_table(&text, options)?;
    debug!(
        path = %path.display(),
        frames = table.data.nrows(),
        channels = table.data.ncols(),
        "Table loaded"
    );
    Ok(table)
}

/// Parse a delimited table whose first line is a header.
///
/// Rows are numbered from 1 (the first data row) in errors; the header is row 0.
/// Only the last data row may be incomplete (short, or with blank cells), in
/// which case it is dropped.
pub fn parse_table(text: &str, options: &TableOptions) -> Result<RawTable> {
    if !options.delimiter.is_ascii() {
        return Err(DeltaError::InvalidParameter(format!(
            "delimiter '{}' is not a single ASCII character",
            options.delimiter
        )));
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(options.delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let width = headers.len();
    let channel_offset = match options.first_column {
        FirstColumn::Channel => 0,
        FirstColumn::FrameIndex | FirstColumn::Time => 1,
    };
    if width <= channel_offset || headers.iter().all(str::is_empty) {
        return Err(DeltaError::MalformedInput {
            row: 0,
            reason: "header has no channel columns".into(),
        });
    }

    let labels: Vec<String> = headers
        .iter()
        .skip(channel_offset)
        .enumerate()
        .map(|(i, h)| {
            if h.is_empty() {
                format!("ch{i}")
            } else {
                h.to_string()
            }
        })
        .collect();
    check_unique_labels(&labels)?;

    let records: Vec<StringRecord> = reader.records().collect::<std::result::Result<_, _>>()?;

    let mut values: Vec<f64> = Vec::with_capacity(records.len() * width);
    let mut frames = 0usize;
    let mut dropped_trailing_row = false;

    for (i, record) in records.iter().enumerate() {
        let row = i + 1;
        let is_last = i + 1 == records.len();
        let parsed = parse_row(record, &headers, row)?;

        if parsed.len() < width || parsed.iter().any(Option::is_none) {
            if is_last {
                debug!(row, "Dropping incomplete trailing row");
                dropped_trailing_row = true;
                break;
            }
            let reason = if parsed.len() < width {
                format!("row has {} cells, header has {width}", parsed.len())
            } else {
                let col = parsed.iter().position(Option::is_none).unwrap_or(0);
                format!("blank cell in column '{}'", &headers[col])
            };
            return Err(DeltaError::MalformedInput { row, reason });
        }

        values.extend(parsed.into_iter().flatten());
        frames += 1;
    }

    let full = Array2::from_shape_vec((frames, width), values).map_err(|e| {
        DeltaError::MalformedInput {
            row: 0,
            reason: e.to_string(),
        }
    })?;

    let times = match options.first_column {
        FirstColumn::Time => Some(full.column(0).to_vec()),
        _ => None,
    };
    let data = full.slice(ndarray::s![.., channel_offset..]).to_owned();

    Ok(RawTable {
        labels,
        times,
        data,
        dropped_trailing_row,
    })
}

/// Parse one record; blank cells become `None`.
fn parse_row(record: &StringRecord, headers: &StringRecord, row: usize) -> Result<Vec<Option<f64>>> {
    if record.len() > headers.len() {
        return Err(DeltaError::MalformedInput {
            row,
            reason: format!("row has {} cells, header has {}", record.len(), headers.len()),
        });
    }

    record
        .iter()
        .enumerate()
        .map(|(col, cell)| {
            if cell.is_empty() {
                return Ok(None);
            }
            let value: f64 = cell.parse().map_err(|_| DeltaError::MalformedInput {
                row,
                reason: format!("cannot parse '{cell}' in column '{}' as a number", &headers[col]),
            })?;
            if !value.is_finite() {
                return Err(DeltaError::MalformedInput {
                    row,
                    reason: format!("non-finite value '{cell}' in column '{}'", &headers[col]),
                });
            }
            Ok(Some(value))
        })
        .collect()
}
