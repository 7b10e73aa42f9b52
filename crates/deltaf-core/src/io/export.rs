use std::io::Write;
use std::path::Path;

use csv::Writer;

use crate::consts::CSV_DECIMALS;
use crate::error::{DeltaError, Result};
use crate::group::GroupMap;
use crate::series::{IntensityMatrix, TimeAxis};

fn fmt_value(v: f64) -> String {
    format!("{v:.prec$}", prec = CSV_DECIMALS)
}

/// Write a delta table: `Frame (#), Time (<unit>), <labels...>`.
///
/// With `response` set, a second row holds each channel's response-window mean.
pub fn write_delta_table<W: Write>(
    writer: W,
    time: &TimeAxis,
    delta: &IntensityMatrix,
    labels: &[String],
    response: Option<&[f64]>,
) -> Result<()> {
    if time.len() != delta.n_frames() || labels.len() != delta.n_channels() {
        return Err(DeltaError::ShapeMismatch {
            expected: format!("{} frames, {} labels", time.len(), labels.len()),
            actual: format!("{:?}", delta.data().dim()),
        });
    }

    let mut w = Writer::from_writer(writer);

    let mut header = vec![
        "Frame (#)".to_string(),
        format!("Time ({})", time.unit().abbreviation()),
    ];
    header.extend(labels.iter().cloned());
    w.write_record(&header)?;

    if let Some(means) = response {
        let mut row = vec![String::new(), "Response (mean dF/F %)".to_string()];
        row.extend(means.iter().map(|&v| fmt_value(v)));
        w.write_record(&row)?;
    }

    for (i, values) in delta.data().rows().into_iter().enumerate() {
        let mut row = Vec::with_capacity(values.len() + 2);
        row.push((i + 1).to_string());
        row.push(fmt_value(time.values()[i]));
        row.extend(values.iter().map(|&v| fmt_value(v)));
        w.write_record(&row)?;
    }

    w.flush()?;
    Ok(())
}

pub fn write_delta_csv(
    path: &Path,
    time: &TimeAxis,
    delta: &IntensityMatrix,
    labels: &[String],
    response: Option<&[f64]>,
) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_delta_table(file, time, delta, labels, response)
}

/// Write group statistics: `Time (<unit>), <g> mean, <g> stderr, <g> n, ...`.
pub fn write_groups_table<W: Write>(writer: W, time: &TimeAxis, groups: &GroupMap) -> Result<()> {
    if let Some((key, stats)) = groups.iter().find(|(_, s)| s.mean.len() != time.len()) {
        return Err(DeltaError::ShapeMismatch {
            expected: format!("{} samples", time.len()),
            actual: format!("{} samples in group '{key}'", stats.mean.len()),
        });
    }

    let mut w = Writer::from_writer(writer);

    let mut header = vec![format!("Time ({})", time.unit().abbreviation())];
    for key in groups.keys() {
        header.push(format!("{key} mean"));
        header.push(format!("{key} stderr"));
        header.push(format!("{key} n"));
    }
    w.write_record(&header)?;

    for (i, t) in time.values().iter().enumerate() {
        let mut row = vec![fmt_value(*t)];
        for stats in groups.values() {
            row.push(fmt_value(stats.mean[i]));
            row.push(fmt_value(stats.stderr[i]));
            row.push(stats.counts[i].to_string());
        }
        w.write_record(&row)?;
    }

    w.flush()?;
    Ok(())
}

pub fn write_groups_csv(path: &Path, time: &TimeAxis, groups: &GroupMap) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_groups_table(file, time, groups)
}
