//! Experiment tag files.
//!
//! A tag file annotates a recording with named time ranges, one per line:
//!
//! ```text
//! baseline=3:00-7:00   # clock times are M:SS
//! GABA=7.5-9.5         # plain minutes work too
//! bubble=12:34         # a single time point
//! ```

use std::path::Path;

use tracing::{debug, info};

use crate::consts::BASELINE_TAG;
use crate::error::{DeltaError, Result};
use crate::series::{TimeUnit, TimeWindow};

/// A named time range (or point) in minutes.
#[derive(Clone, Debug, PartialEq)]
pub struct Tag {
    pub name: String,
    pub start: f64,
    pub end: Option<f64>,
}

/// Parse `M:SS` or plain minutes: `"7:30"` is `7.5`.
pub fn parse_clock(text: &str) -> Option<f64> {
    let text = text.trim();
    match text.split_once(':') {
        Some((m, s)) => {
            let minutes: u32 = m.trim().parse().ok()?;
            let seconds: u32 = s.trim().parse().ok()?;
            Some(minutes as f64 + seconds as f64 / 60.0)
        }
        None => text.parse().ok(),
    }
}

/// Parse tag lines, sorted by start time. Lines without `=` are ignored.
pub fn parse_tags(text: &str) -> Result<Vec<Tag>> {
    let mut tags = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        let Some((name, values)) = line.split_once('=') else {
            continue;
        };
        let row = i + 1;
        let times: Vec<f64> = values
            .split('-')
            .map(|v| {
                parse_clock(v).ok_or_else(|| DeltaError::MalformedInput {
                    row,
                    reason: format!("cannot parse time '{}'", v.trim()),
                })
            })
            .collect::<Result<_>>()?;

        let (start, end) = match times.as_slice() {
            [at] => (*at, None),
            [a, b] => (*a, Some(*b)),
            _ => {
                return Err(DeltaError::MalformedInput {
                    row,
                    reason: format!("expected 'start-end' or a single time, got '{}'", values.trim()),
                })
            }
        };
        tags.push(Tag {
            name: name.trim().to_string(),
            start,
            end,
        });
    }
    tags.sort_by(|a, b| a.start.total_cmp(&b.start));
    Ok(tags)
}

/// Load a tag file; a missing file means no tags.
pub fn load_tags(path: &Path) -> Result<Vec<Tag>> {
    if !path.exists() {
        debug!(path = %path.display(), "No tag file");
        return Ok(Vec::new());
    }
    parse_tags(&std::fs::read_to_string(path)?)
}

/// Baseline window from tags, expressed in `unit`.
///
/// Uses the `baseline` tag when present. Otherwise, if any tags exist, a
/// baseline is invented from minute 1 up to one minute before the first tag.
pub fn baseline_from_tags(tags: &[Tag], unit: TimeUnit) -> Option<TimeWindow> {
    let (start, end) = if let Some(tag) = tags.iter().find(|t| t.name == BASELINE_TAG) {
        (tag.start, tag.end?)
    } else {
        let first = tags.first()?;
        let start = 1.0;
        let mut end = first.start - 1.0;
        if end <= start {
            end = start + 1.0;
        }
        info!(start, end, "No baseline tag; inventing one before the first tag");
        (start, end)
    };
    let factor = TimeUnit::Minutes.factor_to(unit);
    Some(TimeWindow {
        start: start * factor,
        end: end * factor,
    })
}
