//! Group channels by label and summarize each group as mean ± standard error.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DeltaError, Result};
use crate::series::{check_unique_labels, IntensityMatrix, TimeAxis};

/// Caller-supplied label to group-key mapping; `None` leaves a channel ungrouped.
pub type GroupKeyFn = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// How channel labels map onto groups.
#[derive(Clone)]
pub enum GroupingRule {
    /// One group per distinct label.
    Exact,
    /// One group per pattern; a channel joins every group whose pattern its label contains.
    Substring(Vec<String>),
    /// Key is the first `tokens` pieces of the label split on `delimiter`.
    Prefix { delimiter: char, tokens: usize },
    Custom(GroupKeyFn),
}

impl fmt::Debug for GroupingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "Exact"),
            Self::Substring(p) => f.debug_tuple("Substring").field(p).finish(),
            Self::Prefix { delimiter, tokens } => f
                .debug_struct("Prefix")
                .field("delimiter", delimiter)
                .field("tokens", tokens)
                .finish(),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Serializable form of the built-in grouping rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum GroupingConfig {
    Exact,
    Substring { patterns: Vec<String> },
    Prefix {
        #[serde(default = "default_delimiter")]
        delimiter: char,
        #[serde(default = "default_tokens")]
        tokens: usize,
    },
}

fn default_delimiter() -> char {
    '_'
}

fn default_tokens() -> usize {
    1
}

impl From<&GroupingConfig> for GroupingRule {
    fn from(config: &GroupingConfig) -> Self {
        match config {
            GroupingConfig::Exact => Self::Exact,
            GroupingConfig::Substring { patterns } => Self::Substring(patterns.clone()),
            GroupingConfig::Prefix { delimiter, tokens } => Self::Prefix {
                delimiter: *delimiter,
                tokens: *tokens,
            },
        }
    }
}

impl fmt::Display for GroupingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "Exact label"),
            Self::Substring { patterns } => write!(f, "Substring ({})", patterns.join(", ")),
            Self::Prefix { delimiter, tokens } => {
                write!(f, "Prefix ({tokens} token(s) split on '{delimiter}')")
            }
        }
    }
}

/// Per-time-point statistics of one group.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupStats {
    /// Channel indices in the group.
    pub members: Vec<usize>,
    pub mean: Array1<f64>,
    /// Sample standard deviation over `sqrt(n)`.
    pub stderr: Array1<f64>,
    /// Finite member values contributing at each time point.
    pub counts: Vec<usize>,
}

/// Groups keyed by label, in lexicographic order.
pub type GroupMap = BTreeMap<String, GroupStats>;

/// Channel indices of each group under `rule`.
pub fn group_members(labels: &[String], rule: &GroupingRule) -> Result<BTreeMap<String, Vec<usize>>> {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();

    match rule {
        GroupingRule::Substring(patterns) => {
            for pattern in patterns {
                let members: Vec<usize> = labels
                    .iter()
                    .enumerate()
                    .filter(|(_, l)| l.contains(pattern.as_str()))
                    .map(|(i, _)| i)
                    .collect();
                if members.is_empty() {
                    return Err(DeltaError::DegenerateGroup {
                        group: pattern.clone(),
                    });
                }
                groups.insert(pattern.clone(), members);
            }
        }
        GroupingRule::Prefix { tokens: 0, .. } => {
            return Err(DeltaError::InvalidParameter(
                "prefix grouping needs at least one token".into(),
            ));
        }
        _ => {
            for (i, label) in labels.iter().enumerate() {
                if let Some(key) = group_key(label, rule) {
                    groups.entry(key).or_default().push(i);
                }
            }
            if groups.is_empty() {
                return Err(DeltaError::DegenerateGroup {
                    group: format!("{rule:?}"),
                });
            }
        }
    }

    Ok(groups)
}

fn group_key(label: &str, rule: &GroupingRule) -> Option<String> {
    match rule {
        GroupingRule::Exact => Some(label.to_string()),
        GroupingRule::Prefix { delimiter, tokens } => Some(
            label
                .split(*delimiter)
                .take(*tokens)
                .collect::<Vec<_>>()
                .join(&delimiter.to_string()),
        ),
        GroupingRule::Custom(f) => f(label),
        GroupingRule::Substring(_) => None,
    }
}

/// Mean, standard error, and count of the finite values.
///
/// The error is the population standard deviation over `sqrt(n)`.
/// No finite values gives NaN statistics; a single value has zero error.
pub fn mean_stderr(values: impl IntoIterator<Item = f64>) -> (f64, f64, usize) {
    let finite: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    let n = finite.len();
    match n {
        0 => (f64::NAN, f64::NAN, 0),
        1 => (finite[0], 0.0, 1),
        _ => {
            let mean = finite.iter().sum::<f64>() / n as f64;
            let var = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
            (mean, var.sqrt() / (n as f64).sqrt(), n)
        }
    }
}

fn summarize(data: &Array2<f64>, members: Vec<usize>) -> GroupStats {
    let frames = data.nrows();
    let mut mean = Array1::<f64>::zeros(frames);
    let mut stderr = Array1::<f64>::zeros(frames);
    let mut counts = Vec::with_capacity(frames);

    for t in 0..frames {
        let (m, e, n) = mean_stderr(members.iter().map(|&c| data[[t, c]]));
        mean[t] = m;
        stderr[t] = e;
        counts.push(n);
    }

    GroupStats {
        members,
        mean,
        stderr,
        counts,
    }
}

/// Mean and standard error across the channels of each group, at every time point.
///
/// All channels share the matrix's time axis.
pub fn aggregate_by_group(
    matrix: &IntensityMatrix,
    labels: &[String],
    rule: &GroupingRule,
) -> Result<GroupMap> {
    if labels.len() != matrix.n_channels() {
        return Err(DeltaError::ShapeMismatch {
            expected: format!("{} labels", matrix.n_channels()),
            actual: format!("{} labels", labels.len()),
        });
    }

    let groups = group_members(labels, rule)?;
    debug!(groups = groups.len(), rule = ?rule, "Aggregating groups");

    Ok(groups
        .into_iter()
        .map(|(key, members)| (key, summarize(matrix.data(), members)))
        .collect())
}

/// One trace acquired on its own time axis (e.g. one line-scan sweep).
#[derive(Clone, Debug)]
pub struct LabeledTrace {
    pub label: String,
    pub time: TimeAxis,
    pub values: Array1<f64>,
}

/// Aggregate traces recorded on offset time axes of equal length.
///
/// Traces are aligned sample by sample onto `common`; nothing is resampled.
pub fn aggregate_ragged(
    traces: &[LabeledTrace],
    rule: &GroupingRule,
    common: &TimeAxis,
) -> Result<GroupMap> {
    let frames = common.len();
    for trace in traces {
        if trace.values.len() != frames || trace.time.len() != frames {
            return Err(DeltaError::ShapeMismatch {
                expected: format!("{frames} samples (common axis)"),
                actual: format!(
                    "{} samples on a {}-sample axis in trace '{}'",
                    trace.values.len(),
                    trace.time.len(),
                    trace.label
                ),
            });
        }
    }

    let labels: Vec<String> = traces.iter().map(|t| t.label.clone()).collect();
    check_unique_labels(&labels)?;

    let mut data = Array2::<f64>::zeros((frames, traces.len()));
    for (c, trace) in traces.iter().enumerate() {
        data.column_mut(c).assign(&trace.values);
    }
    aggregate_by_group(&IntensityMatrix::new(data), &labels, rule)
}
