mod common;

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use deltaf_core::error::DeltaError;
use deltaf_core::group::{
    aggregate_by_group, aggregate_ragged, group_members, mean_stderr, GroupingConfig,
    GroupingRule, LabeledTrace,
};
use deltaf_core::series::{TimeAxis, TimeUnit};
use ndarray::Array1;

fn prefix() -> GroupingRule {
    GroupingRule::Prefix {
        delimiter: '_',
        tokens: 1,
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[test]
fn test_mean_stderr_uses_population_deviation() {
    let (mean, stderr, n) = mean_stderr([2.0, 4.0, 6.0]);
    assert_abs_diff_eq!(mean, 4.0, epsilon = 1e-12);
    // population std = sqrt(8 / 3)
    assert_abs_diff_eq!(stderr, (8.0f64 / 3.0).sqrt() / 3f64.sqrt(), epsilon = 1e-12);
    assert_eq!(n, 3);
}

#[test]
fn test_mean_stderr_of_two_values() {
    let (mean, stderr, n) = mean_stderr([1.0, 3.0]);
    assert_abs_diff_eq!(mean, 2.0, epsilon = 1e-12);
    assert_abs_diff_eq!(stderr, 1.0 / 2f64.sqrt(), epsilon = 1e-12);
    assert_eq!(n, 2);
}

#[test]
fn test_mean_stderr_edge_counts() {
    assert_eq!(mean_stderr([7.0]), (7.0, 0.0, 1));
    let (mean, stderr, n) = mean_stderr([f64::NAN]);
    assert!(mean.is_nan() && stderr.is_nan());
    assert_eq!(n, 0);
}

// ---------------------------------------------------------------------------
// Grouping rules
// ---------------------------------------------------------------------------

#[test]
fn test_prefix_groups_two_by_two() {
    let m = common::matrix(&[
        vec![1.0, 10.0],
        vec![3.0, 20.0],
        vec![5.0, 0.0],
        vec![5.0, 4.0],
    ]);
    let labels = common::labels(&["A_1", "A_2", "B_1", "B_2"]);
    let groups = aggregate_by_group(&m, &labels, &prefix()).unwrap();

    assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["A", "B"]);

    let a = &groups["A"];
    assert_eq!(a.members, vec![0, 1]);
    assert_abs_diff_eq!(a.mean[0], 2.0, epsilon = 1e-12);
    assert_abs_diff_eq!(a.mean[1], 15.0, epsilon = 1e-12);
    // values 1 and 3: population std 1, stderr 1 / sqrt(2)
    assert_abs_diff_eq!(a.stderr[0], 1.0 / 2f64.sqrt(), epsilon = 1e-12);
    assert_abs_diff_eq!(a.stderr[1], 5.0 / 2f64.sqrt(), epsilon = 1e-12);
    assert_eq!(a.counts, vec![2, 2]);

    let b = &groups["B"];
    assert_abs_diff_eq!(b.mean[0], 5.0, epsilon = 1e-12);
    assert_abs_diff_eq!(b.stderr[0], 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(b.mean[1], 2.0, epsilon = 1e-12);
}

#[test]
fn test_prefix_with_more_tokens() {
    let labels = common::labels(&["ctl_cell_1", "ctl_cell_2", "ctl_bg_1"]);
    let rule = GroupingRule::Prefix {
        delimiter: '_',
        tokens: 2,
    };
    let groups = group_members(&labels, &rule).unwrap();
    assert_eq!(groups["ctl_cell"], vec![0, 1]);
    assert_eq!(groups["ctl_bg"], vec![2]);
}

#[test]
fn test_zero_prefix_tokens_rejected() {
    let rule = GroupingRule::Prefix {
        delimiter: '_',
        tokens: 0,
    };
    assert!(matches!(
        group_members(&common::labels(&["a"]), &rule),
        Err(DeltaError::InvalidParameter(_))
    ));
}

#[test]
fn test_exact_rule_gives_singletons() {
    let labels = common::labels(&["b", "a"]);
    let groups = group_members(&labels, &GroupingRule::Exact).unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups["a"], vec![1]);
}

#[test]
fn test_substring_groups_may_overlap() {
    let labels = common::labels(&["soma_gfp", "dend_gfp", "soma_rfp"]);
    let rule = GroupingRule::Substring(vec!["soma".into(), "gfp".into()]);
    let groups = group_members(&labels, &rule).unwrap();
    assert_eq!(groups["soma"], vec![0, 2]);
    assert_eq!(groups["gfp"], vec![0, 1]);
}

#[test]
fn test_substring_without_members_is_degenerate() {
    let labels = common::labels(&["soma_gfp", "dend_gfp"]);
    let rule = GroupingRule::Substring(vec!["gfp".into(), "axon".into()]);
    match group_members(&labels, &rule).unwrap_err() {
        DeltaError::DegenerateGroup { group } => assert_eq!(group, "axon"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_custom_rule_can_skip_channels() {
    let m = common::matrix(&[vec![1.0], vec![3.0], vec![100.0]]);
    let labels = common::labels(&["cell1", "cell2", "background"]);
    let rule = GroupingRule::Custom(Arc::new(|label: &str| {
        label.starts_with("cell").then(|| "cells".to_string())
    }));
    let groups = aggregate_by_group(&m, &labels, &rule).unwrap();
    assert_eq!(groups.len(), 1);
    assert_abs_diff_eq!(groups["cells"].mean[0], 2.0, epsilon = 1e-12);
}

#[test]
fn test_custom_rule_that_matches_nothing_is_degenerate() {
    let rule = GroupingRule::Custom(Arc::new(|_: &str| None));
    assert!(matches!(
        group_members(&common::labels(&["a"]), &rule),
        Err(DeltaError::DegenerateGroup { .. })
    ));
}

#[test]
fn test_label_count_must_match_channels() {
    let m = common::matrix(&[vec![1.0], vec![2.0]]);
    let err = aggregate_by_group(&m, &common::labels(&["a"]), &GroupingRule::Exact).unwrap_err();
    assert!(matches!(err, DeltaError::ShapeMismatch { .. }));
}

#[test]
fn test_non_finite_members_are_excluded() {
    let m = common::matrix(&[vec![2.0], vec![f64::NAN], vec![4.0]]);
    let labels = common::labels(&["x_1", "x_2", "x_3"]);
    let groups = aggregate_by_group(&m, &labels, &prefix()).unwrap();
    assert_abs_diff_eq!(groups["x"].mean[0], 3.0, epsilon = 1e-12);
    assert_eq!(groups["x"].counts, vec![2]);
}

#[test]
fn test_grouping_config_converts_to_rule() {
    let config = GroupingConfig::Prefix {
        delimiter: '-',
        tokens: 2,
    };
    let rule = GroupingRule::from(&config);
    assert!(matches!(
        rule,
        GroupingRule::Prefix {
            delimiter: '-',
            tokens: 2
        }
    ));
    assert_eq!(config.to_string(), "Prefix (2 token(s) split on '-')");
}

// ---------------------------------------------------------------------------
// Ragged traces
// ---------------------------------------------------------------------------

fn trace(label: &str, offset: f64, values: &[f64]) -> LabeledTrace {
    let stamps: Vec<f64> = (0..values.len()).map(|i| offset + i as f64).collect();
    LabeledTrace {
        label: label.to_string(),
        time: TimeAxis::from_timestamps(&stamps, TimeUnit::Seconds, TimeUnit::Seconds).unwrap(),
        values: Array1::from(values.to_vec()),
    }
}

#[test]
fn test_ragged_traces_align_by_sample() {
    let traces = vec![
        trace("line_1", 0.0, &[1.0, 2.0, 3.0]),
        trace("line_2", 0.37, &[3.0, 4.0, 5.0]),
    ];
    let common_axis = common::seconds(3);
    let groups = aggregate_ragged(&traces, &prefix(), &common_axis).unwrap();
    let line = &groups["line"];
    assert_eq!(line.mean.to_vec(), vec![2.0, 3.0, 4.0]);
    assert_eq!(line.counts, vec![2, 2, 2]);
}

#[test]
fn test_ragged_length_mismatch() {
    let traces = vec![trace("a_1", 0.0, &[1.0, 2.0]), trace("a_2", 0.0, &[1.0])];
    let err = aggregate_ragged(&traces, &prefix(), &common::seconds(2)).unwrap_err();
    assert!(matches!(err, DeltaError::ShapeMismatch { .. }));
}
