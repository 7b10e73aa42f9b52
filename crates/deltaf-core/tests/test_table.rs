mod common;

use deltaf_core::error::DeltaError;
use deltaf_core::io::source::{load_series, SeriesSource, TimeSource, Timing};
use deltaf_core::io::table::{load_table, parse_table, FirstColumn, TableOptions};
use deltaf_core::series::TimeUnit;

fn opts(first_column: FirstColumn) -> TableOptions {
    TableOptions {
        delimiter: ',',
        first_column,
    }
}

// ---------------------------------------------------------------------------
// Well-formed tables
// ---------------------------------------------------------------------------

#[test]
fn test_frame_index_column_is_discarded() {
    let text = " ,Mean1,Mean2\n1,10,20\n2,11,21\n3,12,22\n";
    let table = parse_table(text, &opts(FirstColumn::FrameIndex)).unwrap();
    assert_eq!(table.labels, vec!["Mean1", "Mean2"]);
    assert_eq!(table.data.dim(), (3, 2));
    assert_eq!(table.data[[2, 1]], 22.0);
    assert!(table.times.is_none());
    assert!(!table.dropped_trailing_row);
}

#[test]
fn test_time_column_is_kept() {
    let text = "time,a\n0.5,1\n1.5,2\n";
    let table = parse_table(text, &opts(FirstColumn::Time)).unwrap();
    assert_eq!(table.times, Some(vec![0.5, 1.5]));
    assert_eq!(table.labels, vec!["a"]);
}

#[test]
fn test_every_column_is_a_channel() {
    let text = "a\tb\n1\t2\n";
    let table = parse_table(
        text,
        &TableOptions {
            delimiter: '\t',
            first_column: FirstColumn::Channel,
        },
    )
    .unwrap();
    assert_eq!(table.labels, vec!["a", "b"]);
    assert_eq!(table.data.dim(), (1, 2));
}

#[test]
fn test_blank_header_names_are_numbered() {
    let text = "frame,,b\n1,2,3\n";
    let table = parse_table(text, &opts(FirstColumn::FrameIndex)).unwrap();
    assert_eq!(table.labels, vec!["ch0", "b"]);
}

// ---------------------------------------------------------------------------
// Malformed tables
// ---------------------------------------------------------------------------

#[test]
fn test_non_numeric_cell_reports_row() {
    let text = "f,a,b\n1,1,2\n2,3,4\n3,x,6\n4,7,8\n";
    let err = parse_table(text, &opts(FirstColumn::FrameIndex)).unwrap_err();
    match err {
        DeltaError::MalformedInput { row, reason } => {
            assert_eq!(row, 3);
            assert!(reason.contains("'x'"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_short_third_row_of_five_reports_row_three() {
    let text = "f,a,b\n1,1,2\n2,3,4\n3,5\n4,7,8\n5,9,10\n";
    match parse_table(text, &opts(FirstColumn::FrameIndex)).unwrap_err() {
        DeltaError::MalformedInput { row, reason } => {
            assert_eq!(row, 3);
            assert_eq!(reason, "row has 2 cells, header has 3");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_short_row_in_the_middle_is_an_error() {
    let text = "f,a,b\n1,1,2\n2,3\n3,5,6\n";
    let err = parse_table(text, &opts(FirstColumn::FrameIndex)).unwrap_err();
    assert!(matches!(err, DeltaError::MalformedInput { row: 2, .. }));
}

#[test]
fn test_blank_cell_in_the_middle_is_an_error() {
    let text = "f,a,b\n1,1,2\n2,,4\n3,5,6\n";
    let err = parse_table(text, &opts(FirstColumn::FrameIndex)).unwrap_err();
    assert!(matches!(err, DeltaError::MalformedInput { row: 2, .. }));
}

#[test]
fn test_extra_cells_are_an_error_even_on_the_last_row() {
    let text = "f,a\n1,1\n2,2,9\n";
    let err = parse_table(text, &opts(FirstColumn::FrameIndex)).unwrap_err();
    assert!(matches!(err, DeltaError::MalformedInput { row: 2, .. }));
}

#[test]
fn test_non_finite_values_are_rejected() {
    let text = "f,a\n1,NaN\n2,1\n";
    let err = parse_table(text, &opts(FirstColumn::FrameIndex)).unwrap_err();
    assert!(matches!(err, DeltaError::MalformedInput { row: 1, .. }));
}

#[test]
fn test_duplicate_labels_are_rejected() {
    let text = "f,a,a\n1,1,2\n";
    let err = parse_table(text, &opts(FirstColumn::FrameIndex)).unwrap_err();
    assert!(matches!(err, DeltaError::MalformedInput { row: 0, .. }));
}

// ---------------------------------------------------------------------------
// Trailing rows
// ---------------------------------------------------------------------------

#[test]
fn test_short_trailing_row_is_dropped() {
    let text = "f,a,b\n1,1,2\n2,3,4\n3,5\n";
    let table = parse_table(text, &opts(FirstColumn::FrameIndex)).unwrap();
    assert_eq!(table.data.nrows(), 2);
    assert!(table.dropped_trailing_row);
}

#[test]
fn test_trailing_row_with_blank_cell_is_dropped() {
    let text = "f,a,b\n1,1,2\n2,3,4\n3,5,\n";
    let table = parse_table(text, &opts(FirstColumn::FrameIndex)).unwrap();
    assert_eq!(table.data.nrows(), 2);
}

#[test]
fn test_trailing_blank_lines_are_ignored() {
    let text = "f,a\n1,1\n2,2\n\n\n";
    let table = parse_table(text, &opts(FirstColumn::FrameIndex)).unwrap();
    assert_eq!(table.data.nrows(), 2);
    assert!(!table.dropped_trailing_row);
}

// ---------------------------------------------------------------------------
// Files and time axes
// ---------------------------------------------------------------------------

#[test]
fn test_load_table_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let text = common::multi_measure_csv(&["r1", "r2"], &[vec![1.0, 2.0], vec![3.0, 4.0]]);
    let path = common::write_file(dir.path(), "results.csv", &text);
    let table = load_table(&path, &TableOptions::default()).unwrap();
    assert_eq!(table.labels, vec!["r1", "r2"]);
    assert_eq!(table.data[[1, 0]], 2.0);
}

#[test]
fn test_missing_file_is_io_error() {
    let err = load_table(
        std::path::Path::new("/nonexistent/results.csv"),
        &TableOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, DeltaError::Io(_)));
}

#[test]
fn test_load_series_with_period() {
    let dir = tempfile::tempdir().unwrap();
    let text = common::multi_measure_csv(&["a"], &[vec![1.0, 2.0, 3.0]]);
    let path = common::write_file(dir.path(), "t.csv", &text);
    let source = SeriesSource::Table {
        path,
        options: TableOptions::default(),
    };
    let timing = Timing {
        unit: TimeUnit::Seconds,
        source: TimeSource::Period { period: 2.5 },
    };
    let loaded = load_series(&source, &timing).unwrap();
    assert_eq!(loaded.series.time.values().to_vec(), vec![0.0, 2.5, 5.0]);
    assert!(loaded.warnings.is_empty());
}

#[test]
fn test_load_series_with_time_column_in_minutes() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_file(dir.path(), "t.csv", "time,a\n10,1\n10.5,2\n11,3\n");
    let source = SeriesSource::Table {
        path,
        options: opts(FirstColumn::Time),
    };
    let timing = Timing {
        unit: TimeUnit::Seconds,
        source: TimeSource::Column {
            unit: TimeUnit::Minutes,
        },
    };
    let loaded = load_series(&source, &timing).unwrap();
    assert_eq!(loaded.series.time.values().to_vec(), vec![0.0, 30.0, 60.0]);
}

#[test]
fn test_time_column_requires_time_first_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_file(dir.path(), "t.csv", "f,a\n1,1\n");
    let source = SeriesSource::Table {
        path,
        options: TableOptions::default(),
    };
    let timing = Timing {
        unit: TimeUnit::Seconds,
        source: TimeSource::Column {
            unit: TimeUnit::Seconds,
        },
    };
    assert!(matches!(
        load_series(&source, &timing).unwrap_err(),
        DeltaError::Config(_)
    ));
}
