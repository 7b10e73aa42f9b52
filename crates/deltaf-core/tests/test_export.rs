mod common;

use deltaf_core::group::{aggregate_by_group, GroupingRule};
use deltaf_core::io::export::{write_delta_csv, write_delta_table, write_groups_table};
use deltaf_core::series::{TimeAxis, TimeUnit};

fn render(f: impl FnOnce(&mut Vec<u8>)) -> Vec<String> {
    let mut buf = Vec::new();
    f(&mut buf);
    String::from_utf8(buf)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_delta_table_layout() {
    let time = TimeAxis::from_period(0.5, 2, TimeUnit::Minutes).unwrap();
    let m = common::matrix(&[vec![0.0, 12.5], vec![-1.0, 3.0]]);
    let labels = common::labels(&["a", "b"]);
    let lines = render(|buf| write_delta_table(buf, &time, &m, &labels, None).unwrap());
    assert_eq!(
        lines,
        vec![
            "Frame (#),Time (min),a,b",
            "1,0.00000,0.00000,-1.00000",
            "2,0.50000,12.50000,3.00000",
        ]
    );
}

#[test]
fn test_delta_table_response_row() {
    let time = common::seconds(1);
    let m = common::matrix(&[vec![5.0]]);
    let labels = common::labels(&["a"]);
    let lines =
        render(|buf| write_delta_table(buf, &time, &m, &labels, Some(&[42.0][..])).unwrap());
    assert_eq!(lines[0], "Frame (#),Time (sec),a");
    assert_eq!(lines[1], ",Response (mean dF/F %),42.00000");
    assert_eq!(lines[2], "1,0.00000,5.00000");
}

#[test]
fn test_delta_table_label_mismatch() {
    let time = common::seconds(1);
    let m = common::matrix(&[vec![5.0]]);
    let mut buf = Vec::new();
    assert!(write_delta_table(&mut buf, &time, &m, &common::labels(&["a", "b"]), None).is_err());
}

#[test]
fn test_groups_table_layout() {
    let time = common::seconds(2);
    let m = common::matrix(&[vec![1.0, 10.0], vec![3.0, 20.0], vec![7.0, 7.0]]);
    let labels = common::labels(&["A_1", "A_2", "B_1"]);
    let rule = GroupingRule::Prefix {
        delimiter: '_',
        tokens: 1,
    };
    let groups = aggregate_by_group(&m, &labels, &rule).unwrap();
    let lines = render(|buf| write_groups_table(buf, &time, &groups).unwrap());
    assert_eq!(
        lines,
        vec![
            "Time (sec),A mean,A stderr,A n,B mean,B stderr,B n",
            "0.00000,2.00000,0.70711,2,7.00000,0.00000,1",
            "1.00000,15.00000,3.53553,2,7.00000,0.00000,1",
        ]
    );
}

#[test]
fn test_delta_csv_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dff.csv");
    let time = common::seconds(2);
    let m = common::matrix(&[vec![1.0, 2.0]]);
    write_delta_csv(&path, &time, &m, &common::labels(&["x"]), None).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("Frame (#),Time (sec),x\n"));
    assert_eq!(text.lines().count(), 3);
}
