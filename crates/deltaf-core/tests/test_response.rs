mod common;

use approx::assert_abs_diff_eq;
use deltaf_core::error::DeltaError;
use deltaf_core::response::window_means;
use deltaf_core::series::TimeWindow;

#[test]
fn test_window_means_per_channel() {
    let time = common::seconds(6);
    let m = common::matrix(&[
        vec![0.0, 0.0, 100.0, 50.0, 0.0, 0.0],
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
    ]);
    let means = window_means(&time, &m, &TimeWindow::new(2.0, 4.0).unwrap()).unwrap();
    assert_abs_diff_eq!(means[0], 75.0);
    assert_abs_diff_eq!(means[1], 3.5);
}

#[test]
fn test_window_running_past_the_end_is_clipped() {
    let time = common::seconds(4);
    let m = common::matrix(&[vec![1.0, 2.0, 3.0, 5.0]]);
    let means = window_means(&time, &m, &TimeWindow::new(2.0, 100.0).unwrap()).unwrap();
    assert_abs_diff_eq!(means[0], 4.0);
}

#[test]
fn test_empty_response_window() {
    let time = common::seconds(4);
    let m = common::matrix(&[vec![1.0; 4]]);
    let err = window_means(&time, &m, &TimeWindow::new(10.0, 12.0).unwrap()).unwrap_err();
    assert!(matches!(err, DeltaError::EmptyWindow { .. }));
}
