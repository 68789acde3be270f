//! End-to-end: CSV files on disk -> join -> filter -> KPIs -> export -> re-import.

use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use sales_dash::app::pipeline::{self, DashboardData};
use sales_dash::domain::{DashConfig, DashboardRequest, DateRange, NO_ACTUALS_NOTICE};
use sales_dash::error::EXIT_DATA;
use sales_dash::io::export::{read_export_csv, write_export_csv};

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

/// Fresh scratch directory per test.
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sales-dash-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_inputs(dir: &PathBuf, forecast: &str, history: &str) -> DashConfig {
    let forecast_path = dir.join("forecast.csv");
    let history_path = dir.join("train.csv");
    fs::write(&forecast_path, forecast).unwrap();
    fs::write(&history_path, history).unwrap();
    DashConfig {
        forecast_path,
        history_path,
        export_path: dir.join("out.csv"),
        start: None,
        end: None,
        show_ci: true,
    }
}

const FORECAST: &str = "\
ds,yhat,yhat_lower,yhat_upper
2024-01-01,10,8,12
2024-01-02,20,17,23
2024-01-03,30,26,34
";

const HISTORY: &str = "\
date,sales
2024-01-01,5
2024-01-01,7
2023-12-31,99
";

#[test]
fn full_range_matches_worked_example() {
    let dir = scratch("full");
    let config = write_inputs(&dir, FORECAST, HISTORY);

    let data = DashboardData::load(&config).unwrap();
    assert_eq!(data.merged.len(), 3);
    assert_eq!(data.history_rows_read, 3);

    let view = pipeline::render(&data, &config.request(data.domain()));
    assert_eq!(view.range, Some(DateRange::new(d(1), d(3))));
    assert!((view.kpis.total - 60.0).abs() < 1e-12);
    assert!((view.kpis.average.unwrap() - 20.0).abs() < 1e-12);
    assert_eq!(view.kpis.peak_day, Some(d(3)));

    let acc = view.accuracy.unwrap();
    assert_eq!(acc.n, 1);
    assert!((acc.mae - 2.0).abs() < 1e-12);
    assert!((acc.rmse - 2.0).abs() < 1e-12);
    assert_eq!(view.rows[0].actual_value, Some(12.0));
    assert_eq!(view.rows[1].actual_value, None);
}

#[test]
fn future_only_range_reports_notice() {
    let dir = scratch("future");
    let config = write_inputs(&dir, FORECAST, HISTORY);
    let data = DashboardData::load(&config).unwrap();

    let request = DashboardRequest {
        range: Some(DateRange::new(d(2), d(3))),
        show_ci: false,
    };
    let view = pipeline::render(&data, &request);
    assert_eq!(view.rows.len(), 2);
    assert!(view.accuracy.is_none());
    assert_eq!(view.notice.as_deref(), Some(NO_ACTUALS_NOTICE));
}

#[test]
fn export_then_reimport_preserves_rows() {
    let dir = scratch("export");
    let config = write_inputs(&dir, FORECAST, HISTORY);
    let data = DashboardData::load(&config).unwrap();
    let view = pipeline::render(&data, &DashboardRequest::default());

    write_export_csv(&config.export_path, &view.rows).unwrap();
    let text = fs::read_to_string(&config.export_path).unwrap();
    assert!(text.starts_with("ds,yhat,yhat_lower,yhat_upper,actual_sales\n"));
    assert!(text.contains("2024-01-02,20,17,23,\n"), "{text}");

    let back = read_export_csv(&config.export_path).unwrap();
    assert_eq!(back, view.rows);

    // Re-rendering the export gives the same KPIs.
    let again = pipeline::render(&DashboardData::from_merged(back), &DashboardRequest::default());
    assert_eq!(again.kpis, view.kpis);
}

#[test]
fn missing_column_is_data_error() {
    let dir = scratch("missing-col");
    let config = write_inputs(&dir, "ds,yhat,yhat_lower\n2024-01-01,1,0\n", HISTORY);
    let err = DashboardData::load(&config).unwrap_err();
    assert_eq!(err.exit_code(), EXIT_DATA);
    assert!(err.to_string().contains("yhat_upper"), "{err}");
}

#[test]
fn missing_file_is_data_error() {
    let dir = scratch("missing-file");
    let mut config = write_inputs(&dir, FORECAST, HISTORY);
    config.history_path = dir.join("nope.csv");
    let err = DashboardData::load(&config).unwrap_err();
    assert_eq!(err.exit_code(), EXIT_DATA);
    assert!(err.to_string().contains("nope.csv"), "{err}");
}

#[test]
fn unwritable_export_is_io_error() {
    let dir = scratch("bad-export");
    let config = write_inputs(&dir, FORECAST, HISTORY);
    let data = DashboardData::load(&config).unwrap();
    let view = pipeline::render(&data, &DashboardRequest::default());
    let err = write_export_csv(&dir.join("no-such-dir").join("out.csv"), &view.rows).unwrap_err();
    assert_eq!(err.exit_code(), sales_dash::error::EXIT_IO);
}

#[test]
fn empty_history_renders_with_notice() {
    let dir = scratch("empty-history");
    let config = write_inputs(&dir, FORECAST, "date,sales\n");

    let data = DashboardData::load(&config).unwrap();
    assert_eq!(data.merged.len(), 3);
    assert_eq!(data.actual_days, 0);

    let view = pipeline::render(&data, &DashboardRequest::default());
    assert!(view.rows.iter().all(|r| r.actual_value.is_none()));
    assert!(view.accuracy.is_none());
    assert_eq!(view.notice.as_deref(), Some(NO_ACTUALS_NOTICE));
    assert!((view.kpis.total - 60.0).abs() < 1e-12);
}

#[test]
fn blank_sales_day_counts_as_zero_actual() {
    let dir = scratch("blank-sales");
    let config = write_inputs(&dir, FORECAST, "date,sales\n2024-01-01,12\n2024-01-02,\n");

    let data = DashboardData::load(&config).unwrap();
    assert_eq!(data.history_rows_skipped, 1);
    assert_eq!(data.merged[1].actual_value, Some(0.0));

    let view = pipeline::render(&data, &DashboardRequest::default());
    let acc = view.accuracy.unwrap();
    // Errors: +2 on day 1, -20 on day 2.
    assert_eq!(acc.n, 2);
    assert!((acc.mae - 11.0).abs() < 1e-12);
    assert!((acc.rmse - 202.0_f64.sqrt()).abs() < 1e-12);
}
