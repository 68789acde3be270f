//! CSV ingest and normalization.
//!
//! This module turns the two input files into typed records:
//!
//! - the forecast file (`ds`, `yhat`, `yhat_lower`, `yhat_upper`) becomes
//!   date-sorted `ForecastRecord`s
//! - the raw history file (`date`, `sales`, one row per transaction) is summed
//!   per calendar day into `ActualRecord`s
//!
//! Unlike a best-effort import, any schema or parse problem is fatal: the
//! dashboard never renders from a partially loaded file.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use tracing::{debug, info, warn};

use crate::domain::{ActualRecord, DashConfig, ForecastRecord};
use crate::error::AppError;

const FORECAST_COLUMNS: [&str; 4] = ["ds", "yhat", "yhat_lower", "yhat_upper"];
const HISTORY_COLUMNS: [&str; 2] = ["date", "sales"];

/// Ingest output: both inputs plus a few counters for the status line.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub forecast: Vec<ForecastRecord>,
    pub actuals: Vec<ActualRecord>,
    /// Raw transaction rows read from the history file.
    pub history_rows_read: usize,
    /// Raw transaction rows without a `sales` value.
    pub history_rows_skipped: usize,
}

/// Load both input files named by the config.
pub fn load_inputs(config: &DashConfig) -> Result<IngestedData, AppError> {
    let forecast = load_forecast(&config.forecast_path)?;
    let history = load_history(&config.history_path)?;

    info!(
        forecast_rows = forecast.len(),
        actual_days = history.actuals.len(),
        history_rows = history.rows_read,
        "loaded inputs"
    );

    Ok(IngestedData {
        forecast,
        actuals: history.actuals,
        history_rows_read: history.rows_read,
        history_rows_skipped: history.rows_skipped,
    })
}

/// Load the forecast CSV.
pub fn load_forecast(path: &Path) -> Result<Vec<ForecastRecord>, AppError> {
    let file = open(path, "forecast")?;
    read_forecast(file, &path.display().to_string())
}

/// Aggregated history plus counters.
#[derive(Debug, Clone)]
pub struct HistoryData {
    pub actuals: Vec<ActualRecord>,
    pub rows_read: usize,
    pub rows_skipped: usize,
}

/// Load the raw history CSV and aggregate it to daily totals.
pub fn load_history(path: &Path) -> Result<HistoryData, AppError> {
    let file = open(path, "history")?;
    read_history(file, &path.display().to_string())
}

fn open(path: &Path, what: &str) -> Result<File, AppError> {
    File::open(path)
        .map_err(|e| AppError::data(format!("Failed to open {what} CSV '{}': {e}", path.display())))
}

/// Parse forecast rows from any reader. `source` is only used in messages.
pub fn read_forecast<R: Read>(reader: R, source: &str) -> Result<Vec<ForecastRecord>, AppError> {
    let mut reader = csv_reader(reader);
    let header_map = read_header_map(&mut reader, source)?;
    ensure_required_columns_exist(&header_map, &FORECAST_COLUMNS, source)?;

    let mut out = Vec::new();
    let mut seen = HashSet::new();

    for (idx, result) in reader.records().enumerate() {
        // +2: header is line 1, records are 1-based after it.
        let line = idx + 2;
        let record =
            result.map_err(|e| AppError::data(format!("{source}:{line}: CSV parse error: {e}")))?;

        let row = parse_forecast_row(&record, &header_map)
            .map_err(|e| AppError::data(format!("{source}:{line}: {e}")))?;

        if !seen.insert(row.date) {
            return Err(AppError::data(format!(
                "{source}:{line}: duplicate forecast date {}",
                row.date
            )));
        }
        out.push(row);
    }

    if out.is_empty() {
        return Err(AppError::data(format!("{source}: forecast file has no data rows.")));
    }

    out.sort_by_key(|r| r.date);
    debug!(rows = out.len(), first = %out[0].date, last = %out[out.len() - 1].date, "parsed forecast");
    Ok(out)
}

/// Parse raw transactions from any reader and sum them per date.
pub fn read_history<R: Read>(reader: R, source: &str) -> Result<HistoryData, AppError> {
    let mut reader = csv_reader(reader);
    let header_map = read_header_map(&mut reader, source)?;
    ensure_required_columns_exist(&header_map, &HISTORY_COLUMNS, source)?;

    let mut transactions = Vec::new();
    let mut rows_read = 0usize;
    let mut rows_skipped = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        rows_read += 1;
        let record =
            result.map_err(|e| AppError::data(format!("{source}:{line}: CSV parse error: {e}")))?;

        let date = parse_date(get_required(&record, &header_map, "date"))
            .map_err(|e| AppError::data(format!("{source}:{line}: {e}")))?;

        // A blank amount adds nothing, but its date still gets a daily total.
        let sales = match get_optional(&record, &header_map, "sales") {
            Some(raw) => parse_f64(raw, "sales")
                .map_err(|e| AppError::data(format!("{source}:{line}: {e}")))?,
            None => {
                rows_skipped += 1;
                0.0
            }
        };

        transactions.push((date, sales));
    }

    if rows_read == 0 {
        warn!(%source, "history file has no data rows; accuracy will be unavailable");
    }
    if rows_skipped > 0 {
        debug!(rows_skipped, "history rows without a sales value");
    }

    Ok(HistoryData {
        actuals: aggregate_daily(transactions),
        rows_read,
        rows_skipped,
    })
}

/// Sum transaction amounts per calendar date, in date order.
pub fn aggregate_daily<I>(transactions: I) -> Vec<ActualRecord>
where
    I: IntoIterator<Item = (NaiveDate, f64)>,
{
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (date, amount) in transactions {
        *by_date.entry(date).or_insert(0.0) += amount;
    }
    by_date
        .into_iter()
        .map(|(date, actual_value)| ActualRecord { date, actual_value })
        .collect()
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

pub(crate) fn read_header_map<R: Read>(
    reader: &mut csv::Reader<R>,
    source: &str,
) -> Result<HashMap<String, usize>, AppError> {
    let headers = reader
        .headers()
        .map_err(|e| AppError::data(format!("{source}: failed to read CSV headers: {e}")))?;
    Ok(build_header_map(headers))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often carry a BOM on the first header.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

pub(crate) fn ensure_required_columns_exist(
    header_map: &HashMap<String, usize>,
    required: &[&str],
    source: &str,
) -> Result<(), AppError> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| !header_map.contains_key(*name))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(AppError::data(format!(
        "{source}: missing required column(s): {}",
        missing
            .iter()
            .map(|m| format!("`{m}`"))
            .collect::<Vec<_>>()
            .join(", ")
    )))
}

fn parse_forecast_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
) -> Result<ForecastRecord, String> {
    let date = parse_date(get_required(record, header_map, "ds"))?;
    let point_estimate = parse_f64(get_required(record, header_map, "yhat"), "yhat")?;
    let lower_bound = parse_f64(get_required(record, header_map, "yhat_lower"), "yhat_lower")?;
    let upper_bound = parse_f64(get_required(record, header_map, "yhat_upper"), "yhat_upper")?;

    Ok(ForecastRecord {
        date,
        point_estimate,
        lower_bound,
        upper_bound,
    })
}

/// Value of a required column; an empty cell reads as `""` and fails to parse later.
pub(crate) fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> &'a str {
    header_map
        .get(name)
        .and_then(|idx| record.get(*idx))
        .map(str::trim)
        .unwrap_or("")
}

pub(crate) fn get_optional<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a calendar date, truncating timestamps to their date.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const DATE_FMTS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];
    const DATETIME_FMTS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

    if s.is_empty() {
        return Err("Missing date value.".to_string());
    }
    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, YYYY-MM-DD HH:MM:SS, YYYY/MM/DD, DD/MM/YYYY."
    ))
}

pub(crate) fn parse_f64(s: &str, column: &str) -> Result<f64, String> {
    if s.is_empty() {
        return Err(format!("Missing `{column}` value."));
    }
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("Invalid `{column}` value '{s}'."))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("Non-finite `{column}` value '{s}'."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn forecast_is_sorted_and_extra_columns_ignored() {
        let csv = "\u{feff}DS,trend,yhat,yhat_lower,yhat_upper\n\
                   2024-01-02,1.0,20,15,25\n\
                   2024-01-01 00:00:00,1.0,10,5,15\n";
        let rows = read_forecast(csv.as_bytes(), "forecast.csv").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, d(2024, 1, 1));
        assert_eq!(rows[1].date, d(2024, 1, 2));
        assert!((rows[1].point_estimate - 20.0).abs() < 1e-12);
        assert!((rows[0].upper_bound - 15.0).abs() < 1e-12);
    }

    #[test]
    fn forecast_missing_column_is_data_error() {
        let csv = "ds,yhat,yhat_lower\n2024-01-01,10,5\n";
        let err = read_forecast(csv.as_bytes(), "forecast.csv").unwrap_err();
        assert!(err.is_data_error());
        assert!(err.to_string().contains("`yhat_upper`"), "{err}");
    }

    #[test]
    fn forecast_bad_date_reports_line() {
        let csv = "ds,yhat,yhat_lower,yhat_upper\n2024-01-01,10,5,15\nnot-a-date,1,1,1\n";
        let err = read_forecast(csv.as_bytes(), "f.csv").unwrap_err();
        assert!(err.is_data_error());
        assert!(err.to_string().starts_with("f.csv:3:"), "{err}");
    }

    #[test]
    fn forecast_duplicate_date_is_rejected() {
        let csv = "ds,yhat,yhat_lower,yhat_upper\n2024-01-01,10,5,15\n2024-01-01,11,5,15\n";
        let err = read_forecast(csv.as_bytes(), "f.csv").unwrap_err();
        assert!(err.to_string().contains("duplicate forecast date 2024-01-01"), "{err}");
    }

    #[test]
    fn forecast_without_rows_is_rejected() {
        let csv = "ds,yhat,yhat_lower,yhat_upper\n";
        assert!(read_forecast(csv.as_bytes(), "f.csv").is_err());
    }

    #[test]
    fn history_is_summed_per_day() {
        let csv = "date,store,item,sales\n\
                   2024-01-02,1,1,5\n\
                   2024-01-01,1,1,3\n\
                   2024-01-01,2,1,4.5\n\
                   2024-01-02,2,1,\n\
                   2024-01-03,1,1,\n";
        let history = read_history(csv.as_bytes(), "train.csv").unwrap();
        assert_eq!(history.rows_read, 5);
        assert_eq!(history.rows_skipped, 2);
        assert_eq!(
            history.actuals,
            vec![
                ActualRecord { date: d(2024, 1, 1), actual_value: 7.5 },
                ActualRecord { date: d(2024, 1, 2), actual_value: 5.0 },
                // Only blank amounts that day: still a day with a zero total.
                ActualRecord { date: d(2024, 1, 3), actual_value: 0.0 },
            ]
        );
    }

    #[test]
    fn header_only_history_loads_without_actuals() {
        let history = read_history("date,sales\n".as_bytes(), "train.csv").unwrap();
        assert_eq!(history.rows_read, 0);
        assert!(history.actuals.is_empty());
    }

    #[test]
    fn history_non_numeric_sales_is_data_error() {
        let csv = "date,sales\n2024-01-01,abc\n";
        let err = read_history(csv.as_bytes(), "train.csv").unwrap_err();
        assert!(err.is_data_error());
        assert!(err.to_string().contains("Invalid `sales`"), "{err}");
    }

    #[test]
    fn history_missing_sales_column_is_data_error() {
        let csv = "date,amount\n2024-01-01,3\n";
        let err = read_history(csv.as_bytes(), "train.csv").unwrap_err();
        assert!(err.to_string().contains("`sales`"), "{err}");
    }

    #[test]
    fn parse_date_accepts_common_formats() {
        assert_eq!(parse_date("2024-03-05").unwrap(), d(2024, 3, 5));
        assert_eq!(parse_date("2024/03/05").unwrap(), d(2024, 3, 5));
        assert_eq!(parse_date("05/03/2024").unwrap(), d(2024, 3, 5));
        assert_eq!(parse_date("2024-03-05T13:45:00").unwrap(), d(2024, 3, 5));
        assert!(parse_date("March 5").is_err());
        assert!(parse_date("").is_err());
    }
}
