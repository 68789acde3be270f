//! Export the filtered merged rows to CSV, and read such an export back.
//!
//! Column layout: `ds,yhat,yhat_lower,yhat_upper,actual_sales`.
//! Dates are ISO (`YYYY-MM-DD`), floats use Rust's shortest round-trip
//! formatting, and a missing actual is an empty cell, so a re-parsed export
//! reproduces the exact rows that were written.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tracing::info;

use crate::domain::MergedRecord;
use crate::error::AppError;
use crate::io::ingest::{
    ensure_required_columns_exist, get_optional, get_required, parse_date, parse_f64, read_header_map,
};

/// Default file name offered for the download.
pub const DEFAULT_EXPORT_FILE: &str = "forecast_vs_actual.csv";

pub const EXPORT_HEADER: [&str; 5] = ["ds", "yhat", "yhat_lower", "yhat_upper", "actual_sales"];

/// Write merged rows to a CSV file, replacing it if it exists.
pub fn write_export_csv(path: &Path, rows: &[MergedRecord]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_merged_csv(file, rows)?;
    info!(path = %path.display(), rows = rows.len(), "wrote export CSV");
    Ok(())
}

/// Serialize merged rows as UTF-8 CSV (header included) into any writer.
pub fn write_merged_csv<W: Write>(writer: W, rows: &[MergedRecord]) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(EXPORT_HEADER)
        .map_err(|e| AppError::io(format!("Failed to write export CSV header: {e}")))?;

    for r in rows {
        wtr.write_record([
            r.date.format("%Y-%m-%d").to_string(),
            r.point_estimate.to_string(),
            r.lower_bound.to_string(),
            r.upper_bound.to_string(),
            r.actual_value.map(|v| v.to_string()).unwrap_or_default(),
        ])
        .map_err(|e| AppError::io(format!("Failed to write export CSV row: {e}")))?;
    }

    wtr.flush()
        .map_err(|e| AppError::io(format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// Read a previously exported CSV file.
pub fn read_export_csv(path: &Path) -> Result<Vec<MergedRecord>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::data(format!("Failed to open export CSV '{}': {e}", path.display())))?;
    read_merged_csv(file, &path.display().to_string())
}

/// Parse an export back into merged rows, in file order.
pub fn read_merged_csv<R: Read>(reader: R, source: &str) -> Result<Vec<MergedRecord>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let header_map = read_header_map(&mut reader, source)?;
    ensure_required_columns_exist(&header_map, &EXPORT_HEADER, source)?;

    let mut out = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record =
            result.map_err(|e| AppError::data(format!("{source}:{line}: CSV parse error: {e}")))?;

        let parse = || -> Result<MergedRecord, String> {
            let actual_value = match get_optional(&record, &header_map, "actual_sales") {
                Some(s) => Some(parse_f64(s, "actual_sales")?),
                None => None,
            };
            Ok(MergedRecord {
                date: parse_date(get_required(&record, &header_map, "ds"))?,
                point_estimate: parse_f64(get_required(&record, &header_map, "yhat"), "yhat")?,
                lower_bound: parse_f64(get_required(&record, &header_map, "yhat_lower"), "yhat_lower")?,
                upper_bound: parse_f64(get_required(&record, &header_map, "yhat_upper"), "yhat_upper")?,
                actual_value,
            })
        };

        out.push(parse().map_err(|e| AppError::data(format!("{source}:{line}: {e}")))?);
    }

    Ok(out)
}
