//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between the pipeline and the presentation layers
//! - exported to CSV/JSON
//! - reloaded later from an exported CSV

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Page title shared by the TUI header and the text report.
pub const DASHBOARD_TITLE: &str = "Smart Sales Forecast Dashboard";

/// One-line description shown under the title.
pub const DASHBOARD_SUBTITLE: &str =
    "Prophet-based forecast with actuals comparison, error metrics, and export options.";

/// Notice shown in place of MAE/RMSE when the selected range has no actuals.
pub const NO_ACTUALS_NOTICE: &str = "No actuals available in selected range.";

/// One forecast row (`ds`, `yhat`, `yhat_lower`, `yhat_upper`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub date: NaiveDate,
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Observed sales for one calendar day (sum over all raw transactions that day).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActualRecord {
    pub date: NaiveDate,
    pub actual_value: f64,
}

/// A forecast row left-joined with the actuals for the same date.
///
/// `actual_value` is `None` for dates without history (typically the future).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub date: NaiveDate,
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub actual_value: Option<f64>,
}

impl MergedRecord {
    /// `actual - point_estimate`, when an actual exists.
    pub fn error(&self) -> Option<f64> {
        self.actual_value.map(|a| a - self.point_estimate)
    }
}

/// Inclusive calendar-date range.
///
/// `start > end` is allowed and simply selects nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} → {}", self.start, self.end)
    }
}

/// Everything a single render depends on.
///
/// Each user interaction builds a fresh request; there is no state carried
/// between renders besides the loaded input data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardRequest {
    /// `None` selects the full forecast domain.
    pub range: Option<DateRange>,
    /// Whether the chart shows the `yhat_lower..yhat_upper` band.
    pub show_ci: bool,
}

impl Default for DashboardRequest {
    fn default() -> Self {
        Self {
            range: None,
            show_ci: true,
        }
    }
}

/// Summary metrics over the point estimates of the filtered rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub days: usize,
    pub total: f64,
    /// Absent when the filtered set is empty.
    pub average: Option<f64>,
    /// Date of the highest point estimate (first one wins on ties).
    pub peak_day: Option<NaiveDate>,
}

/// Forecast accuracy over the filtered rows that have actuals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Accuracy {
    /// Number of rows with an actual value.
    pub n: usize,
    pub mae: f64,
    pub rmse: f64,
}

/// The render payload for one request.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub title: String,
    /// Full date domain of the merged data (`None` only for an empty forecast).
    pub domain: Option<DateRange>,
    /// The range actually applied (the request's range, or the domain).
    pub range: Option<DateRange>,
    pub show_ci: bool,
    pub kpis: Kpis,
    pub accuracy: Option<Accuracy>,
    /// Set when accuracy is unavailable.
    pub notice: Option<String>,
    pub rows: Vec<MergedRecord>,
}

/// A run's configuration as understood by the front-ends.
///
/// This is derived from CLI flags, then `.env`/environment, then defaults.
#[derive(Debug, Clone)]
pub struct DashConfig {
    pub forecast_path: PathBuf,
    pub history_path: PathBuf,
    pub export_path: PathBuf,
    /// Requested first date; `None` means the first forecast date.
    pub start: Option<NaiveDate>,
    /// Requested last date; `None` means the last forecast date.
    pub end: Option<NaiveDate>,
    pub show_ci: bool,
}

impl DashConfig {
    /// Build the initial request, filling an open end of the range from `domain`.
    pub fn request(&self, domain: Option<DateRange>) -> DashboardRequest {
        let range = match (self.start, self.end, domain) {
            (None, None, _) => None,
            (Some(start), Some(end), _) => Some(DateRange::new(start, end)),
            (Some(start), None, Some(d)) => Some(DateRange::new(start, d.end)),
            (None, Some(end), Some(d)) => Some(DateRange::new(d.start, end)),
            (_, _, None) => None,
        };
        DashboardRequest {
            range,
            show_ci: self.show_ci,
        }
    }
}
