//! Shared "dashboard pipeline" logic used by the CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load -> aggregate -> left join -> date filter -> KPIs/accuracy
//!
//! Loading happens once per run ([`DashboardData::load`]); every request after
//! that is a pure function of the loaded data ([`render`]).

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::{
    ActualRecord, DASHBOARD_TITLE, DashConfig, DashboardRequest, DashboardView, DateRange, ForecastRecord,
    MergedRecord, NO_ACTUALS_NOTICE,
};
use crate::error::AppError;
use crate::io::ingest::{IngestedData, load_inputs};

/// Inputs of a run after the join. Read-only once built.
#[derive(Debug, Clone)]
pub struct DashboardData {
    /// One row per forecast date, in date order.
    pub merged: Vec<MergedRecord>,
    /// Number of days with history (before the join).
    pub actual_days: usize,
    pub history_rows_read: usize,
    pub history_rows_skipped: usize,
}

impl DashboardData {
    /// Load both inputs named by the config and join them.
    pub fn load(config: &DashConfig) -> Result<Self, AppError> {
        let ingest = load_inputs(config)?;
        Ok(Self::from_ingest(ingest))
    }

    pub fn from_ingest(ingest: IngestedData) -> Self {
        Self {
            merged: merge_actuals(&ingest.forecast, &ingest.actuals),
            actual_days: ingest.actuals.len(),
            history_rows_read: ingest.history_rows_read,
            history_rows_skipped: ingest.history_rows_skipped,
        }
    }

    /// Wrap rows that are already joined (e.g. a re-imported export).
    pub fn from_merged(mut merged: Vec<MergedRecord>) -> Self {
        merged.sort_by_key(|r| r.date);
        let actual_days = merged.iter().filter(|r| r.actual_value.is_some()).count();
        Self {
            merged,
            actual_days,
            history_rows_read: 0,
            history_rows_skipped: 0,
        }
    }

    /// First and last forecast date.
    pub fn domain(&self) -> Option<DateRange> {
        date_domain(&self.merged)
    }
}

/// Left outer join of the forecast against daily actuals on date.
///
/// Every forecast row appears exactly once, in forecast order; actuals for
/// dates outside the forecast are dropped.
pub fn merge_actuals(forecast: &[ForecastRecord], actuals: &[ActualRecord]) -> Vec<MergedRecord> {
    let by_date: HashMap<NaiveDate, f64> = actuals.iter().map(|a| (a.date, a.actual_value)).collect();

    forecast
        .iter()
        .map(|f| MergedRecord {
            date: f.date,
            point_estimate: f.point_estimate,
            lower_bound: f.lower_bound,
            upper_bound: f.upper_bound,
            actual_value: by_date.get(&f.date).copied(),
        })
        .collect()
}

/// Rows whose date lies in the inclusive range. `start > end` selects nothing.
pub fn filter_range(rows: &[MergedRecord], range: DateRange) -> Vec<MergedRecord> {
    rows.iter().filter(|r| range.contains(r.date)).copied().collect()
}

/// Smallest and largest date of the rows.
pub fn date_domain(rows: &[MergedRecord]) -> Option<DateRange> {
    let start = rows.iter().map(|r| r.date).min()?;
    let end = rows.iter().map(|r| r.date).max()?;
    Some(DateRange::new(start, end))
}

/// Produce the render payload for one request.
pub fn render(data: &DashboardData, request: &DashboardRequest) -> DashboardView {
    let domain = data.domain();
    let range = request.range.or(domain);

    let rows = match range {
        Some(range) => filter_range(&data.merged, range),
        None => Vec::new(),
    };

    let kpis = crate::report::compute_kpis(&rows);
    let accuracy = crate::report::compute_accuracy(&rows);
    let notice = accuracy.is_none().then(|| NO_ACTUALS_NOTICE.to_string());

    debug!(
        range = ?range,
        rows = rows.len(),
        with_actuals = accuracy.map(|a| a.n).unwrap_or(0),
        show_ci = request.show_ci,
        "rendered dashboard"
    );

    DashboardView {
        title: DASHBOARD_TITLE.to_string(),
        domain,
        range,
        show_ci: request.show_ci,
        kpis,
        accuracy,
        notice,
        rows,
    }
}
