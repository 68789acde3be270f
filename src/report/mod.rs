//! Reporting utilities: KPIs, accuracy metrics, and formatted terminal output.

use chrono::NaiveDate;

use crate::domain::{Accuracy, Kpis, MergedRecord};

pub mod format;

pub use format::*;

/// Total, mean and peak day of the point estimates.
///
/// An empty slice yields `total = 0` with no average or peak day.
pub fn compute_kpis(rows: &[MergedRecord]) -> Kpis {
    let total: f64 = rows.iter().map(|r| r.point_estimate).sum();
    let average = if rows.is_empty() {
        None
    } else {
        Some(total / rows.len() as f64)
    };

    Kpis {
        days: rows.len(),
        total,
        average,
        peak_day: peak_day(rows),
    }
}

/// Date of the highest point estimate; the earliest row wins a tie.
///
/// Rows are expected in date order (the pipeline keeps them sorted).
fn peak_day(rows: &[MergedRecord]) -> Option<NaiveDate> {
    let mut best: Option<&MergedRecord> = None;
    for r in rows {
        match best {
            Some(b) if r.point_estimate <= b.point_estimate => {}
            _ => best = Some(r),
        }
    }
    best.map(|r| r.date)
}

/// MAE and RMSE over rows with an actual value.
///
/// Returns `None` when no row has an actual, instead of dividing by zero.
pub fn compute_accuracy(rows: &[MergedRecord]) -> Option<Accuracy> {
    let errors: Vec<f64> = rows.iter().filter_map(MergedRecord::error).collect();
    if errors.is_empty() {
        return None;
    }

    let n = errors.len() as f64;
    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let mse = errors.iter().map(|e| e * e).sum::<f64>() / n;

    Some(Accuracy {
        n: errors.len(),
        mae,
        rmse: mse.sqrt(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(day: u32, yhat: f64, actual: Option<f64>) -> MergedRecord {
        MergedRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            point_estimate: yhat,
            lower_bound: yhat - 1.0,
            upper_bound: yhat + 1.0,
            actual_value: actual,
        }
    }

    #[test]
    fn kpis_basic() {
        let rows = vec![row(1, 10.0, Some(12.0)), row(2, 20.0, None), row(3, 30.0, None)];
        let kpis = compute_kpis(&rows);
        assert_eq!(kpis.days, 3);
        assert!((kpis.total - 60.0).abs() < 1e-12);
        assert!((kpis.average.unwrap() - 20.0).abs() < 1e-12);
        assert_eq!(kpis.peak_day, NaiveDate::from_ymd_opt(2024, 1, 3));
    }

    #[test]
    fn peak_day_tie_prefers_earliest() {
        let rows = vec![row(1, 5.0, None), row(2, 9.0, None), row(3, 9.0, None), row(4, 1.0, None)];
        assert_eq!(compute_kpis(&rows).peak_day, NaiveDate::from_ymd_opt(2024, 1, 2));
    }

    #[test]
    fn kpis_empty_set_is_guarded() {
        let kpis = compute_kpis(&[]);
        assert_eq!(kpis.days, 0);
        assert_eq!(kpis.total, 0.0);
        assert!(kpis.average.is_none());
        assert!(kpis.peak_day.is_none());
    }

    #[test]
    fn accuracy_uses_only_rows_with_actuals() {
        let rows = vec![row(1, 10.0, Some(12.0)), row(2, 20.0, None), row(3, 30.0, None)];
        let acc = compute_accuracy(&rows).unwrap();
        assert_eq!(acc.n, 1);
        assert!((acc.mae - 2.0).abs() < 1e-12);
        assert!((acc.rmse - 2.0).abs() < 1e-12);
    }

    #[test]
    fn accuracy_mae_and_rmse_differ_for_mixed_errors() {
        // errors: +1, -3 -> MAE 2, RMSE sqrt(5)
        let rows = vec![row(1, 10.0, Some(11.0)), row(2, 10.0, Some(7.0))];
        let acc = compute_accuracy(&rows).unwrap();
        assert!((acc.mae - 2.0).abs() < 1e-12);
        assert!((acc.rmse - 5.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn accuracy_unavailable_without_actuals() {
        let rows = vec![row(1, 10.0, None), row(2, 20.0, None)];
        assert!(compute_accuracy(&rows).is_none());
        assert!(compute_accuracy(&[]).is_none());
    }
}
