//! Formatted terminal output for the text report.
//!
//! We keep formatting code in one place so:
//! - the pipeline code stays clean and testable
//! - the TUI and the text report show identical labels and number formats

use crate::domain::{DASHBOARD_SUBTITLE, DashboardView, Kpis, MergedRecord};

/// KPI tile labels, in display order.
pub const KPI_LABELS: [&str; 3] = ["Total Forecasted Sales", "Avg Daily Sales", "Peak Day"];

/// Title of the collapsible table.
pub const TABLE_TITLE: &str = "View Forecast + Actual Data";

/// Format the header, range, KPIs and accuracy line.
pub fn format_summary(view: &DashboardView) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {} ===\n", view.title));
    out.push_str(DASHBOARD_SUBTITLE);
    out.push('\n');

    let domain = view
        .domain
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());
    let range = view
        .range
        .map(|r| r.to_string())
        .unwrap_or_else(|| "-".to_string());
    out.push_str(&format!("Data: {domain} | Selected: {range} | days={}\n", view.kpis.days));
    out.push('\n');

    for (label, value) in KPI_LABELS.iter().zip(kpi_values(&view.kpis)) {
        out.push_str(&format!("{label:<24} {value}\n"));
    }
    out.push('\n');

    out.push_str(&accuracy_line(view));
    out.push('\n');

    out
}

/// KPI values formatted for display, matching `KPI_LABELS`.
pub fn kpi_values(kpis: &Kpis) -> [String; 3] {
    [
        fmt_amount(kpis.total),
        kpis.average.map(fmt_amount).unwrap_or_else(|| "-".to_string()),
        kpis.peak_day
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string()),
    ]
}

/// `MAE: x | RMSE: y`, or the no-actuals notice.
pub fn accuracy_line(view: &DashboardView) -> String {
    match (&view.accuracy, &view.notice) {
        (Some(acc), _) => format!("MAE: {:.2} | RMSE: {:.2} (n={})", acc.mae, acc.rmse, acc.n),
        (None, Some(notice)) => notice.clone(),
        (None, None) => String::new(),
    }
}

/// Format up to `max_rows` merged rows as a fixed-width table.
pub fn format_table(rows: &[MergedRecord], max_rows: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("{TABLE_TITLE}:\n"));
    out.push_str(
        format!(
            "{:<10} {:>14} {:>14} {:>14} {:>14}\n",
            "ds", "yhat", "yhat_lower", "yhat_upper", "actual_sales"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!("{:-<10} {:-<14} {:-<14} {:-<14} {:-<14}\n", "", "", "", "", "").trim_end(),
    );
    out.push('\n');

    for r in rows.iter().take(max_rows) {
        let cells = table_cells(r);
        out.push_str(
            format!(
                "{:<10} {:>14} {:>14} {:>14} {:>14}\n",
                cells[0], cells[1], cells[2], cells[3], cells[4]
            )
            .trim_end(),
        );
        out.push('\n');
    }

    if rows.len() > max_rows {
        out.push_str(&format!("... {} more row(s)\n", rows.len() - max_rows));
    }

    out
}

/// One table row as display strings (shared with the TUI table).
pub fn table_cells(r: &MergedRecord) -> [String; 5] {
    [
        r.date.to_string(),
        format!("{:.2}", r.point_estimate),
        format!("{:.2}", r.lower_bound),
        format!("{:.2}", r.upper_bound),
        r.actual_value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string()),
    ]
}

/// Two decimals with `,` thousands separators (`1234567.891` -> `1,234,567.89`).
pub fn fmt_amount(v: f64) -> String {
    if !v.is_finite() {
        return format!("{v}");
    }
    let fixed = format!("{:.2}", v.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    // `-0.001` rounds to `0.00`; don't print it as negative.
    let sign = if v < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::domain::{Accuracy, DateRange, Kpis};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn view(accuracy: Option<Accuracy>, notice: Option<&str>) -> DashboardView {
        DashboardView {
            title: "Smart Sales Forecast Dashboard".to_string(),
            domain: Some(DateRange::new(d(1), d(3))),
            range: Some(DateRange::new(d(1), d(3))),
            show_ci: true,
            kpis: Kpis {
                days: 3,
                total: 60.0,
                average: Some(20.0),
                peak_day: Some(d(3)),
            },
            accuracy,
            notice: notice.map(str::to_string),
            rows: Vec::new(),
        }
    }

    #[test]
    fn fmt_amount_groups_thousands() {
        assert_eq!(fmt_amount(0.0), "0.00");
        assert_eq!(fmt_amount(999.999), "1,000.00");
        assert_eq!(fmt_amount(1234567.891), "1,234,567.89");
        assert_eq!(fmt_amount(-12345.5), "-12,345.50");
        assert_eq!(fmt_amount(-0.001), "0.00");
        assert_eq!(fmt_amount(100.0), "100.00");
    }

    #[test]
    fn summary_lists_kpis_and_accuracy() {
        let txt = format_summary(&view(Some(Accuracy { n: 1, mae: 2.0, rmse: 2.0 }), None));
        assert!(txt.starts_with("=== Smart Sales Forecast Dashboard ===\n"));
        assert!(txt.contains("Total Forecasted Sales   60.00\n"), "{txt}");
        assert!(txt.contains("Avg Daily Sales          20.00\n"), "{txt}");
        assert!(txt.contains("Peak Day                 2024-01-03\n"), "{txt}");
        assert!(txt.contains("MAE: 2.00 | RMSE: 2.00 (n=1)"), "{txt}");
    }

    #[test]
    fn summary_shows_notice_without_actuals() {
        let txt = format_summary(&view(None, Some("No actuals available in selected range.")));
        assert!(txt.contains("No actuals available in selected range."));
        assert!(!txt.contains("MAE"));
    }

    #[test]
    fn table_truncates_and_marks_missing_actuals() {
        let rows: Vec<MergedRecord> = (1..=3)
            .map(|day| MergedRecord {
                date: d(day),
                point_estimate: 10.0 * day as f64,
                lower_bound: 0.0,
                upper_bound: 50.0,
                actual_value: (day == 1).then_some(12.0),
            })
            .collect();
        let txt = format_table(&rows, 2);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines[0], "View Forecast + Actual Data:");
        assert!(lines[3].starts_with("2024-01-01"));
        assert!(lines[3].ends_with("12.00"));
        assert!(lines[4].ends_with('-'));
        assert_eq!(lines[5], "... 1 more row(s)");
    }
}
