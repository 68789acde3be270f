//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal or a CI log
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - forecast (`yhat`): `-` line
//! - actual sales: `o` markers joined by `.` (broken where a date has no actual)
//! - optional confidence band (`yhat_lower..yhat_upper`): `:` fill

use crate::domain::MergedRecord;

/// Render the forecast/actual overlay for the filtered rows.
///
/// Rows must be in date order.
pub fn render_overlay_plot(rows: &[MergedRecord], show_ci: bool, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return "Plot: no rows in selected range\n".to_string();
    };

    let x_of = |r: &MergedRecord| (r.date - first.date).num_days() as f64;
    let t_min = 0.0;
    let t_max = x_of(last).max(1.0);

    let forecast: Vec<(f64, f64)> = rows.iter().map(|r| (x_of(r), r.point_estimate)).collect();
    // Dates without an actual break the actual line.
    let actual_runs: Vec<Vec<(f64, f64)>> = rows
        .split(|r| r.actual_value.is_none())
        .filter(|run| !run.is_empty())
        .map(|run| run.iter().filter_map(|r| r.actual_value.map(|a| (x_of(r), a))).collect())
        .collect();
    let actual: Vec<(f64, f64)> = actual_runs.iter().flatten().copied().collect();
    let lower: Vec<(f64, f64)> = rows.iter().map(|r| (x_of(r), r.lower_bound)).collect();
    let upper: Vec<(f64, f64)> = rows.iter().map(|r| (x_of(r), r.upper_bound)).collect();

    let mut series: Vec<&[(f64, f64)]> = vec![forecast.as_slice(), actual.as_slice()];
    if show_ci {
        series.push(lower.as_slice());
        series.push(upper.as_slice());
    }
    let (y_min, y_max) = y_range(&series);
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Lines first; the band only fills what is left, and markers overwrite everything.
    draw_curve(&mut grid, &forecast, t_min, t_max, y_min, y_max, '-');
    for run in &actual_runs {
        draw_curve(&mut grid, run, t_min, t_max, y_min, y_max, '.');
    }
    if show_ci {
        draw_band(&mut grid, &lower, &upper, t_min, t_max, y_min, y_max);
    }
    for &(t, y) in &actual {
        let x = map_x(t, t_min, t_max, width);
        let yy = map_y(y, y_min, y_max, height);
        grid[yy][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: ds=[{}, {}] | sales=[{y_min:.2}, {y_max:.2}]\n",
        first.date, last.date
    ));

    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }

    out.push_str("legend: - forecast  o actual");
    if show_ci {
        out.push_str("  : confidence band");
    }
    out.push('\n');

    out
}

fn y_range(series: &[&[(f64, f64)]]) -> (f64, f64) {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for s in series {
        for &(_, y) in s.iter() {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }

    if !min_y.is_finite() || !max_y.is_finite() {
        return (0.0, 1.0);
    }
    if max_y <= min_y {
        // Flat series: open up a unit window around the value.
        return (min_y - 0.5, max_y + 0.5);
    }
    (min_y, max_y)
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(
    grid: &mut [Vec<char>],
    curve: &[(f64, f64)],
    t_min: f64,
    t_max: f64,
    y_min: f64,
    y_max: f64,
    ch: char,
) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve {
        let x = map_x(t, t_min, t_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, ch);
        } else if grid[yy][x] == ' ' {
            grid[yy][x] = ch;
        }
        prev = Some((x, yy));
    }
}

/// Fill every column between the interpolated lower and upper bound.
fn draw_band(
    grid: &mut [Vec<char>],
    lower: &[(f64, f64)],
    upper: &[(f64, f64)],
    t_min: f64,
    t_max: f64,
    y_min: f64,
    y_max: f64,
) {
    let height = grid.len();
    let width = grid[0].len();
    let (Some(&(t_first, _)), Some(&(t_last, _))) = (lower.first(), lower.last()) else {
        return;
    };

    for x in 0..width {
        let t = t_min + (x as f64 / (width as f64 - 1.0)) * (t_max - t_min);
        if t < t_first || t > t_last {
            continue;
        }
        let (Some(lo), Some(hi)) = (interpolate(lower, t), interpolate(upper, t)) else {
            continue;
        };
        let top = map_y(hi.max(lo), y_min, y_max, height);
        let bottom = map_y(hi.min(lo), y_min, y_max, height);
        for row in grid.iter_mut().take(bottom + 1).skip(top) {
            if row[x] == ' ' {
                row[x] = ':';
            }
        }
    }
}

/// Linear interpolation on a series sorted by `x`.
fn interpolate(series: &[(f64, f64)], t: f64) -> Option<f64> {
    let idx = series.iter().position(|&(x, _)| x >= t)?;
    let (x1, y1) = series[idx];
    if idx == 0 || x1 == t {
        return Some(y1);
    }
    let (x0, y0) = series[idx - 1];
    let u = (t - x0) / (x1 - x0);
    Some(y0 + u * (y1 - y0))
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rows() -> Vec<MergedRecord> {
        [(1, 10.0, Some(12.0)), (2, 20.0, None), (3, 30.0, None)]
            .into_iter()
            .map(|(day, yhat, actual)| MergedRecord {
                date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
                point_estimate: yhat,
                lower_bound: yhat - 2.0,
                upper_bound: yhat + 2.0,
                actual_value: actual,
            })
            .collect()
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let txt = render_overlay_plot(&rows(), false, 11, 5);
        let expected = concat!(
            "Plot: ds=[2024-01-01, 2024-01-03] | sales=[9.00, 31.00]\n",
            "         --\n",
            "       --\n",
            "    ---\n",
            "o --\n",
            "--\n",
            "legend: - forecast  o actual\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn band_is_drawn_only_when_enabled() {
        let with_ci = render_overlay_plot(&rows(), true, 30, 12);
        let without = render_overlay_plot(&rows(), false, 30, 12);
        assert!(with_ci.lines().skip(1).take(12).any(|l| l.contains(':')));
        assert!(with_ci.ends_with("legend: - forecast  o actual  : confidence band\n"));
        assert!(!without.lines().skip(1).take(12).any(|l| l.contains(':')));
    }

    #[test]
    fn actual_line_breaks_on_missing_dates() {
        let flat = |actuals: [Option<f64>; 3]| -> Vec<MergedRecord> {
            actuals
                .into_iter()
                .enumerate()
                .map(|(i, actual)| MergedRecord {
                    date: NaiveDate::from_ymd_opt(2024, 1, i as u32 + 1).unwrap(),
                    point_estimate: 100.0,
                    lower_bound: 90.0,
                    upper_bound: 110.0,
                    actual_value: actual,
                })
                .collect()
        };

        let gap = render_overlay_plot(&flat([Some(0.0), None, Some(0.0)]), false, 20, 6);
        let grid: Vec<&str> = gap.lines().skip(1).take(6).collect();
        assert!(grid.iter().all(|l| !l.contains('.')), "{gap}");
        assert_eq!(grid.iter().map(|l| l.matches('o').count()).sum::<usize>(), 2);

        let joined = render_overlay_plot(&flat([Some(0.0), Some(0.0), Some(0.0)]), false, 20, 6);
        assert!(joined.lines().skip(1).take(6).any(|l| l.contains('.')), "{joined}");
    }

    #[test]
    fn empty_and_single_row_do_not_panic() {
        assert_eq!(render_overlay_plot(&[], true, 20, 8), "Plot: no rows in selected range\n");
        let all = rows();
        let txt = render_overlay_plot(&all[..1], true, 20, 8);
        assert!(txt.contains('o'));
        assert!(txt.starts_with("Plot: ds=[2024-01-01, 2024-01-01]"));
    }
}
