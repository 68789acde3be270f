//! Plotters-powered forecast/actual overlay chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A lightweight, render-only chart description.
///
/// All series and bounds are computed outside the render call, so `render()`
/// only draws. X values are days (see `tui::date_to_x`).
pub struct SalesPlottersChart<'a> {
    /// Forecast (`yhat`) line.
    pub forecast: &'a [(f64, f64)],
    /// Actual sales, split into runs of consecutive dates that have actuals.
    pub actual_runs: &'a [Vec<(f64, f64)>],
    /// `(lower, upper)` bound lines; `None` hides the band.
    pub band: Option<(&'a [(f64, f64)], &'a [(f64, f64)])>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    /// Axis labels (kept simple for terminal rendering).
    pub x_label: &'a str,
    pub y_label: &'a str,
    /// Formatting of tick labels.
    pub fmt_x: fn(f64) -> String,
    pub fmt_y: fn(f64) -> String,
}

impl<'a> Widget for SalesPlottersChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // When the available area is too small, Plotters may fail to build a chart.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let x0 = self.x_bounds[0];
        let x1 = self.x_bounds[1];
        let y0 = self.y_bounds[0];
        let y1 = self.y_bounds[1];

        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 8)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(self.y_label)
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let forecast_color = RGBColor(0, 128, 255); // blue
            let actual_color = RGBColor(0, 255, 0); // green
            let band_color = RGBColor(40, 60, 120); // dim blue

            // 1) Confidence band: a vertical stroke per date plus the bound lines.
            if let Some((lower, upper)) = self.band {
                chart.draw_series(
                    lower
                        .iter()
                        .zip(upper.iter())
                        .map(|(&(x, lo), &(_, hi))| PathElement::new(vec![(x, lo), (x, hi)], band_color)),
                )?;
                chart.draw_series(LineSeries::new(lower.iter().copied(), &band_color))?;
                chart.draw_series(LineSeries::new(upper.iter().copied(), &band_color))?;
            }

            // 2) Forecast line.
            chart.draw_series(LineSeries::new(self.forecast.iter().copied(), &forecast_color))?;

            // 3) Actuals: line per run, then a marker per date.
            //
            // Markers are `Pixel`s: the ratatui backend maps `Circle` radii to
            // canvas units incorrectly and draws huge circles.
            for run in self.actual_runs {
                chart.draw_series(LineSeries::new(run.iter().copied(), &actual_color))?;
                chart.draw_series(run.iter().map(|&(x, y)| Pixel::new((x, y), WHITE)))?;
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}
