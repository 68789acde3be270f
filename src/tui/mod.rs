//! Ratatui-based terminal UI.
//!
//! The TUI shows the KPI tiles, the accuracy line, the forecast/actual chart
//! and an optional data table, plus a controls panel for the date range and
//! the confidence-band toggle. Each key press builds a new `DashboardRequest`
//! and re-runs the pipeline over the loaded data.

use std::io;
use std::time::Duration;

use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Row, Table},
};
use tracing::{info, warn};

use crate::app::pipeline::{self, DashboardData};
use crate::domain::{DASHBOARD_SUBTITLE, DashConfig, DashboardRequest, DashboardView, DateRange};
use crate::error::AppError;
use crate::report::{KPI_LABELS, TABLE_TITLE, accuracy_line, kpi_values, table_cells};

mod plotters_chart;

use plotters_chart::SalesPlottersChart;

const FIELD_START: usize = 0;
const FIELD_END: usize = 1;
const FIELD_CI: usize = 2;
const TABLE_PAGE: usize = 10;

/// Start the TUI.
pub fn run(config: DashConfig) -> Result<(), AppError> {
    // Load before touching the terminal so input errors print normally.
    let data = DashboardData::load(&config)?;
    let mut app = App::new(config, data)?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::io(format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::io(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::io(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    config: DashConfig,
    data: DashboardData,
    domain: DateRange,
    start: NaiveDate,
    end: NaiveDate,
    show_ci: bool,
    selected_field: usize,
    editing: bool,
    date_input: String,
    show_table: bool,
    table_offset: usize,
    status: String,
    view: DashboardView,
}

impl App {
    fn new(config: DashConfig, data: DashboardData) -> Result<Self, AppError> {
        let domain = data
            .domain()
            .ok_or_else(|| AppError::data("No forecast rows to display."))?;
        let request = config.request(Some(domain));
        let range = request.range.unwrap_or(domain);
        let view = pipeline::render(&data, &request);

        let status = format!(
            "Loaded {} forecast day(s), {} day(s) of actuals.",
            data.merged.len(),
            data.actual_days
        );

        Ok(Self {
            config,
            data,
            domain,
            start: range.start,
            end: range.end,
            show_ci: request.show_ci,
            selected_field: FIELD_START,
            editing: false,
            date_input: String::new(),
            show_table: false,
            table_offset: 0,
            status,
            view,
        })
    }

    fn request(&self) -> DashboardRequest {
        DashboardRequest {
            range: Some(DateRange::new(self.start, self.end)),
            show_ci: self.show_ci,
        }
    }

    /// Re-run the pipeline for the current controls.
    fn rerender(&mut self) {
        self.view = pipeline::render(&self.data, &self.request());
        self.table_offset = self.table_offset.min(self.view.rows.len().saturating_sub(1));
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::io(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::io(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::io(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.editing {
            self.handle_date_edit(code);
            return false;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                self.selected_field = self.selected_field.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected_field < FIELD_CI {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Enter => {
                if self.selected_field == FIELD_CI {
                    self.toggle_ci();
                } else {
                    self.editing = true;
                    self.date_input.clear();
                    self.status = "Editing date (YYYY-MM-DD). Enter to apply, Esc to cancel.".to_string();
                }
            }
            KeyCode::Char(' ') | KeyCode::Char('c') => self.toggle_ci(),
            KeyCode::Char('a') => {
                self.start = self.domain.start;
                self.end = self.domain.end;
                self.rerender();
                self.status = format!("range: {}", self.domain);
            }
            KeyCode::Char('t') => {
                self.show_table = !self.show_table;
                self.status = if self.show_table { "Table shown." } else { "Table hidden." }.to_string();
            }
            KeyCode::PageDown => {
                let max = self.view.rows.len().saturating_sub(1);
                self.table_offset = (self.table_offset + TABLE_PAGE).min(max);
            }
            KeyCode::PageUp => {
                self.table_offset = self.table_offset.saturating_sub(TABLE_PAGE);
            }
            KeyCode::Char('e') => self.export(),
            KeyCode::Char('R') => self.reload(),
            _ => {}
        }

        false
    }

    fn handle_date_edit(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.editing = false;
                self.status = "Date edit canceled.".to_string();
            }
            KeyCode::Enter => {
                self.editing = false;
                self.apply_date_input();
            }
            KeyCode::Backspace => {
                self.date_input.pop();
            }
            KeyCode::Char(c) => {
                if c.is_ascii_digit() || c == '-' {
                    self.date_input.push(c);
                }
            }
            _ => {}
        }
    }

    fn adjust_field(&mut self, delta: i64) {
        match self.selected_field {
            FIELD_START => {
                self.start = step_date(self.start, delta, self.domain);
                self.rerender();
                self.status = format!("start: {}", self.start);
            }
            FIELD_END => {
                self.end = step_date(self.end, delta, self.domain);
                self.rerender();
                self.status = format!("end: {}", self.end);
            }
            FIELD_CI => self.toggle_ci(),
            _ => {}
        }
    }

    fn toggle_ci(&mut self) {
        self.show_ci = !self.show_ci;
        self.rerender();
        self.status = format!("confidence band: {}", on_off(self.show_ci));
    }

    fn apply_date_input(&mut self) {
        let trimmed = self.date_input.trim();
        let date = match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            Ok(d) => d,
            Err(e) => {
                self.status = format!("Invalid date '{trimmed}': {e}");
                return;
            }
        };

        // The picker only offers dates inside the forecast domain.
        let clamped = clamp_date(date, self.domain);
        if self.selected_field == FIELD_END {
            self.end = clamped;
        } else {
            self.start = clamped;
        }
        self.rerender();

        self.status = if clamped != date {
            format!("{date} is outside {}; using {clamped}.", self.domain)
        } else if self.start > self.end {
            "Start is after end: nothing selected.".to_string()
        } else {
            format!("range: {} → {}", self.start, self.end)
        };
    }

    fn export(&mut self) {
        let path = self.config.export_path.clone();
        match crate::io::export::write_export_csv(&path, &self.view.rows) {
            Ok(()) => {
                self.status = format!("Exported {} row(s) to {}", self.view.rows.len(), path.display());
            }
            Err(err) => {
                warn!(%err, "export failed");
                self.status = format!("Export failed: {err}");
            }
        }
    }

    fn reload(&mut self) {
        let loaded = DashboardData::load(&self.config).and_then(|data| {
            let domain = data
                .domain()
                .ok_or_else(|| AppError::data("No forecast rows to display."))?;
            Ok((data, domain))
        });

        match loaded {
            Ok((data, domain)) => {
                info!(rows = data.merged.len(), "reloaded inputs");
                self.data = data;
                self.domain = domain;
                self.start = clamp_date(self.start, domain);
                self.end = clamp_date(self.end, domain);
                self.rerender();
                self.status = format!("Reloaded: {} forecast day(s).", self.data.merged.len());
            }
            Err(err) => {
                warn!(%err, "reload failed");
                self.status = format!("Reload failed (keeping previous data): {err}");
            }
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_kpis(frame, chunks[1]);
        self.draw_accuracy(frame, chunks[2]);
        self.draw_body(frame, chunks[3]);
        self.draw_footer(frame, chunks[4]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let lines = vec![
            Line::from(Span::styled(
                self.view.title.clone(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(DASHBOARD_SUBTITLE, Style::default().fg(Color::Gray))),
        ];
        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_kpis(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let tiles = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(1, 3), Constraint::Ratio(1, 3)])
            .split(area);

        for ((label, value), rect) in KPI_LABELS.iter().zip(kpi_values(&self.view.kpis)).zip(tiles.iter()) {
            let p = Paragraph::new(Span::styled(
                value,
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center)
            .block(Block::default().title(*label).borders(Borders::ALL));
            frame.render_widget(p, *rect);
        }
    }

    fn draw_accuracy(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let color = if self.view.accuracy.is_some() { Color::Cyan } else { Color::Yellow };
        let p = Paragraph::new(Span::styled(accuracy_line(&self.view), Style::default().fg(color)))
            .block(Block::default().title("Accuracy").borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(32)])
            .split(area);

        if self.show_table {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                .split(columns[0]);
            self.draw_chart(frame, rows[0]);
            self.draw_table(frame, rows[1]);
        } else {
            self.draw_chart(frame, columns[0]);
        }
        self.draw_controls(frame, columns[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Actual vs Forecasted Sales").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(series) = chart_series(&self.view) else {
            let msg = Paragraph::new("No rows in selected range.")
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default());
            frame.render_widget(msg, inner);
            return;
        };

        let (chart_rect, insets) = chart_layout(inner);
        let widget = SalesPlottersChart {
            forecast: &series.forecast,
            actual_runs: &series.actual_runs,
            band: if self.view.show_ci {
                Some((series.lower.as_slice(), series.upper.as_slice()))
            } else {
                None
            },
            x_bounds: series.x_bounds,
            y_bounds: series.y_bounds,
            x_label: "Date",
            y_label: "Sales",
            fmt_x: fmt_axis_date,
            fmt_y: fmt_axis_sales,
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, series.x_bounds, series.y_bounds);
        }
    }

    fn draw_table(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let header = Row::new(["ds", "yhat", "yhat_lower", "yhat_upper", "actual_sales"])
            .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));

        let rows = self
            .view
            .rows
            .iter()
            .skip(self.table_offset)
            .map(|r| Row::new(table_cells(r)));

        let widths = [
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(12),
        ];

        let title = format!(
            "{TABLE_TITLE} ({}-{} of {})",
            (self.table_offset + 1).min(self.view.rows.len()),
            self.view.rows.len(),
            self.view.rows.len()
        );
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(table, area);
    }

    fn draw_controls(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let start_label = if self.editing && self.selected_field == FIELD_START {
            format!("{}_", self.date_input)
        } else {
            self.start.to_string()
        };
        let end_label = if self.editing && self.selected_field == FIELD_END {
            format!("{}_", self.date_input)
        } else {
            self.end.to_string()
        };

        let items = vec![
            ListItem::new(format!("Start: {start_label}")),
            ListItem::new(format!("End:   {end_label}")),
            ListItem::new(format!("Show CI: {}", on_off(self.show_ci))),
        ];

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0)])
            .split(area);

        let list = List::new(items)
            .block(Block::default().title("Controls").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, chunks[0], &mut state);

        let info = vec![
            Line::from(format!("Data: {}", self.domain.start)),
            Line::from(format!("   → {}", self.domain.end)),
            Line::from(format!("Days: {}", self.view.kpis.days)),
            Line::from(format!("Actual days: {}", self.data.actual_days)),
            Line::from(format!("Raw rows: {}", self.data.history_rows_read)),
            Line::from(""),
            Line::from("Export:"),
            Line::from(self.config.export_path.display().to_string()),
        ];
        let p = Paragraph::new(Text::from(info))
            .style(Style::default().fg(Color::Gray))
            .block(Block::default().title("Data").borders(Borders::ALL));
        frame.render_widget(p, chunks[1]);

        if self.editing {
            let hint = Paragraph::new("Editing date…")
                .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
            let rect = Rect {
                x: chunks[0].x + 2,
                y: chunks[0].y + chunks[0].height.saturating_sub(1),
                width: chunks[0].width.saturating_sub(4),
                height: 1,
            };
            frame.render_widget(hint, rect);
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  Enter edit  c CI  a all  t table  PgUp/PgDn scroll  e export  R reload  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn on_off(v: bool) -> &'static str {
    if v { "on" } else { "off" }
}

/// Move a date by `delta` days, staying inside the domain.
fn step_date(date: NaiveDate, delta: i64, domain: DateRange) -> NaiveDate {
    let moved = date
        .checked_add_signed(chrono::Duration::days(delta))
        .unwrap_or(date);
    clamp_date(moved, domain)
}

fn clamp_date(date: NaiveDate, domain: DateRange) -> NaiveDate {
    date.clamp(domain.start, domain.end)
}

/// Chart x coordinate for a date (days since the common era).
fn date_to_x(date: NaiveDate) -> f64 {
    use chrono::Datelike;
    date.num_days_from_ce() as f64
}

/// Series and bounds for the Plotters chart.
struct ChartSeries {
    forecast: Vec<(f64, f64)>,
    actual_runs: Vec<Vec<(f64, f64)>>,
    lower: Vec<(f64, f64)>,
    upper: Vec<(f64, f64)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

/// Build chart series for Plotters; `None` when there is nothing to draw.
fn chart_series(view: &DashboardView) -> Option<ChartSeries> {
    let first = view.rows.first()?;
    let last = view.rows.last()?;

    let forecast: Vec<(f64, f64)> = view.rows.iter().map(|r| (date_to_x(r.date), r.point_estimate)).collect();
    let lower: Vec<(f64, f64)> = view.rows.iter().map(|r| (date_to_x(r.date), r.lower_bound)).collect();
    let upper: Vec<(f64, f64)> = view.rows.iter().map(|r| (date_to_x(r.date), r.upper_bound)).collect();

    // Break the actual line wherever a date has no actual.
    let mut actual_runs: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut current = Vec::new();
    for r in &view.rows {
        match r.actual_value {
            Some(a) => current.push((date_to_x(r.date), a)),
            None if !current.is_empty() => actual_runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        actual_runs.push(current);
    }

    let mut x0 = date_to_x(first.date);
    let mut x1 = date_to_x(last.date);
    if x1 <= x0 {
        x0 -= 0.5;
        x1 += 0.5;
    }

    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let mut include = |y: f64| {
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    };
    for &(_, y) in &forecast {
        include(y);
    }
    for &(_, y) in actual_runs.iter().flatten() {
        include(y);
    }
    if view.show_ci {
        for &(_, y) in lower.iter().chain(upper.iter()) {
            include(y);
        }
    }

    if !y_min.is_finite() || !y_max.is_finite() || y_max <= y_min {
        let mid = if y_min.is_finite() { y_min } else { 0.0 };
        y_min = mid - 1.0;
        y_max = mid + 1.0;
    }

    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);

    Some(ChartSeries {
        forecast,
        actual_runs,
        lower,
        upper,
        x_bounds: [x0, x1],
        y_bounds: [y_min - pad, y_max + pad],
    })
}

fn fmt_axis_date(v: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(v.round() as i32)
        .map(|d| d.format("%y-%m-%d").to_string())
        .unwrap_or_default()
}

fn fmt_axis_sales(v: f64) -> String {
    format!("{v:.0}")
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 9,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 4usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = fmt_axis_date(x_val);
        let label_len = label.len() as u16;
        let start = x.saturating_sub(label_len / 2);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = fmt_axis_sales(y_val);
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label_len);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("Date")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = Paragraph::new("Sales").style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}
