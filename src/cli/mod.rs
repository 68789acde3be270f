//! Command-line parsing for the sales forecast dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the pipeline and presentation code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "dash", version, about = "Sales forecast vs. actuals dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the interactive TUI (default).
    ///
    /// Loads both inputs once, then re-renders KPIs, chart and table on every
    /// change of the date range or the confidence-interval toggle.
    Tui(TuiArgs),
    /// Print KPIs, accuracy, an ASCII chart and the table for one date range.
    Report(ReportArgs),
    /// Write the filtered forecast + actuals CSV.
    Export(ExportArgs),
    /// Re-render a CSV previously written by `dash export`.
    Show(ShowArgs),
}

/// Input files and the date-range/CI request shared by all data commands.
#[derive(Debug, Args, Clone, Default)]
pub struct DashArgs {
    /// Forecast CSV (`ds,yhat,yhat_lower,yhat_upper`). Env: DASH_FORECAST_CSV.
    #[arg(long, value_name = "CSV")]
    pub forecast: Option<PathBuf>,

    /// Raw sales history CSV (`date,sales`). Env: DASH_HISTORY_CSV.
    #[arg(long, value_name = "CSV")]
    pub history: Option<PathBuf>,

    /// First date of the range (inclusive, YYYY-MM-DD). Defaults to the first forecast date.
    #[arg(long, value_name = "DATE")]
    pub start: Option<String>,

    /// Last date of the range (inclusive, YYYY-MM-DD). Defaults to the last forecast date.
    #[arg(long, value_name = "DATE")]
    pub end: Option<String>,

    /// Hide the confidence band.
    #[arg(long)]
    pub no_ci: bool,

    /// Where the filtered CSV is written. Env: DASH_EXPORT_CSV.
    #[arg(long = "export-path", value_name = "CSV")]
    pub export_path: Option<PathBuf>,
}

/// Options for the interactive dashboard.
#[derive(Debug, Args, Clone, Default)]
pub struct TuiArgs {
    #[command(flatten)]
    pub dash: DashArgs,

    /// Write logs to this file (the TUI never logs to the terminal).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

/// Options for the text report.
#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub dash: DashArgs,

    #[command(flatten)]
    pub render: RenderArgs,
}

/// Layout of the printed report.
#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    /// Print the render payload as JSON instead of text.
    #[arg(long)]
    pub json: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Maximum table rows to print.
    #[arg(long, default_value_t = 60)]
    pub rows: usize,
}

/// Options for the CSV export.
#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub dash: DashArgs,

    /// Output file (overrides `--export-path`).
    #[arg(short, long, value_name = "CSV")]
    pub out: Option<PathBuf>,
}

/// Options for re-rendering an exported CSV.
#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// CSV produced by `dash export` (or the TUI `e` key).
    #[arg(long, value_name = "CSV")]
    pub csv: PathBuf,

    /// Hide the confidence band.
    #[arg(long)]
    pub no_ci: bool,

    #[command(flatten)]
    pub render: RenderArgs,
}
