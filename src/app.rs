//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - resolves input/output paths from flags, `.env` and defaults
//! - loads and joins the inputs
//! - renders the requested view (TUI, text report, JSON, or CSV export)

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use crate::cli::{Command, DashArgs, ExportArgs, RenderArgs, ReportArgs, ShowArgs, TuiArgs};
use crate::domain::{DashConfig, DashboardRequest, DashboardView};
use crate::error::AppError;
use crate::io::export::DEFAULT_EXPORT_FILE;

pub mod pipeline;

use pipeline::DashboardData;

pub const DEFAULT_FORECAST_CSV: &str = "reports/forecast.csv";
pub const DEFAULT_HISTORY_CSV: &str = "data/train.csv";

const ENV_FORECAST_CSV: &str = "DASH_FORECAST_CSV";
const ENV_HISTORY_CSV: &str = "DASH_HISTORY_CSV";
const ENV_EXPORT_CSV: &str = "DASH_EXPORT_CSV";

/// Entry point for the `dash` binary.
pub fn run() -> Result<(), AppError> {
    // We want `dash` and `dash --start 2024-01-01` to behave like `dash tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Tui(args) => handle_tui(args),
        Command::Report(args) => handle_report(args),
        Command::Export(args) => handle_export(args),
        Command::Show(args) => handle_show(args),
    }
}

fn handle_tui(args: TuiArgs) -> Result<(), AppError> {
    if let Some(path) = &args.log_file {
        crate::logging::init_file(path)?;
    }
    let config = config_from_args(&args.dash)?;
    crate::tui::run(config)
}

fn handle_report(args: ReportArgs) -> Result<(), AppError> {
    crate::logging::init_stderr();
    let config = config_from_args(&args.dash)?;

    // Load failures abort before anything is printed.
    let data = DashboardData::load(&config)?;
    let view = pipeline::render(&data, &config.request(data.domain()));

    print_view(&view, &args.render)
}

fn handle_export(args: ExportArgs) -> Result<(), AppError> {
    crate::logging::init_stderr();
    let config = config_from_args(&args.dash)?;
    let out = args.out.unwrap_or_else(|| config.export_path.clone());

    let data = DashboardData::load(&config)?;
    let view = pipeline::render(&data, &config.request(data.domain()));

    crate::io::export::write_export_csv(&out, &view.rows)?;
    println!("Wrote {} row(s) to {}", view.rows.len(), out.display());
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    crate::logging::init_stderr();
    let rows = crate::io::export::read_export_csv(&args.csv)?;
    info!(path = %args.csv.display(), rows = rows.len(), "re-rendering export");

    let data = DashboardData::from_merged(rows);
    let request = DashboardRequest {
        range: None,
        show_ci: !args.no_ci,
    };
    let view = pipeline::render(&data, &request);

    print_view(&view, &args.render)
}

fn print_view(view: &DashboardView, render: &RenderArgs) -> Result<(), AppError> {
    if render.json {
        let json = serde_json::to_string_pretty(view)
            .map_err(|e| AppError::io(format!("Failed to serialize dashboard JSON: {e}")))?;
        println!("{json}");
        return Ok(());
    }

    println!("{}", crate::report::format_summary(view));
    println!(
        "{}",
        crate::plot::render_overlay_plot(&view.rows, view.show_ci, render.width, render.height)
    );
    println!("{}", crate::report::format_table(&view.rows, render.rows));
    Ok(())
}

/// Resolve CLI flags into a `DashConfig`.
///
/// Paths come from the flag, else the environment (a `.env` file is honored),
/// else the built-in default.
pub fn config_from_args(args: &DashArgs) -> Result<DashConfig, AppError> {
    dotenvy::dotenv().ok();

    let start = args.start.as_deref().map(|s| parse_date_arg("--start", s)).transpose()?;
    let end = args.end.as_deref().map(|s| parse_date_arg("--end", s)).transpose()?;

    Ok(DashConfig {
        forecast_path: resolve_path(
            args.forecast.clone(),
            std::env::var(ENV_FORECAST_CSV).ok(),
            DEFAULT_FORECAST_CSV,
        ),
        history_path: resolve_path(
            args.history.clone(),
            std::env::var(ENV_HISTORY_CSV).ok(),
            DEFAULT_HISTORY_CSV,
        ),
        export_path: resolve_path(
            args.export_path.clone(),
            std::env::var(ENV_EXPORT_CSV).ok(),
            DEFAULT_EXPORT_FILE,
        ),
        start,
        end,
        show_ci: !args.no_ci,
    })
}

fn resolve_path(flag: Option<PathBuf>, env: Option<String>, default: &str) -> PathBuf {
    flag.or_else(|| env.filter(|s| !s.trim().is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(default))
}

fn parse_date_arg(flag: &str, value: &str) -> Result<chrono::NaiveDate, AppError> {
    crate::io::ingest::parse_date(value.trim()).map_err(|e| AppError::usage(format!("{flag}: {e}")))
}

/// Rewrite argv so `dash` defaults to `dash tui`.
///
/// Rules:
/// - `dash`                        -> `dash tui`
/// - `dash --start 2024-01-01 ...` -> `dash tui --start 2024-01-01 ...`
/// - `dash --help/--version/-h`    -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "tui" | "report" | "export" | "show");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}
