//! `sales-dash` library crate.
//!
//! The binary (`dash`) is a thin wrapper around this library so that:
//!
//! - the load/join/filter pipeline is testable without a terminal
//! - the TUI and the text report share one render path

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod plot;
pub mod report;
pub mod tui;
