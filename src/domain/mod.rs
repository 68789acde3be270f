//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input records (`ForecastRecord`, `ActualRecord`) and the joined `MergedRecord`
//! - the per-render request (`DashboardRequest`, `DateRange`)
//! - computed outputs (`Kpis`, `Accuracy`, `DashboardView`)

pub mod types;

pub use types::*;
