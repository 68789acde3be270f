//! Input/output helpers.
//!
//! - forecast + history CSV ingest and validation (`ingest`)
//! - filtered CSV export and re-import (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
