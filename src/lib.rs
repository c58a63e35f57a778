//! # Runport: Experiment Run Migration
//!
//! Runport moves experiment-tracking data (runs with their parameters,
//! metrics, tags, and artifact files) between tracking stores, through a
//! portable flat-file bundle.
//!
//! The bundle's table is untyped text, but value types survive the round
//! trip: every dynamic column carries a `param:` / `metric:` / `tag:`
//! prefix, a side ledger records which columns belong to which group, and
//! the decoder falls back to shape inference when both are missing.
//!
//! ## Example
//!
//! ```rust,no_run
//! use runport::config::TrackingConfig;
//! use runport::export::{Exporter, ExportOptions};
//! use runport::tracking::connect;
//! use std::path::Path;
//!
//! # fn main() -> runport::Result<()> {
//! let config = TrackingConfig::new("file:./runstore");
//! let store = connect(&config)?;
//! let summary = Exporter::new(store.as_ref(), &config).export(
//!     "baseline",
//!     Path::new("./baseline_export"),
//!     &ExportOptions::default(),
//! )?;
//! println!("exported {} runs", summary.total_runs);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod artifacts;
pub mod bundle;
pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod tracking;

pub use error::{Error, Result};
