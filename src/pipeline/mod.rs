//! Pipeline entry points for tracker operations.
//!
//! - `run_update`: Merge newer snapshots into the latest dataset
//! - `run_bootstrap`: Build a dataset from the unit directory
//! - `run_export`: Write the latest dataset as CSV tables

#[cfg(feature = "bootstrap")]
pub mod bootstrap;
pub mod diff;
pub mod export;
pub mod merge;
pub mod update;

#[cfg(feature = "bootstrap")]
pub use bootstrap::run_bootstrap;
pub use diff::{UnitState, assess};
pub use export::{ExportSummary, run_export};
pub use merge::{MergeStats, merge_projects, merge_snapshot};
pub use update::{RunReport, UpdateEngine, run_update};
