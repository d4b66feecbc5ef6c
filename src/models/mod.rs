// src/models/mod.rs

//! Domain models for the tracker.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod anomaly;
mod config;
mod document;
mod project;
mod snapshot;
mod unit;

// Re-export all public types
pub use anomaly::{ANOMALY_SAMPLE_LIMIT, AnomalyLog, ParseAnomaly};
pub use config::{
    Config, CrawlerConfig, NotifyConfig, RetryConfig, SourceConfig, StorageConfig, UpdateConfig,
    UpdateMode,
};
pub use document::DocumentMeta;
pub use project::{Contact, NATIONAL_REGION, ProjectUpdate};
pub use snapshot::{SNAPSHOT_DATE_LEN, SNAPSHOT_EXTENSION_LEN, SnapshotDate, SnapshotRef};
pub use unit::Unit;

/// Records parsed from one snapshot page.
#[derive(Debug, Default)]
pub struct ParsedSnapshot {
    pub projects: Vec<ProjectUpdate>,
    pub anomalies: Vec<ParseAnomaly>,
}
