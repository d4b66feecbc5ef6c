//! Service layer for the tracker.
//!
//! This module contains the readers for each page type:
//! - Unit directory (`UnitDirectoryReader`)
//! - Snapshot index of one unit (`SnapshotIndexReader`)
//! - Snapshot report tables (`SnapshotTableParser`)
//! - Project document feeds (`DocumentMetaReader`)
//!
//! plus the chat `Notifier` used at the end of an update run.

mod directory;
mod documents;
pub mod fields;
pub mod notify;
pub mod purposes;
mod snapshots;
pub mod table;

pub use directory::UnitDirectoryReader;
pub use documents::DocumentMetaReader;
pub use notify::{LogNotifier, Notifier, WebhookNotifier};
pub use snapshots::{SnapshotIndexReader, dated_snapshots};
pub use table::SnapshotTableParser;
