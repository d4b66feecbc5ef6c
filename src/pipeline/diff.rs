//! Freshness assessment for a unit.
//!
//! Compares the newest snapshot listed on a unit's detail page with the
//! newest month already captured in the dataset and picks the snapshots
//! that still need parsing.

use crate::models::{SnapshotRef, Unit, UpdateMode};

/// Whether a unit has snapshots to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitState {
    UpToDate,
    /// Targets are in ascending date order.
    Stale { targets: Vec<SnapshotRef> },
}

/// Decide which of the available snapshots a unit still needs.
///
/// The freshest available date is the maximum extracted date, not the
/// first link on the page.
pub fn assess(unit: &Unit, available: &[SnapshotRef], mode: UpdateMode) -> UnitState {
    let Some(freshest) = available.iter().map(|s| s.date).max() else {
        return UnitState::UpToDate;
    };

    let known = unit.latest_known_date();
    if known.is_some_and(|known| freshest <= known) {
        return UnitState::UpToDate;
    }

    let mut targets: Vec<SnapshotRef> = match mode {
        UpdateMode::Latest => available
            .iter()
            .find(|s| s.date == freshest)
            .cloned()
            .into_iter()
            .collect(),
        UpdateMode::CatchUp => available
            .iter()
            .filter(|s| known.is_none_or(|known| s.date > known))
            .cloned()
            .collect(),
    };

    targets.sort_by_key(|s| s.date);
    targets.dedup_by_key(|s| s.date);

    UnitState::Stale { targets }
}
