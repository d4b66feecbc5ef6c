//! Merging parsed records into a unit.
//!
//! Records are keyed by project name. A record replaces the stored one only
//! when its snapshot month is strictly newer, so merging the same batch
//! twice changes nothing.

use std::ops::AddAssign;

use serde::Serialize;

use crate::models::{ProjectUpdate, SnapshotDate, Unit};

/// Counts from one or more merges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub inserted: usize,
    pub replaced: usize,
    /// Incoming records that were not newer than the stored one
    pub retained: usize,
    /// Snapshot months newly recorded as parsed
    pub dates_added: usize,
}

impl MergeStats {
    pub fn changed(&self) -> bool {
        self.inserted + self.replaced + self.dates_added > 0
    }
}

impl AddAssign for MergeStats {
    fn add_assign(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.replaced += other.replaced;
        self.retained += other.retained;
        self.dates_added += other.dates_added;
    }
}

/// Merge records into a project list.
pub fn merge_projects(
    existing: &mut Vec<ProjectUpdate>,
    incoming: impl IntoIterator<Item = ProjectUpdate>,
) -> MergeStats {
    let mut stats = MergeStats::default();

    for project in incoming {
        match existing.iter_mut().find(|p| p.name == project.name) {
            Some(current) if project.snapshot_date > current.snapshot_date => {
                *current = project;
                stats.replaced += 1;
            }
            Some(_) => stats.retained += 1,
            None => {
                existing.push(project);
                stats.inserted += 1;
            }
        }
    }

    stats
}

/// Merge one parsed snapshot into a unit and record its month.
pub fn merge_snapshot(
    unit: &mut Unit,
    date: SnapshotDate,
    projects: impl IntoIterator<Item = ProjectUpdate>,
) -> MergeStats {
    let mut stats = merge_projects(&mut unit.projects, projects);
    if unit.known_snapshot_dates.insert(date) {
        stats.dates_added += 1;
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(name: &str, date: &str, status: &str) -> ProjectUpdate {
        let mut project = ProjectUpdate::new("Region", "District", date.parse().unwrap());
        project.name = name.into();
        project.status = status.into();
        project
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut unit = Unit::new("Lolo", "Montana", "110116", "https://x");
        let batch = vec![
            project("Trail Reroute", "2021-07", "Developing Proposal"),
            project("Hazard Trees", "2021-07", "On Hold"),
        ];

        let first = merge_snapshot(&mut unit, "2021-07".parse().unwrap(), batch.clone());
        let after_first = unit.clone();
        let second = merge_snapshot(&mut unit, "2021-07".parse().unwrap(), batch);

        assert_eq!(first.inserted, 2);
        assert_eq!(first.dates_added, 1);
        assert!(!second.changed());
        assert_eq!(second.retained, 2);
        assert_eq!(unit, after_first);
    }

    #[test]
    fn test_newer_record_replaces() {
        let mut existing = vec![project("Trail Reroute", "2021-04", "Developing Proposal")];
        let stats = merge_projects(
            &mut existing,
            vec![project("Trail Reroute", "2021-07", "Analysis Underway")],
        );

        assert_eq!(stats.replaced, 1);
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].status, "Analysis Underway");
    }

    #[test]
    fn test_older_record_is_ignored() {
        let mut existing = vec![project("Trail Reroute", "2021-07", "Analysis Underway")];
        let stats = merge_projects(
            &mut existing,
            vec![project("Trail Reroute", "2021-04", "Developing Proposal")],
        );

        assert_eq!(stats.retained, 1);
        assert_eq!(existing[0].status, "Analysis Underway");
        assert_eq!(existing[0].snapshot_date.to_string(), "2021-07");
    }

    #[test]
    fn test_duplicates_within_batch() {
        let mut existing = Vec::new();
        let stats = merge_projects(
            &mut existing,
            vec![
                project("Same Name", "2021-07", "first"),
                project("Same Name", "2021-07", "second"),
            ],
        );

        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.retained, 1);
        assert_eq!(existing[0].status, "first");
    }
}
