// src/models/unit.rs

//! Administrative unit (forest) data structure.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{ProjectUpdate, SnapshotDate};

/// A forest or grassland publishing its own report series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    /// Display name (e.g., "Lolo National Forest")
    pub name: String,

    /// State heading the unit is listed under in the directory
    #[serde(default, alias = "state")]
    pub state_group: String,

    /// Numeric id from the directory link; empty when the link has none
    #[serde(default, alias = "id", deserialize_with = "string_or_number")]
    pub canonical_id: String,

    /// URL of the unit's report listing page
    #[serde(alias = "url")]
    pub detail_url: String,

    /// Months of every snapshot already parsed for this unit
    #[serde(default)]
    pub known_snapshot_dates: BTreeSet<SnapshotDate>,

    /// Latest known record per project
    #[serde(default, deserialize_with = "null_as_empty")]
    pub projects: Vec<ProjectUpdate>,
}

impl Unit {
    pub fn new(
        name: impl Into<String>,
        state_group: impl Into<String>,
        canonical_id: impl Into<String>,
        detail_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            state_group: state_group.into(),
            canonical_id: canonical_id.into(),
            detail_url: detail_url.into(),
            known_snapshot_dates: BTreeSet::new(),
            projects: Vec::new(),
        }
    }

    /// Freshest snapshot month already captured for this unit.
    pub fn latest_known_date(&self) -> Option<SnapshotDate> {
        let from_projects = self.projects.iter().map(|p| p.snapshot_date).max();
        let from_index = self.known_snapshot_dates.last().copied();
        from_projects.max(from_index)
    }

    /// Count documents across all projects.
    pub fn document_count(&self) -> usize {
        self.projects.iter().map(|p| p.documents.len()).sum()
    }

    /// Short label for log lines.
    pub fn label(&self) -> String {
        if self.state_group.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.state_group)
        }
    }
}

/// Older datasets stored the id as an integer.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Text(s)) => s,
        Some(RawId::Number(0)) | None => String::new(),
        Some(RawId::Number(n)) => n.to_string(),
    })
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<ProjectUpdate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Vec<ProjectUpdate>> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(name: &str, date: &str) -> ProjectUpdate {
        let mut p = ProjectUpdate::new("Region", "District", date.parse().unwrap());
        p.name = name.to_string();
        p
    }

    #[test]
    fn test_latest_known_date_uses_projects_and_index() {
        let mut unit = Unit::new("Lolo", "Montana", "110116", "https://example.com/lolo");
        assert_eq!(unit.latest_known_date(), None);

        unit.projects.push(project("A", "2021-04"));
        unit.projects.push(project("B", "2021-07"));
        assert_eq!(unit.latest_known_date().unwrap().to_string(), "2021-07");

        unit.known_snapshot_dates.insert("2021-10".parse().unwrap());
        assert_eq!(unit.latest_known_date().unwrap().to_string(), "2021-10");
    }

    #[test]
    fn test_loads_legacy_integer_id() {
        let json = r#"{"name":"Lolo","state":"Montana","url":"https://x/?110116","id":110116,"projects":null,"sopa_reports":null}"#;
        let unit: Unit = serde_json::from_str(json).unwrap();
        assert_eq!(unit.canonical_id, "110116");
        assert_eq!(unit.state_group, "Montana");
        assert!(unit.projects.is_empty());

        let json = r#"{"name":"Lolo","state":"Montana","url":"https://x/","id":0}"#;
        let unit: Unit = serde_json::from_str(json).unwrap();
        assert_eq!(unit.canonical_id, "");
    }

    #[test]
    fn test_serializes_camel_case() {
        let unit = Unit::new("Lolo", "Montana", "110116", "https://x/?110116");
        let json = serde_json::to_value(&unit).unwrap();
        assert_eq!(json["stateGroup"], "Montana");
        assert_eq!(json["canonicalId"], "110116");
        assert_eq!(json["detailUrl"], "https://x/?110116");
        assert!(json["knownSnapshotDates"].as_array().unwrap().is_empty());
    }
}
