//! Project update data structure.

use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{DocumentMeta, SnapshotDate};

/// Region used when a group header leaves the region cell empty.
pub const NATIONAL_REGION: &str = "National";

/// One project's status as reported in one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdate {
    /// Display name, also the merge identity
    pub name: String,

    /// Code printed under the name, if any
    #[serde(default, alias = "project_code", deserialize_with = "non_empty")]
    pub project_code: Option<String>,

    /// Numeric id taken from the project's detail link
    #[serde(default, alias = "id", deserialize_with = "non_empty")]
    pub project_id: Option<String>,

    /// Purpose labels in source order
    #[serde(default, alias = "purpose")]
    pub purposes: Vec<String>,

    /// Status text; lines are separated by `\n`
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub decision: String,

    #[serde(default, alias = "expected_implementation")]
    pub expected_implementation: String,

    #[serde(default)]
    pub contact: Contact,

    #[serde(default)]
    pub description: String,

    #[serde(default, alias = "web_link", deserialize_with = "non_empty")]
    pub web_link: Option<String>,

    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub district: String,

    /// Month of the snapshot this record was parsed from
    #[serde(alias = "sopa_report_date")]
    pub snapshot_date: SnapshotDate,

    #[serde(default, alias = "project_documents", deserialize_with = "null_as_empty")]
    pub documents: Vec<DocumentMeta>,
}

impl ProjectUpdate {
    /// Start an empty record under the given grouping.
    pub fn new(
        region: impl Into<String>,
        district: impl Into<String>,
        snapshot_date: SnapshotDate,
    ) -> Self {
        Self {
            name: String::new(),
            project_code: None,
            project_id: None,
            purposes: Vec::new(),
            status: String::new(),
            decision: String::new(),
            expected_implementation: String::new(),
            contact: Contact::default(),
            description: String::new(),
            web_link: None,
            location: String::new(),
            region: region.into(),
            district: district.into(),
            snapshot_date,
            documents: Vec::new(),
        }
    }

    /// Whether a document feed can be fetched for this project.
    pub fn has_project_id(&self) -> bool {
        self.project_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// Contact block of a project row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

fn non_empty<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<DocumentMeta>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Vec<DocumentMeta>> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}
