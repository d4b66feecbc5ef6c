// src/pipeline/export.rs

//! Flattened CSV export of a dataset.
//!
//! Writes `units.csv`, `projects.csv`, `project_updates.csv` and
//! `documents.csv`. `projects.csv` keeps only the newest update per project
//! name in each unit. Fields are quoted per RFC 4180 when they contain a
//! comma, quote or line break.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::Path;

use crate::error::Result;
use crate::models::{ProjectUpdate, Unit};
use crate::storage::DatasetStore;
use crate::utils::log;

pub const UNITS_FILE: &str = "units.csv";
pub const PROJECTS_FILE: &str = "projects.csv";
pub const PROJECT_UPDATES_FILE: &str = "project_updates.csv";
pub const DOCUMENTS_FILE: &str = "documents.csv";

const PURPOSE_JOINER: &str = ", ";
const DATE_JOINER: &str = "; ";

/// Row counts of a finished export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub units: usize,
    pub projects: usize,
    pub project_updates: usize,
    pub documents: usize,
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write one CSV record terminated by CRLF.
pub fn write_row<W: Write, S: AsRef<str>>(w: &mut W, row: &[S]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            w.write_all(b",")?;
        }
        let cell = cell.as_ref();
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\r\n")
}

fn table<S: AsRef<str>>(header: &[&str], rows: impl IntoIterator<Item = Vec<S>>) -> io::Result<(Vec<u8>, usize)> {
    let mut out = Vec::new();
    write_row(&mut out, header)?;
    let mut count = 0;
    for row in rows {
        write_row(&mut out, &row)?;
        count += 1;
    }
    Ok((out, count))
}

/// `units.csv`
pub fn units_csv(units: &[Unit]) -> io::Result<(Vec<u8>, usize)> {
    table(
        &[
            "canonical_id",
            "name",
            "state_group",
            "detail_url",
            "known_snapshot_dates",
            "project_count",
        ],
        units.iter().map(|unit| {
            vec![
                unit.canonical_id.clone(),
                unit.name.clone(),
                unit.state_group.clone(),
                unit.detail_url.clone(),
                unit.known_snapshot_dates
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(DATE_JOINER),
                unit.projects.len().to_string(),
            ]
        }),
    )
}

fn project_rows(units: &[Unit]) -> impl Iterator<Item = (&Unit, &ProjectUpdate)> {
    units
        .iter()
        .flat_map(|unit| unit.projects.iter().map(move |project| (unit, project)))
}

const PROJECT_HEADER: [&str; 18] = [
    "unit_id",
    "unit_name",
    "name",
    "project_code",
    "project_id",
    "purposes",
    "status",
    "decision",
    "expected_implementation",
    "contact_name",
    "contact_email",
    "contact_phone",
    "description",
    "web_link",
    "location",
    "region",
    "district",
    "snapshot_date",
];

fn project_row(unit: &Unit, p: &ProjectUpdate) -> Vec<String> {
    vec![
        unit.canonical_id.clone(),
        unit.name.clone(),
        p.name.clone(),
        p.project_code.clone().unwrap_or_default(),
        p.project_id.clone().unwrap_or_default(),
        p.purposes.join(PURPOSE_JOINER),
        p.status.clone(),
        p.decision.clone(),
        p.expected_implementation.clone(),
        p.contact.name.clone(),
        p.contact.email.clone(),
        p.contact.phone.clone(),
        p.description.clone(),
        p.web_link.clone().unwrap_or_default(),
        p.location.clone(),
        p.region.clone(),
        p.district.clone(),
        p.snapshot_date.to_string(),
    ]
}

/// Newest update per project name, in order of first appearance.
///
/// On equal snapshot dates the earlier record wins.
pub fn latest_per_name(projects: &[ProjectUpdate]) -> Vec<&ProjectUpdate> {
    let mut latest: Vec<&ProjectUpdate> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();

    for project in projects {
        match slots.get(project.name.as_str()) {
            Some(&slot) => {
                if project.snapshot_date > latest[slot].snapshot_date {
                    latest[slot] = project;
                }
            }
            None => {
                slots.insert(&project.name, latest.len());
                latest.push(project);
            }
        }
    }
    latest
}

/// `projects.csv`
pub fn projects_csv(units: &[Unit]) -> io::Result<(Vec<u8>, usize)> {
    table(
        &PROJECT_HEADER,
        units.iter().flat_map(|unit| {
            latest_per_name(&unit.projects)
                .into_iter()
                .map(move |p| project_row(unit, p))
        }),
    )
}

/// `project_updates.csv`
pub fn project_updates_csv(units: &[Unit]) -> io::Result<(Vec<u8>, usize)> {
    table(
        &PROJECT_HEADER,
        project_rows(units).map(|(unit, p)| project_row(unit, p)),
    )
}

/// `documents.csv`
pub fn documents_csv(units: &[Unit]) -> io::Result<(Vec<u8>, usize)> {
    table(
        &[
            "unit_id",
            "project_name",
            "project_id",
            "name",
            "url",
            "category",
            "date_string",
            "date",
        ],
        project_rows(units).flat_map(|(unit, p)| {
            p.documents.iter().map(move |doc| {
                vec![
                    unit.canonical_id.clone(),
                    p.name.clone(),
                    p.project_id.clone().unwrap_or_default(),
                    doc.name.clone(),
                    doc.url.clone(),
                    doc.category.clone(),
                    doc.date_string.clone(),
                    doc.date.map(|d| d.to_string()).unwrap_or_default(),
                ]
            })
        }),
    )
}

/// Write the CSV tables for a dataset into `out_dir`.
pub async fn export_units(units: &[Unit], out_dir: &Path) -> Result<ExportSummary> {
    tokio::fs::create_dir_all(out_dir).await?;

    let (bytes, units_count) = units_csv(units)?;
    tokio::fs::write(out_dir.join(UNITS_FILE), bytes).await?;

    let (bytes, latest_count) = projects_csv(units)?;
    tokio::fs::write(out_dir.join(PROJECTS_FILE), bytes).await?;

    let (bytes, project_count) = project_updates_csv(units)?;
    tokio::fs::write(out_dir.join(PROJECT_UPDATES_FILE), bytes).await?;

    let (bytes, document_count) = documents_csv(units)?;
    tokio::fs::write(out_dir.join(DOCUMENTS_FILE), bytes).await?;

    Ok(ExportSummary {
        units: units_count,
        projects: latest_count,
        project_updates: project_count,
        documents: document_count,
    })
}

/// Export the latest saved dataset.
pub async fn run_export(store: &dyn DatasetStore, out_dir: &Path) -> Result<ExportSummary> {
    log::header("SOPA Export");
    let units = store.load_latest().await?;
    let summary = export_units(&units, out_dir).await?;

    log::summary(
        "Export Results",
        &[
            ("Directory", out_dir.display().to_string()),
            ("Units", summary.units.to_string()),
            ("Projects", summary.projects.to_string()),
            ("Project updates", summary.project_updates.to_string()),
            ("Documents", summary.documents.to_string()),
        ],
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::models::DocumentMeta;

    fn sample() -> Vec<Unit> {
        let mut unit = Unit::new("Lolo", "Montana", "110116", "https://x/?110116");
        unit.known_snapshot_dates.insert("2021-04".parse().unwrap());
        unit.known_snapshot_dates.insert("2021-07".parse().unwrap());

        let mut project = ProjectUpdate::new("Northern Region", "Missoula", "2021-07".parse().unwrap());
        project.name = "Trail \"North\" Reroute".into();
        project.purposes = vec!["Recreation management".into(), "Water management".into()];
        project.status = "In Progress:\nScoping".into();
        project.project_id = Some("58124".into());
        project.documents.push(DocumentMeta {
            name: "Scoping Letter".into(),
            url: "https://x/doc.pdf".into(),
            category: "Scoping".into(),
            date_string: "06-01-2021".into(),
            date: chrono::NaiveDate::from_ymd_opt(2021, 6, 1),
        });
        unit.projects.push(project);
        vec![unit]
    }

    #[test]
    fn test_write_row_quotes_when_needed() {
        let mut out = Vec::new();
        write_row(&mut out, &["plain", "a,b", "say \"hi\"", "two\nlines"]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "plain,\"a,b\",\"say \"\"hi\"\"\",\"two\nlines\"\r\n"
        );
    }

    #[test]
    fn test_units_csv() {
        let (bytes, count) = units_csv(&sample()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(count, 1);
        assert!(text.contains("110116,Lolo,Montana,https://x/?110116,2021-04; 2021-07,1\r\n"));
    }

    #[test]
    fn test_project_updates_csv_joins_purposes() {
        let (bytes, count) = project_updates_csv(&sample()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(count, 1);
        assert!(text.contains("\"Trail \"\"North\"\" Reroute\""));
        assert!(text.contains("\"Recreation management, Water management\""));
        assert!(text.contains("\"In Progress:\nScoping\""));
    }

    #[test]
    fn test_projects_csv_keeps_newest_update_per_name() {
        let mut units = sample();
        let mut older = ProjectUpdate::new("Northern Region", "Missoula", "2021-04".parse().unwrap());
        older.name = "Trail \"North\" Reroute".into();
        older.status = "Developing Proposal".into();
        let mut other = ProjectUpdate::new("Northern Region", "Missoula", "2021-04".parse().unwrap());
        other.name = "Hazard Trees".into();
        units[0].projects.insert(0, older);
        units[0].projects.push(other);

        let latest = latest_per_name(&units[0].projects);
        let picked: Vec<_> = latest
            .iter()
            .map(|p| (p.name.as_str(), p.snapshot_date.to_string()))
            .collect();
        assert_eq!(
            picked,
            vec![
                ("Trail \"North\" Reroute", "2021-07".to_string()),
                ("Hazard Trees", "2021-04".to_string()),
            ]
        );

        let (bytes, count) = projects_csv(&units).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(count, 2);
        assert!(text.contains("\"In Progress:\nScoping\""));
        assert!(!text.contains("Developing Proposal"));

        let (_, updates) = project_updates_csv(&units).unwrap();
        assert_eq!(updates, 3);
    }

    #[tokio::test]
    async fn test_export_writes_every_table() {
        let dir = TempDir::new().unwrap();
        let summary = export_units(&sample(), dir.path()).await.unwrap();

        assert_eq!(
            summary,
            ExportSummary {
                units: 1,
                projects: 1,
                project_updates: 1,
                documents: 1
            }
        );
        let documents = tokio::fs::read_to_string(dir.path().join(DOCUMENTS_FILE))
            .await
            .unwrap();
        assert!(documents.starts_with("unit_id,project_name,project_id,name,url,category,date_string,date\r\n"));
        assert!(documents.contains("2021-06-01"));
    }
}
