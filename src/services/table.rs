// src/services/table.rs

//! Snapshot table parser.
//!
//! A snapshot page is one flat table. Group header rows set the region and
//! district for the rows below them; each project then spans a data row, an
//! optional description row and a location row, which completes it.
//! Rows are classified first and folded through [`TableState`].

use scraper::{ElementRef, Html, Selector};

use crate::error::Result;
use crate::models::{
    NATIONAL_REGION, ParseAnomaly, ParsedSnapshot, ProjectUpdate, SnapshotRef,
};
use crate::services::fields::FieldExtractor;
use crate::services::purposes::parse_purposes;
use crate::utils::{element_text, parse_selector};

/// Leading rows of every snapshot table that carry column headings.
pub const HEADER_ROWS: usize = 3;

const GROUP_HEADER_TITLE: &str = "Group of Projects";
const DESCRIPTION_TITLE: &str = "ProjectDescription";
const LOCATION_TITLE: &str = "ProjectLocation";

/// Lower-cased text of the single-cell row shown for an empty table.
const NO_RESULTS_MARKER: &str = "no results";

/// Columns a data row needs to reach the contact block.
const CONTACT_COLUMN: usize = 5;

/// One table cell, kept as markup for `<br>` splitting.
#[derive(Debug, Clone)]
pub struct Cell {
    pub html: String,
    pub text: String,
    pub links: Vec<String>,
}

/// What a table row contributes to the fold.
#[derive(Debug, Clone)]
pub enum RowKind {
    GroupHeader(Vec<String>),
    Description(String),
    Location(String),
    DataRow(Vec<Cell>),
    Skip,
}

/// Record under construction.
#[derive(Debug)]
enum Pending {
    Empty,
    Building(Box<ProjectUpdate>),
    /// A rejected record whose trailing rows are still to come.
    Rejected,
}

/// Fold accumulator for one snapshot table.
struct TableState<'a> {
    snapshot: &'a SnapshotRef,
    fields: &'a FieldExtractor,
    region: String,
    district: String,
    pending: Pending,
    projects: Vec<ProjectUpdate>,
    anomalies: Vec<ParseAnomaly>,
}

impl<'a> TableState<'a> {
    fn new(snapshot: &'a SnapshotRef, fields: &'a FieldExtractor) -> Self {
        Self {
            snapshot,
            fields,
            region: NATIONAL_REGION.to_string(),
            district: String::new(),
            pending: Pending::Empty,
            projects: Vec::new(),
            anomalies: Vec::new(),
        }
    }

    fn anomaly(&mut self, index: usize, message: impl Into<String>) {
        self.anomalies.push(ParseAnomaly::new(
            format!("{} row {index}", self.snapshot.url),
            message,
        ));
    }

    fn apply(mut self, (index, row): (usize, RowKind)) -> Self {
        match row {
            RowKind::Skip => {}
            RowKind::GroupHeader(cells) => {
                self.district = cells.first().cloned().unwrap_or_default();
                self.region = cells
                    .get(1)
                    .filter(|region| !region.is_empty())
                    .cloned()
                    .unwrap_or_else(|| NATIONAL_REGION.to_string());
            }
            RowKind::Description(text) => {
                if let Pending::Building(project) = &mut self.pending {
                    let fields = self.fields.description(&text);
                    project.description = fields.description;
                    project.web_link = fields.web_link;
                    if fields.project_id.is_some() {
                        project.project_id = fields.project_id;
                    }
                } else if matches!(self.pending, Pending::Empty) {
                    self.anomaly(index, "description row without a project row");
                }
            }
            RowKind::Location(text) => {
                match std::mem::replace(&mut self.pending, Pending::Empty) {
                    Pending::Building(mut project) => {
                        project.location = self.fields.location(&text);
                        self.projects.push(*project);
                    }
                    Pending::Rejected => {}
                    Pending::Empty if index == HEADER_ROWS => {}
                    Pending::Empty => self.anomaly(index, "location row without a project row"),
                }
            }
            RowKind::DataRow(cells) => {
                if let Pending::Building(unfinished) = &self.pending {
                    let message = format!(
                        "project '{}' has no location row; discarded",
                        unfinished.name
                    );
                    self.anomaly(index, message);
                }
                self.pending = match self.build(&cells) {
                    Ok(project) => Pending::Building(Box::new(project)),
                    Err(message) => {
                        self.anomaly(index, message);
                        Pending::Rejected
                    }
                };
            }
        }
        self
    }

    fn build(&self, cells: &[Cell]) -> std::result::Result<ProjectUpdate, String> {
        let Some(contact_cell) = cells.get(CONTACT_COLUMN) else {
            return Err(format!("data row has {} cells, no contact block", cells.len()));
        };

        let mut project =
            ProjectUpdate::new(&self.region, &self.district, self.snapshot.date);

        let (name, code) = self.fields.name_and_code(&cells[0].html);
        if name.is_empty() {
            return Err("project row has no name".to_string());
        }
        project.name = name;
        project.project_code = code;
        project.project_id = cells[0]
            .links
            .iter()
            .find_map(|href| self.fields.project_id(href));

        project.purposes = parse_purposes(&cells[1].text);
        project.status = self.fields.status(&cells[2].html);
        project.decision = cells[3].text.clone();
        project.expected_implementation = cells[4].text.clone();
        project.contact = self
            .fields
            .contact(&contact_cell.html)
            .map_err(|e| format!("project '{}': {e}", project.name))?;

        Ok(project)
    }

    fn finish(mut self) -> ParsedSnapshot {
        if let Pending::Building(project) = std::mem::replace(&mut self.pending, Pending::Empty) {
            let message = format!("project '{}' still pending at end of table", project.name);
            self.anomalies.push(ParseAnomaly::new(self.snapshot.url.clone(), message));
        }
        ParsedSnapshot {
            projects: self.projects,
            anomalies: self.anomalies,
        }
    }
}

/// Parser for snapshot report pages.
pub struct SnapshotTableParser {
    row_selector: Selector,
    cell_selector: Selector,
    link_selector: Selector,
    fields: FieldExtractor,
}

impl SnapshotTableParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            row_selector: parse_selector("table tbody tr")?,
            cell_selector: parse_selector("td")?,
            link_selector: parse_selector("a[href]")?,
            fields: FieldExtractor::new()?,
        })
    }

    /// Parse every project record out of a snapshot page.
    pub fn parse(&self, html: &str, snapshot: &SnapshotRef) -> ParsedSnapshot {
        let document = Html::parse_document(html);

        let rows: Vec<(usize, RowKind)> = document
            .select(&self.row_selector)
            .enumerate()
            .skip(HEADER_ROWS)
            .map(|(index, row)| (index, self.classify(&row)))
            .collect();

        rows.into_iter()
            .fold(TableState::new(snapshot, &self.fields), TableState::apply)
            .finish()
    }

    /// Decide what a row contributes.
    pub fn classify(&self, row: &ElementRef) -> RowKind {
        match row.value().attr("title") {
            Some(GROUP_HEADER_TITLE) => RowKind::GroupHeader(
                row.select(&self.cell_selector)
                    .map(|cell| element_text(&cell))
                    .collect(),
            ),
            Some(DESCRIPTION_TITLE) => RowKind::Description(element_text(row)),
            Some(LOCATION_TITLE) => RowKind::Location(element_text(row)),
            Some(_) => RowKind::Skip,
            None => {
                let cells: Vec<ElementRef> = row.select(&self.cell_selector).collect();
                match cells.as_slice() {
                    [] => return RowKind::Skip,
                    [only] if element_text(only).to_lowercase().contains(NO_RESULTS_MARKER) => {
                        return RowKind::Skip;
                    }
                    _ => {}
                }
                RowKind::DataRow(cells.iter().map(|cell| self.cell(cell)).collect())
            }
        }
    }

    fn cell(&self, cell: &ElementRef) -> Cell {
        Cell {
            html: cell.inner_html(),
            text: element_text(cell),
            links: cell
                .select(&self.link_selector)
                .filter_map(|a| a.value().attr("href"))
                .map(str::to_string)
                .collect(),
        }
    }
}
