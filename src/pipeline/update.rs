// src/pipeline/update.rs

//! Incremental update engine.
//!
//! Units are checked concurrently; each one runs index, parse and document
//! reads in order and hands back owned results. Merges are then applied one
//! unit at a time, so a unit abandoned through cancellation is never
//! partially merged.

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{
    AnomalyLog, Config, ParseAnomaly, ParsedSnapshot, ProjectUpdate, SnapshotRef, Unit,
    UpdateMode,
};
use crate::pipeline::diff::{UnitState, assess};
use crate::pipeline::merge::{MergeStats, merge_snapshot};
use crate::services::notify::{NO_UPDATES_MESSAGE, new_report_message, notify_best_effort};
use crate::services::{
    DocumentMetaReader, Notifier, SnapshotIndexReader, SnapshotTableParser, dated_snapshots,
};
use crate::storage::{ArchiveOutcome, DatasetStore, DocumentArchive};
use crate::utils::http::HttpFetcher;
use crate::utils::log;

/// Outcome of one run over a dataset.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub units_total: usize,
    pub units_up_to_date: usize,
    pub units_stale: usize,
    pub units_failed: usize,
    pub units_cancelled: usize,
    pub snapshots_parsed: usize,
    pub snapshot_failures: usize,
    pub documents_fetched: usize,
    pub document_failures: usize,
    pub documents_archived: usize,
    pub archive_failures: usize,
    pub merge: MergeStats,
    pub anomalies: AnomalyLog,
    /// One announcement per unit with a newly parsed snapshot
    pub new_reports: Vec<String>,
    pub saved_to: Option<String>,
}

impl RunReport {
    /// Whether the dataset differs from the one loaded.
    pub fn changed(&self) -> bool {
        self.merge.changed()
    }

    pub fn cancelled(&self) -> bool {
        self.units_cancelled > 0
    }

    /// Log the run summary and a sample of parse anomalies.
    pub fn log_summary(&self, title: &str) {
        log::summary(
            title,
            &[
                ("Units", self.units_total.to_string()),
                ("Up to date", self.units_up_to_date.to_string()),
                ("Updated", self.units_stale.to_string()),
                ("Failed", self.units_failed.to_string()),
                ("Cancelled", self.units_cancelled.to_string()),
                ("Snapshots parsed", self.snapshots_parsed.to_string()),
                ("Snapshot failures", self.snapshot_failures.to_string()),
                ("Projects inserted", self.merge.inserted.to_string()),
                ("Projects replaced", self.merge.replaced.to_string()),
                ("Documents", self.documents_fetched.to_string()),
                ("Document failures", self.document_failures.to_string()),
                ("Archived", self.documents_archived.to_string()),
                ("Parse anomalies", self.anomalies.total.to_string()),
            ],
        );

        for anomaly in &self.anomalies.samples {
            log::warn(&format!("Parse anomaly: {anomaly}"));
        }
        if self.anomalies.total > self.anomalies.samples.len() {
            log::warn(&format!(
                "... and {} more anomalies",
                self.anomalies.total - self.anomalies.samples.len()
            ));
        }
    }
}

/// A parsed target snapshot with its records.
struct ParsedTarget {
    snapshot: SnapshotRef,
    projects: Vec<ProjectUpdate>,
}

/// Owned result of checking one unit.
#[derive(Default)]
struct UnitRefresh {
    stale: bool,
    parsed: Vec<ParsedTarget>,
    anomalies: Vec<ParseAnomaly>,
    snapshot_failures: usize,
    documents_fetched: usize,
    document_failures: usize,
    documents_archived: usize,
    archive_failures: usize,
}

/// Checks units for newer snapshots and merges what it finds.
pub struct UpdateEngine<'a> {
    fetcher: HttpFetcher,
    index: SnapshotIndexReader,
    parser: SnapshotTableParser,
    documents: DocumentMetaReader,
    archive: Option<&'a dyn DocumentArchive>,
    mode: UpdateMode,
    fetch_documents: bool,
    concurrency: usize,
}

impl<'a> UpdateEngine<'a> {
    /// Build the engine. `archive` is only used when document archiving
    /// is enabled in the configuration.
    pub fn new(
        config: &Config,
        fetcher: HttpFetcher,
        archive: Option<&'a dyn DocumentArchive>,
    ) -> Result<Self> {
        Ok(Self {
            index: SnapshotIndexReader::new(fetcher.clone(), config.source.clone())?,
            parser: SnapshotTableParser::new()?,
            documents: DocumentMetaReader::new(fetcher.clone(), config.source.clone())?,
            archive: archive.filter(|_| config.storage.archive_documents),
            mode: config.update.mode,
            fetch_documents: config.update.fetch_documents,
            concurrency: config.crawler.max_concurrent.max(1),
            fetcher,
        })
    }

    pub fn with_mode(mut self, mode: UpdateMode) -> Self {
        self.mode = mode;
        self
    }

    /// Check every unit and merge newer snapshots in place.
    pub async fn refresh(&self, units: &mut [Unit]) -> RunReport {
        let mut report = RunReport {
            units_total: units.len(),
            ..RunReport::default()
        };
        let cancel = self.fetcher.cancel_token().clone();

        let results: Vec<(usize, Result<UnitRefresh>)> = stream::iter(units.iter().enumerate())
            .map(|(index, unit)| {
                let cancel = cancel.clone();
                async move {
                    let result = tokio::select! {
                        _ = cancel.cancelled() => Err(AppError::Cancelled),
                        result = self.refresh_unit(unit) => result,
                    };
                    (index, result)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (index, result) in results {
            let unit = &mut units[index];
            match result {
                Ok(refresh) => Self::apply(unit, refresh, &mut report),
                Err(AppError::Cancelled) => report.units_cancelled += 1,
                Err(e) => {
                    report.units_failed += 1;
                    log::warn(&format!("Skipping {}: {e}", unit.label()));
                }
            }
        }

        report
    }

    fn apply(unit: &mut Unit, refresh: UnitRefresh, report: &mut RunReport) {
        report.snapshot_failures += refresh.snapshot_failures;
        report.documents_fetched += refresh.documents_fetched;
        report.document_failures += refresh.document_failures;
        report.documents_archived += refresh.documents_archived;
        report.archive_failures += refresh.archive_failures;
        report.anomalies.extend(refresh.anomalies);

        if !refresh.stale {
            report.units_up_to_date += 1;
            return;
        }
        report.units_stale += 1;

        let newest = refresh.parsed.last().map(|t| t.snapshot.url.clone());
        for target in refresh.parsed {
            report.snapshots_parsed += 1;
            report.merge += merge_snapshot(unit, target.snapshot.date, target.projects);
        }

        if let Some(url) = newest {
            log::info(&format!("New snapshot for {}: {url}", unit.label()));
            report.new_reports.push(new_report_message(unit, &url));
        }
    }

    async fn refresh_unit(&self, unit: &Unit) -> Result<UnitRefresh> {
        let urls = self.index.read(&unit.detail_url).await?;
        let (available, skipped) = dated_snapshots(&urls);
        let mut refresh = UnitRefresh {
            anomalies: skipped,
            ..UnitRefresh::default()
        };

        let UnitState::Stale { targets } = assess(unit, &available, self.mode) else {
            log::debug(&format!("{} is up to date", unit.label()));
            return Ok(refresh);
        };
        refresh.stale = true;
        let mut last_error = None;

        for target in targets {
            let html = match self.fetcher.fetch_text(&target.url).await {
                Ok(html) => html,
                Err(AppError::Cancelled) => return Err(AppError::Cancelled),
                Err(e) => {
                    log::warn(&format!("Failed to fetch snapshot {}: {e}", target.url));
                    refresh.snapshot_failures += 1;
                    last_error = Some(e);
                    continue;
                }
            };

            let ParsedSnapshot {
                mut projects,
                anomalies,
            } = self.parser.parse(&html, &target);
            log::debug(&format!(
                "Parsed {} projects from {}",
                projects.len(),
                target.url
            ));
            refresh.anomalies.extend(anomalies);

            if self.fetch_documents {
                self.attach_documents(&mut projects, &mut refresh).await?;
            }
            refresh.parsed.push(ParsedTarget {
                snapshot: target,
                projects,
            });
        }

        match last_error {
            Some(e) if refresh.parsed.is_empty() => Err(e),
            _ => Ok(refresh),
        }
    }

    /// Fetch document lists for projects with an id. Only cancellation
    /// aborts; other failures are counted.
    async fn attach_documents(
        &self,
        projects: &mut [ProjectUpdate],
        refresh: &mut UnitRefresh,
    ) -> Result<()> {
        for project in projects.iter_mut() {
            if !project.has_project_id() {
                continue;
            }
            let project_id = project.project_id.clone().unwrap_or_default();

            let documents = match self.documents.read(&project_id).await {
                Ok(documents) => documents,
                Err(AppError::Cancelled) => return Err(AppError::Cancelled),
                Err(e) => {
                    log::warn(&format!("Failed to read documents of project {project_id}: {e}"));
                    refresh.document_failures += 1;
                    continue;
                }
            };
            refresh.documents_fetched += documents.len();

            if let Some(archive) = self.archive {
                for document in &documents {
                    match archive.archive(&self.fetcher, document, &project_id).await {
                        Ok(ArchiveOutcome::Stored) => refresh.documents_archived += 1,
                        Ok(ArchiveOutcome::AlreadyPresent) => {}
                        Err(AppError::Cancelled) => return Err(AppError::Cancelled),
                        Err(e) => {
                            log::warn(&format!("Failed to archive {}: {e}", document.url));
                            refresh.archive_failures += 1;
                        }
                    }
                }
            }

            project.documents = documents;
        }
        Ok(())
    }
}

/// Load the latest dataset, merge newer snapshots, save and notify.
///
/// Fails only when the dataset cannot be loaded or saved.
pub async fn run_update(
    config: &Config,
    fetcher: HttpFetcher,
    store: &dyn DatasetStore,
    archive: Option<&dyn DocumentArchive>,
    notifier: &dyn Notifier,
) -> Result<RunReport> {
    log::header("SOPA Update");

    log::step(1, 3, "Loading dataset");
    let mut units = store.load_latest().await?;
    log::info(&format!("Loaded {} units", units.len()));

    log::step(2, 3, "Checking units for new snapshots");
    let engine = UpdateEngine::new(config, fetcher, archive)?;
    let mut report = engine.refresh(&mut units).await;

    log::step(3, 3, "Saving dataset");
    if report.changed() {
        let location = store.save(&units).await?;
        log::success(&format!("Saved dataset to {location}"));
        report.saved_to = Some(location);
    } else {
        log::info("Dataset unchanged; nothing written");
    }

    if report.new_reports.is_empty() {
        notify_best_effort(notifier, NO_UPDATES_MESSAGE).await;
    } else {
        for message in &report.new_reports {
            notify_best_effort(notifier, message).await;
        }
    }

    if report.cancelled() {
        log::warn(&format!(
            "Run cancelled; {} units were not checked",
            report.units_cancelled
        ));
    }
    report.log_summary("Update Results");
    Ok(report)
}
