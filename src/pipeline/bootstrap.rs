// src/pipeline/bootstrap.rs

//! Full crawl that builds a dataset from the unit directory.

use crate::error::{AppError, Result};
use crate::models::{Config, UpdateMode};
use crate::pipeline::update::{RunReport, UpdateEngine};
use crate::services::UnitDirectoryReader;
use crate::storage::{DatasetStore, DocumentArchive};
use crate::utils::http::HttpFetcher;
use crate::utils::log;

/// Read the directory, parse every snapshot of every unit and save.
///
/// `limit` keeps only the first units in directory order. An empty
/// directory yields an empty report and writes nothing.
pub async fn run_bootstrap(
    config: &Config,
    fetcher: HttpFetcher,
    store: &dyn DatasetStore,
    archive: Option<&dyn DocumentArchive>,
    limit: Option<usize>,
) -> Result<RunReport> {
    log::header("SOPA Bootstrap");

    log::step(1, 3, "Reading unit directory");
    let directory = UnitDirectoryReader::new(fetcher.clone(), config.source.clone())?;
    let mut units = directory.read().await?;
    if let Some(limit) = limit {
        units.truncate(limit);
    }
    if units.is_empty() {
        log::warn("Unit directory listed no units; nothing to bootstrap");
        let report = RunReport::default();
        report.log_summary("Bootstrap Results");
        return Ok(report);
    }
    log::success(&format!("Found {} units", units.len()));

    log::step(2, 3, "Parsing snapshots");
    let engine = UpdateEngine::new(config, fetcher, archive)?.with_mode(UpdateMode::CatchUp);
    let mut report = engine.refresh(&mut units).await;

    if report.cancelled() {
        log::warn("Bootstrap cancelled; dataset not written");
        report.log_summary("Bootstrap Results");
        return Err(AppError::Cancelled);
    }

    log::step(3, 3, "Saving dataset");
    let location = store.save(&units).await?;
    log::success(&format!("Saved dataset to {location}"));
    report.saved_to = Some(location);

    report.log_summary("Bootstrap Results");
    Ok(report)
}
