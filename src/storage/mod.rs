//! Storage abstractions for datasets and archived documents.
//!
//! ## Layout
//!
//! ```text
//! {root}/
//! ├── datasets/                    # One full dataset per run day
//! │   ├── 2021-07-02.json
//! │   └── 2021-10-01.json
//! └── documents/                   # Archived project documents
//!     └── {projectId}/{category}/{name}.pdf
//! ```
//!
//! The latest dataset is the lexicographically greatest dated key.

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{DocumentMeta, Unit};
use crate::utils::http::HttpFetcher;

pub use local::LocalStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;

/// Directory of dated dataset files.
pub const DATASET_DIR: &str = "datasets";

/// Directory of archived documents.
pub const DOCUMENT_DIR: &str = "documents";

const DATASET_EXTENSION: &str = ".json";
const DOCUMENT_EXTENSION: &str = ".pdf";
const UNCATEGORIZED: &str = "uncategorized";

/// Key of the dataset written on `date`.
pub fn dataset_key(date: NaiveDate) -> String {
    format!("{DATASET_DIR}/{}{DATASET_EXTENSION}", date.format("%Y-%m-%d"))
}

/// Pick the newest dataset among listed file names or keys.
pub fn latest_dataset<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    names
        .into_iter()
        .filter(|name| {
            file_name(name)
                .strip_suffix(DATASET_EXTENSION)
                .is_some_and(|stem| NaiveDate::parse_from_str(stem, "%Y-%m-%d").is_ok())
        })
        .max_by_key(|name| file_name(*name))
}

fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Archive key `{projectId}/{category}/{name}.pdf` for a document.
pub fn document_key(document: &DocumentMeta, owner_project_id: &str) -> String {
    let category = if document.category.is_empty() {
        UNCATEGORIZED
    } else {
        document.category.as_str()
    };
    format!(
        "{}/{}/{}{DOCUMENT_EXTENSION}",
        path_segment(owner_project_id),
        path_segment(category),
        path_segment(&document.name)
    )
}

fn path_segment(s: &str) -> String {
    s.trim()
        .replace(['/', '\\'], "-")
        .trim_start_matches('.')
        .to_string()
}

/// Result of archiving one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOutcome {
    Stored,
    AlreadyPresent,
}

/// Persistence for full datasets.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Load the newest dataset; `NotFound` when none was ever saved.
    async fn load_latest(&self) -> Result<Vec<Unit>>;

    /// Save a dataset under today's key and return where it went.
    async fn save(&self, units: &[Unit]) -> Result<String>;
}

/// Object store for downloaded project documents.
#[async_trait]
pub trait DocumentArchive: Send + Sync {
    async fn contains(&self, key: &str) -> Result<bool>;

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Download and store a document unless its key already exists.
    async fn archive(
        &self,
        fetcher: &HttpFetcher,
        document: &DocumentMeta,
        owner_project_id: &str,
    ) -> Result<ArchiveOutcome> {
        let key = document_key(document, owner_project_id);
        if self.contains(&key).await? {
            return Ok(ArchiveOutcome::AlreadyPresent);
        }

        let bytes = fetcher.fetch(&document.url).await?;
        self.put(&key, bytes).await?;
        Ok(ArchiveOutcome::Stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(name: &str, category: &str) -> DocumentMeta {
        DocumentMeta {
            name: name.into(),
            url: "https://www.fs.fed.us/nepa_project_documents/58124_FSPLT3_5560.pdf".into(),
            category: category.into(),
            date_string: String::new(),
            date: None,
        }
    }

    #[test]
    fn test_dataset_key() {
        let date = NaiveDate::from_ymd_opt(2021, 7, 2).unwrap();
        assert_eq!(dataset_key(date), "datasets/2021-07-02.json");
    }

    #[test]
    fn test_latest_dataset_ignores_other_files() {
        let names = [
            "datasets/2021-07-02.json",
            "datasets/2021-10-01.json",
            "datasets/notes.json",
            "datasets/2021-12-01.json.tmp",
        ];
        assert_eq!(latest_dataset(names), Some("datasets/2021-10-01.json"));
        assert_eq!(latest_dataset(std::iter::empty()), None);
    }

    #[test]
    fn test_document_key() {
        assert_eq!(
            document_key(&document("Scoping Letter", "Scoping"), "58124"),
            "58124/Scoping/Scoping Letter.pdf"
        );
        assert_eq!(
            document_key(&document("../Map 1/2", ""), "58124"),
            "58124/uncategorized/-Map 1-2.pdf"
        );
    }
}
