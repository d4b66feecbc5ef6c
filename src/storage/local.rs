//! Local filesystem storage implementation.
//!
//! Datasets and documents are written atomically: bytes go to a temporary
//! sibling first and are renamed into place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Unit;
use crate::storage::{
    DATASET_DIR, DOCUMENT_DIR, DatasetStore, DocumentArchive, dataset_key, latest_dataset,
};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// File names in the dataset directory.
    async fn dataset_names(&self) -> Result<Vec<String>> {
        let dir = self.path(DATASET_DIR);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                names.push(format!("{DATASET_DIR}/{name}"));
            }
        }
        Ok(names)
    }

    /// Key of the newest saved dataset, if any.
    pub async fn latest_key(&self) -> Result<Option<String>> {
        let names = self.dataset_names().await?;
        Ok(latest_dataset(names.iter().map(String::as_str)).map(str::to_string))
    }
}

#[async_trait]
impl DatasetStore for LocalStorage {
    async fn load_latest(&self) -> Result<Vec<Unit>> {
        let Some(key) = self.latest_key().await? else {
            return Err(AppError::NotFound(format!(
                "no dataset under {}",
                self.path(DATASET_DIR).display()
            )));
        };

        log::info!("Loading dataset {key}");
        let bytes = tokio::fs::read(self.path(&key)).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save(&self, units: &[Unit]) -> Result<String> {
        let key = dataset_key(Utc::now().date_naive());
        let path = self.path(&key);
        let bytes = serde_json::to_vec_pretty(units)?;

        self.write_bytes(&path, &bytes).await?;
        log::info!("Wrote {} units to {}", units.len(), path.display());
        Ok(path.display().to_string())
    }
}

#[async_trait]
impl DocumentArchive for LocalStorage {
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path(DOCUMENT_DIR).join(key)).await?)
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path(DOCUMENT_DIR).join(key);
        self.write_bytes(&path, &bytes).await
    }
}
