//! AWS S3 storage implementation.
//!
//! Same layout as the local backend, under `{bucket}/{prefix}/`.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::Unit;
use crate::storage::{
    DATASET_DIR, DOCUMENT_DIR, DatasetStore, DocumentArchive, dataset_key, latest_dataset,
};

/// S3-based dataset and document storage.
pub struct S3Storage {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3Storage {
    /// Create a new S3 storage instance.
    pub fn new(client: Client, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    /// Create S3 storage from environment configuration.
    pub async fn from_env() -> Result<Self> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = Client::new(&config);

        let bucket = std::env::var("S3_BUCKET")
            .map_err(|_| AppError::config("S3_BUCKET must be set for S3 storage"))?;
        let prefix = std::env::var("S3_PREFIX").unwrap_or_else(|_| "sopa".to_string());

        Ok(Self::new(client, bucket, prefix))
    }

    fn key(&self, relative: &str) -> String {
        if self.prefix.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{relative}", self.prefix.trim_end_matches('/'))
        }
    }

    /// Every key under the dataset directory.
    async fn dataset_keys(&self) -> Result<Vec<String>> {
        let prefix = self.key(&format!("{DATASET_DIR}/"));
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| AppError::storage(e.into_service_error()))?;

            keys.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::storage(e.into_service_error()))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(AppError::storage)?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::storage(e.into_service_error()))?;
        Ok(())
    }
}

#[async_trait]
impl DatasetStore for S3Storage {
    async fn load_latest(&self) -> Result<Vec<Unit>> {
        let keys = self.dataset_keys().await?;
        let Some(key) = latest_dataset(keys.iter().map(String::as_str)) else {
            return Err(AppError::NotFound(format!(
                "no dataset under s3://{}/{}",
                self.bucket,
                self.key(DATASET_DIR)
            )));
        };

        log::info!("Loading dataset s3://{}/{}", self.bucket, key);
        let bytes = self.get(key).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save(&self, units: &[Unit]) -> Result<String> {
        let key = self.key(&dataset_key(Utc::now().date_naive()));
        let bytes = serde_json::to_vec_pretty(units)?;

        self.put_object(&key, bytes, "application/json").await?;

        let location = format!("s3://{}/{}", self.bucket, key);
        log::info!("Wrote {} units to {location}", units.len());
        Ok(location)
    }
}

#[async_trait]
impl DocumentArchive for S3Storage {
    async fn contains(&self, key: &str) -> Result<bool> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.key(&format!("{DOCUMENT_DIR}/{key}")))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(AppError::storage(service_err))
                }
            }
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let key = self.key(&format!("{DOCUMENT_DIR}/{key}"));
        self.put_object(&key, bytes, "application/pdf").await
    }
}
