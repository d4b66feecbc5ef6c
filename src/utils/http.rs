// src/utils/http.rs

//! HTTP transport with bounded exponential backoff.
//!
//! Responses with status >= 300 are retried until `retry.max_attempts` is
//! reached. Connection failures are returned to the caller on the first
//! occurrence. Every sleep races the cancellation token.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::models::{Config, CrawlerConfig, RetryConfig};

/// Create a configured asynchronous HTTP client.
pub fn create_client(config: &CrawlerConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Shared fetcher used by every reader.
///
/// Cloning is cheap; clones share the client, the in-flight limit and the
/// cancellation token.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    retry: RetryConfig,
    delay: Duration,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl HttpFetcher {
    pub fn new(config: &Config, cancel: CancellationToken) -> Result<Self> {
        let client = create_client(&config.crawler)?;
        Ok(Self::with_client(client, config, cancel))
    }

    pub fn with_client(client: Client, config: &Config, cancel: CancellationToken) -> Self {
        Self {
            client,
            retry: config.retry.clone(),
            delay: Duration::from_millis(config.crawler.request_delay_ms),
            permits: Arc::new(Semaphore::new(config.crawler.max_concurrent.max(1))),
            cancel,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fetch a URL, retrying non-success responses.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let (_, body) = self.fetch_with_status(url).await?;
        Ok(body)
    }

    /// Fetch a page that must answer 200, decoded lossily as UTF-8.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let (status, body) = self.fetch_with_status(url).await?;
        if status != StatusCode::OK {
            return Err(AppError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    async fn fetch_with_status(&self, url: &str) -> Result<(StatusCode, Vec<u8>)> {
        let mut attempt: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }
            attempt += 1;

            let (status, body) = self.send_once(url).await?;
            if status.as_u16() < 300 {
                return Ok((status, body));
            }

            if attempt >= self.retry.max_attempts {
                return Err(AppError::RetriesExhausted {
                    url: url.to_string(),
                    status: status.as_u16(),
                    attempts: attempt,
                });
            }

            let wait = self.retry.backoff(attempt - 1);
            log::warn!(
                "Request to {} failed with {}. Sleeping {:?} before attempt {}/{}",
                url,
                status,
                wait,
                attempt + 1,
                self.retry.max_attempts
            );

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(AppError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    async fn send_once(&self, url: &str) -> Result<(StatusCode, Vec<u8>)> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| AppError::Cancelled)?;

        let request = async {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            let body = response.bytes().await?.to_vec();
            Ok::<_, AppError>((status, body))
        };

        let result = tokio::select! {
            _ = self.cancel.cancelled() => return Err(AppError::Cancelled),
            result = request => result?,
        };

        // The permit is held through the delay; the body is already read.
        if !self.delay.is_zero() {
            tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = tokio::time::sleep(self.delay) => {}
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config(max_attempts: u32) -> Config {
        let mut config = Config::default();
        config.crawler.request_delay_ms = 0;
        config.retry.initial_interval_ms = 1;
        config.retry.max_interval_ms = 5;
        config.retry.max_attempts = max_attempts;
        config
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .with_status(200)
            .with_body("hello")
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(&fast_config(3), CancellationToken::new()).unwrap();
        let body = fetcher.fetch_text(&format!("{}/page", server.url())).await.unwrap();

        assert_eq!(body, "hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/busy")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(&fast_config(3), CancellationToken::new()).unwrap();
        let err = fetcher
            .fetch(&format!("{}/busy", server.url()))
            .await
            .unwrap_err();

        match err {
            AppError::RetriesExhausted {
                status, attempts, ..
            } => {
                assert_eq!(status, 503);
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_failure_is_not_retried() {
        let fetcher = HttpFetcher::new(&fast_config(5), CancellationToken::new()).unwrap();
        // Port 9 (discard) on localhost is closed in test environments.
        let err = fetcher.fetch("http://127.0.0.1:9/none").await.unwrap_err();
        assert!(matches!(err, AppError::Http(_)));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_backoff() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/slow")
            .with_status(500)
            .create_async()
            .await;

        let mut config = fast_config(10);
        config.retry.initial_interval_ms = 60_000;
        config.retry.max_interval_ms = 60_000;

        let cancel = CancellationToken::new();
        let fetcher = HttpFetcher::new(&config, cancel.clone()).unwrap();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let started = std::time::Instant::now();
        let err = fetcher
            .fetch(&format!("{}/slow", server.url()))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_cancel_cuts_request_delay_short() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/page")
            .with_status(200)
            .with_body("hello")
            .create_async()
            .await;

        let mut config = fast_config(1);
        config.crawler.request_delay_ms = 60_000;

        let cancel = CancellationToken::new();
        let fetcher = HttpFetcher::new(&config, cancel.clone()).unwrap();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            canceller.cancel();
        });

        let started = std::time::Instant::now();
        let body = fetcher.fetch(&format!("{}/page", server.url())).await.unwrap();

        assert_eq!(body, b"hello");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_fetch_text_rejects_non_200_success() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/empty")
            .with_status(204)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(&fast_config(2), CancellationToken::new()).unwrap();
        let err = fetcher
            .fetch_text(&format!("{}/empty", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Status { status: 204, .. }));
    }
}
