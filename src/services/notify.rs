// src/services/notify.rs

//! Chat notifications for update runs.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::error::Result;
use crate::models::Unit;
use crate::utils::log;

/// Message sent when no unit had a newer snapshot.
pub const NO_UPDATES_MESSAGE: &str = "No new SOPA Reports found";

/// Announcement for a unit whose newest snapshot was just parsed.
pub fn new_report_message(unit: &Unit, report_url: &str) -> String {
    format!(
        "Found new <{report_url}|SOPA Report> for *{}* forest in *{}*",
        unit.name, unit.state_group
    )
}

/// Destination for run notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}

/// Posts markdown messages to an incoming chat webhook.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        self.client
            .post(&self.url)
            .json(&json!({ "type": "mrkdwn", "text": message }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Writes notifications to the log only.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        log::info(&format!("[notify] {message}"));
        Ok(())
    }
}

/// Send a notification, logging instead of failing.
pub async fn notify_best_effort(notifier: &dyn Notifier, message: &str) {
    if let Err(e) = notifier.notify(message).await {
        log::warn(&format!("Notification failed: {e}"));
    }
}
