//! Webhook notifier
//!
//! Sends the summary as a plain JSON POST:
//! `{"appToken": ..., "content": ..., "contentType": 1, "uids": [...]}`.
//! The endpoint answers `{"success": bool, "msg": ...}`.

use crate::output::{Delivery, DigestError, DigestResult, Notifier};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PushRequest<'a> {
    app_token: &'a str,
    content: &'a str,
    content_type: u8,
    uids: &'a [String],
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    msg: Option<String>,
}

/// Push notifier posting to a JSON webhook
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    endpoint: String,
    app_token: String,
}

impl WebhookNotifier {
    pub fn new(client: Client, endpoint: impl Into<String>, app_token: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            app_token: app_token.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str, recipients: &[String]) -> DigestResult<Delivery> {
        let request = PushRequest {
            app_token: &self.app_token,
            content: message,
            content_type: 1,
            uids: recipients,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: PushResponse = response.json().await?;
        if !body.success {
            return Err(DigestError::Rejected(
                body.msg.unwrap_or_else(|| "push endpoint reported failure".to_string()),
            ));
        }

        Ok(Delivery {
            recipients: recipients.len(),
        })
    }
}

/// Reads the recipients file: one id per line, blanks and `#` comments ignored
///
/// A missing file yields no recipients.
pub fn read_recipients(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect(),
        Err(e) => {
            warn!("Cannot read recipients from {}: {}", path.display(), e);
            Vec::new()
        }
    }
}
