//! OpenAI-compatible chat summarizer
//!
//! Posts the digest content as the user message of a chat completion and
//! returns the first choice.

use crate::output::{DigestError, DigestResult, Summarizer};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

/// Summarizer backed by a chat-completions endpoint
#[derive(Clone)]
pub struct ChatSummarizer {
    client: Client,
    base_url: String,
    model: String,
    system_prompt: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl ChatSummarizer {
    /// Creates a summarizer; the key is read from `api_key_env`
    ///
    /// A missing key is not an error here: every call then returns the
    /// `Error: ...` string.
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        api_key_env: impl Into<String>,
    ) -> Self {
        let api_key_env = api_key_env.into();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            system_prompt: system_prompt.into(),
            api_key: std::env::var(&api_key_env).ok().filter(|k| !k.is_empty()),
            api_key_env,
        }
    }

    /// Overrides the API key (for tests and callers with their own secret store)
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    async fn complete(&self, api_key: &str, content: &str) -> DigestResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DigestError::Rejected(format!("{}: {}", status, error_text)));
        }

        let chat: ChatResponse = response.json().await?;
        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| DigestError::Rejected("no choices in response".to_string()))
    }
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    async fn summarize(&self, content: &str) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return format!("Error: {} not found", self.api_key_env);
        };

        match self.complete(api_key, content).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Summarization failed: {}", e);
                format!("Error: {}", e)
            }
        }
    }
}
