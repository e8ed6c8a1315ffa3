//! Messaging platform client: replies, pushes, and content downloads.
//!
//! Endpoints:
//!   POST {api_base}/v2/bot/message/reply
//!   POST {api_base}/v2/bot/message/push
//!   GET  {content_base}/v2/bot/message/{id}/content
//! Auth: channel access token as a bearer token.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::adapters::{Messaging, OutgoingText};
use crate::config::PlatformConfig;

/// Platform REST client
pub struct MessagingClient {
    api_base: String,
    content_base: String,
    channel_token: String,
    client: reqwest::Client,
}

/// Body for the reply endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: &'a [OutgoingText],
}

/// Body for the push endpoint
#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: &'a [OutgoingText],
}

impl MessagingClient {
    /// Create a new client
    pub fn new(config: &PlatformConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            content_base: config.content_base.trim_end_matches('/').to_string(),
            channel_token: config.channel_token.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Build a bot API URL
    fn api_url(&self, method: &str) -> String {
        format!("{}/v2/bot/message/{}", self.api_base, method)
    }

    /// Build a content download URL
    fn content_url(&self, message_id: &str) -> String {
        format!("{}/v2/bot/message/{}/content", self.content_base, message_id)
    }

    async fn post_messages<T: Serialize>(&self, url: &str, body: &T) -> Result<()> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.channel_token)
            .json(body)
            .send()
            .await
            .context("Failed to reach messaging platform")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Messaging API error ({}): {}", status, text);
        }
        Ok(())
    }
}

#[async_trait]
impl Messaging for MessagingClient {
    async fn reply(&self, reply_token: &str, messages: Vec<OutgoingText>) -> Result<()> {
        debug!(count = messages.len(), "sending reply");
        let body = ReplyRequest {
            reply_token,
            messages: &messages,
        };
        self.post_messages(&self.api_url("reply"), &body).await
    }

    async fn push(&self, user_id: &str, message: OutgoingText) -> Result<()> {
        debug!(user = %user_id, "pushing message");
        let messages = [message];
        let body = PushRequest {
            to: user_id,
            messages: &messages,
        };
        self.post_messages(&self.api_url("push"), &body).await
    }

    async fn download_content(&self, message_id: &str, dest: &Path) -> Result<()> {
        let url = self.content_url(message_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.channel_token)
            .send()
            .await
            .context("Failed to request message content")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Content API error ({}): {}", status, text);
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("Failed to create {}", dest.display()))?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Failed to read content chunk")?;
            file.write_all(&chunk)
                .await
                .context("Failed to write audio to staging")?;
        }
        file.flush().await.context("Failed to flush audio file")?;

        debug!(message = %message_id, path = %dest.display(), "content downloaded");
        Ok(())
    }
}
