//! Adapter interfaces for external collaborators.
//!
//! Every remote service the bot talks to (messaging platform, language
//! model, speech-to-text, SMTP) sits behind one of these traits so the
//! core can be exercised against in-memory fakes.

pub mod mail;
pub mod messaging;
pub mod openai;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

// Re-export the concrete clients
pub use mail::SmtpMailer;
pub use messaging::MessagingClient;
pub use openai::OpenAiClient;

/// An outbound text message, shaped for the platform wire format.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingText {
    #[serde(rename = "type")]
    kind: &'static str,

    text: String,

    #[serde(rename = "quickReply", skip_serializing_if = "Option::is_none")]
    quick_reply: Option<QuickReply>,
}

#[derive(Debug, Clone, Serialize)]
struct QuickReply {
    items: Vec<QuickReplyItem>,
}

#[derive(Debug, Clone, Serialize)]
struct QuickReplyItem {
    #[serde(rename = "type")]
    kind: &'static str,

    action: MessageAction,
}

#[derive(Debug, Clone, Serialize)]
struct MessageAction {
    #[serde(rename = "type")]
    kind: &'static str,

    label: String,

    text: String,
}

impl OutgoingText {
    /// Create a plain text message
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            kind: "text",
            text: text.into(),
            quick_reply: None,
        }
    }

    /// Attach a quick-reply shortcut that sends `text` when tapped
    pub fn with_shortcut(mut self, label: &str, text: &str) -> Self {
        let item = QuickReplyItem {
            kind: "action",
            action: MessageAction {
                kind: "message",
                label: label.to_string(),
                text: text.to_string(),
            },
        };
        self.quick_reply
            .get_or_insert_with(|| QuickReply { items: Vec::new() })
            .items
            .push(item);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Labels of the attached shortcuts, in order
    pub fn shortcut_labels(&self) -> Vec<&str> {
        self.quick_reply
            .as_ref()
            .map(|q| q.items.iter().map(|i| i.action.label.as_str()).collect())
            .unwrap_or_default()
    }
}

/// A file attached to an outbound mail.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Messaging platform: replies, pushes, and content downloads.
#[async_trait]
pub trait Messaging: Send + Sync {
    /// Reply to a reply token with ordered messages. The token is single-use.
    async fn reply(&self, reply_token: &str, messages: Vec<OutgoingText>) -> Result<()>;

    /// Push a message to a user outside any reply window
    async fn push(&self, user_id: &str, message: OutgoingText) -> Result<()>;

    /// Download a media message's bytes into `dest`
    async fn download_content(&self, message_id: &str, dest: &Path) -> Result<()>;
}

/// Chat-completion collaborator
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send one system + one user message, return the top completion's text
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Speech-to-text collaborator
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe an audio file to text
    async fn transcribe(&self, audio_path: &Path) -> Result<String>;
}

/// Mail transport collaborator
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Send a mail with one attachment
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachment: Attachment,
    ) -> Result<()>;
}
