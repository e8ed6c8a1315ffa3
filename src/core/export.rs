//! Digest export.
//!
//! Restyles a digest through the language model, renders it into an
//! attachment, and mails it. Runs detached from the requesting event; the
//! requester was already acknowledged, so mail failure is logged and never
//! surfaced back to chat.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, instrument, warn};

use crate::adapters::{Attachment, LanguageModel, MailTransport, Messaging, OutgoingText};
use crate::core::document::DocumentRenderer;

/// System instruction for the news-release restyle call.
pub const RESTYLE_INSTRUCTION: &str = "將我給你的文字使用新聞稿方式重新排版";

/// Body text accompanying every exported mail.
const MAIL_BODY: &str = "請參考附件";

/// Pushed to the user once the transport accepts the mail.
const MAIL_SENT_NOTICE: &str = "哈囉😊\r\n日誌已發送到您的信箱.";

/// Restyles, renders, and mails digests.
pub struct Exporter {
    model: Arc<dyn LanguageModel>,
    mailer: Arc<dyn MailTransport>,
    messaging: Arc<dyn Messaging>,
    renderer: DocumentRenderer,
}

impl Exporter {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        mailer: Arc<dyn MailTransport>,
        messaging: Arc<dyn Messaging>,
        renderer: DocumentRenderer,
    ) -> Self {
        Self {
            model,
            mailer,
            messaging,
            renderer,
        }
    }

    /// Export one digest to one address.
    ///
    /// Restyle and render failures abort the export and propagate to the
    /// caller. A transport refusal is final: it is logged here and the
    /// export still counts as finished.
    #[instrument(skip(self, email, digest), fields(user = %user_id, subject = %subject))]
    pub async fn export(
        &self,
        user_id: &str,
        email: &str,
        subject: &str,
        digest: &str,
    ) -> Result<()> {
        let styled = self
            .model
            .complete(RESTYLE_INSTRUCTION, &user_prompt(digest))
            .await
            .context("Failed to restyle digest")?;

        let attachment = self
            .renderer
            .render(subject, &styled)
            .context("Failed to render digest document")?;

        self.dispatch(user_id, email, subject, attachment).await;
        Ok(())
    }

    async fn dispatch(&self, user_id: &str, email: &str, subject: &str, attachment: Attachment) {
        match self.mailer.send(email, subject, MAIL_BODY, attachment).await {
            Ok(()) => {
                info!("digest mailed");
                if let Err(error) = self
                    .messaging
                    .push(user_id, OutgoingText::new(MAIL_SENT_NOTICE))
                    .await
                {
                    warn!(error = %error, "mail notice push failed");
                }
            }
            Err(error) => {
                let chain = format!("{error:#}");
                error!(error = %chain, "digest mail failed");
            }
        }
    }
}

fn user_prompt(digest: &str) -> String {
    format!("文字:\r\n{digest}")
}
