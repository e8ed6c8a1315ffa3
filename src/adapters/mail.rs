//! SMTP mail transport.
//!
//! Sends digest exports as mails with one attachment over a STARTTLS relay.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MimePart, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::adapters::{Attachment, MailTransport};
use crate::config::MailConfig;

/// Async SMTP mailer
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Create a mailer from the SMTP configuration
    pub fn new(config: &MailConfig) -> Result<Self> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .with_context(|| format!("Invalid SMTP relay {}", config.smtp_host))?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        let from = config
            .from
            .parse()
            .with_context(|| format!("Invalid sender address {}", config.from))?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachment: Attachment,
    ) -> Result<()> {
        let recipient: Mailbox = to
            .parse()
            .with_context(|| format!("Invalid recipient address {}", to))?;

        let content_type = ContentType::parse(&attachment.content_type)
            .with_context(|| format!("Invalid attachment type {}", attachment.content_type))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .multipart(
                MultiPart::mixed()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        MimePart::new(attachment.file_name).body(attachment.bytes, content_type),
                    ),
            )
            .context("Failed to build mail")?;

        self.transport
            .send(message)
            .await
            .context("Failed to send mail")?;

        debug!(to = %to, subject = %subject, "mail sent");
        Ok(())
    }
}
