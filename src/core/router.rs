//! Event routing and the text-command grammar.
//!
//! Every actionable event is acknowledged synchronously through its reply
//! token; slow work (audio ingestion, digest export) is spawned onto a
//! detached task and reports back over push messages. Failures inside a
//! detached task are logged under a job id and never reach the requester.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::adapters::{Messaging, OutgoingText};
use crate::core::digest::DigestAggregator;
use crate::core::export::Exporter;
use crate::core::ingest::IngestPipeline;
use crate::domain::{EventSource, Field, InboundEvent, IncomingMessage, RecordDate, UserProfile};
use crate::store::{RecordStore, StoreError};

/// Replied as soon as a voice message arrives, before any processing.
pub const VOICE_ACK: &str = "好的！已收到語言訊息，解析中...";

/// Replied when an export was scheduled.
const EXPORT_ACK: &str = "好的!處理中~ 完成後您將收到mail.";

/// Replied when an export needs a registered address first.
const EMAIL_MISSING_NOTICE: &str = "請先設定您的信箱, 例如 #set_mail=name@example.com";

/// Replied when `#set_mail` carries a malformed address.
const EMAIL_FORMAT_NOTICE: &str = "請提供正確的email格式, 例如 #set_mail=name@example.com";

/// How one event was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// The event got a synchronous reply (work may still be running).
    Replied,
    /// The event needed nothing from us.
    Ignored,
}

/// Failure handling a single event. One failing event does not speak for
/// its batch; the server layer decides what a failed batch returns.
#[derive(Debug, Error)]
pub enum HandleError {
    #[error("unrecognized message kind: {0}")]
    UnrecognizedMessageKind(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

/// What a text message asks for. Anything that is not a recognized command
/// or a bare mail address reads as a greeting.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    SetEmail(&'a str),
    ConfirmEmail(&'a str),
    ExportFile(&'a str),
    ShowNotes(&'a str),
    ShowTodos(&'a str),
    Greeting,
}

fn parse_command(text: &str) -> Command<'_> {
    if let Some(address) = text.strip_prefix("#set_mail=") {
        return Command::SetEmail(address.trim());
    }
    let trimmed = text.trim();
    if looks_like_email(trimmed) {
        return Command::ConfirmEmail(trimmed);
    }
    if let Some(date) = text.strip_prefix("#tofile") {
        return Command::ExportFile(date);
    }
    if let Some(date) = text.strip_prefix("#logf") {
        return Command::ExportFile(date);
    }
    if let Some(date) = text.strip_prefix("#memo") {
        return Command::ShowNotes(date);
    }
    if let Some(date) = text.strip_prefix("#todo") {
        return Command::ShowTodos(date);
    }
    Command::Greeting
}

/// Loose shape check, not RFC validation: one `@`, a non-empty local part,
/// a dot somewhere inside the domain, no whitespace.
fn looks_like_email(text: &str) -> bool {
    if text.is_empty() || text.contains(char::is_whitespace) {
        return false;
    }
    match text.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Dispatches webhook events to the pipelines.
pub struct EventRouter {
    messaging: Arc<dyn Messaging>,
    store: Arc<dyn RecordStore>,
    ingest: Arc<IngestPipeline>,
    digests: DigestAggregator,
    exporter: Arc<Exporter>,
    bot_name: String,
}

impl EventRouter {
    pub fn new(
        messaging: Arc<dyn Messaging>,
        store: Arc<dyn RecordStore>,
        ingest: Arc<IngestPipeline>,
        digests: DigestAggregator,
        exporter: Arc<Exporter>,
        bot_name: String,
    ) -> Self {
        Self {
            messaging,
            store,
            ingest,
            digests,
            exporter,
            bot_name,
        }
    }

    /// Handle one event from a webhook batch.
    pub async fn handle(&self, event: InboundEvent) -> Result<Disposition, HandleError> {
        match event {
            InboundEvent::Message {
                reply_token,
                source,
                message,
            } => match message.kind.as_str() {
                "text" => {
                    let text = message.text.as_deref().unwrap_or_default();
                    self.handle_text(&reply_token, &source, text).await
                }
                "audio" => self.handle_audio(&reply_token, &source, &message).await,
                other => Err(HandleError::UnrecognizedMessageKind(other.to_string())),
            },
            InboundEvent::Join {
                reply_token,
                source,
            } => {
                let notice = OutgoingText::new(format!("Joined {}", source.kind));
                self.reply_one(&reply_token, notice).await
            }
            InboundEvent::Other => Ok(Disposition::Ignored),
        }
    }

    async fn handle_text(
        &self,
        reply_token: &str,
        source: &EventSource,
        text: &str,
    ) -> Result<Disposition, HandleError> {
        let Some(user_id) = source.user_id.as_deref() else {
            // Group chatter without a disclosed sender has no partition.
            return Ok(Disposition::Ignored);
        };

        match parse_command(text) {
            Command::SetEmail(address) => {
                if looks_like_email(address) {
                    self.register_email(reply_token, user_id, address).await
                } else {
                    self.reply_one(reply_token, OutgoingText::new(EMAIL_FORMAT_NOTICE))
                        .await
                }
            }
            Command::ConfirmEmail(address) => {
                self.register_email(reply_token, user_id, address).await
            }
            Command::ExportFile(date) => self.schedule_export(reply_token, user_id, date).await,
            Command::ShowNotes(date) => {
                self.reply_digest(reply_token, user_id, date, Field::Note)
                    .await
            }
            Command::ShowTodos(date) => {
                self.reply_digest(reply_token, user_id, date, Field::Todo)
                    .await
            }
            Command::Greeting => self.greet(reply_token, user_id).await,
        }
    }

    async fn handle_audio(
        &self,
        reply_token: &str,
        source: &EventSource,
        message: &IncomingMessage,
    ) -> Result<Disposition, HandleError> {
        let Some(user_id) = source.user_id.as_deref() else {
            return Ok(Disposition::Ignored);
        };

        let platform_hosted = message
            .content_provider
            .as_ref()
            .map(|provider| provider.is_platform_hosted())
            .unwrap_or(false);
        if platform_hosted {
            let pipeline = self.ingest.clone();
            let job = Uuid::new_v4();
            let user = user_id.to_string();
            let message_id = message.id.clone();
            info!(%job, user = %user, message = %message_id, "audio ingestion started");
            tokio::spawn(async move {
                if let Err(error) = pipeline.run(&user, &message_id).await {
                    let chain = format!("{error:#}");
                    error!(%job, user = %user, error = %chain, "audio ingestion failed");
                }
            });
        }

        // Externally hosted audio cannot be fetched from the content API,
        // but the sender still hears back.
        self.reply_one(reply_token, OutgoingText::new(VOICE_ACK))
            .await
    }

    async fn register_email(
        &self,
        reply_token: &str,
        user_id: &str,
        address: &str,
    ) -> Result<Disposition, HandleError> {
        self.store
            .upsert_profile(&UserProfile::new(user_id, address))
            .await?;
        info!(user = %user_id, "mail address registered");
        let notice = format!("好的😊\r\n已記錄您的信箱 {address}.");
        self.reply_one(reply_token, OutgoingText::new(notice)).await
    }

    /// Digest for a user-typed date suffix. A malformed date reads as a
    /// date with no rows and never reaches the store.
    async fn field_digest(
        &self,
        user_id: &str,
        date: &str,
        field: Field,
    ) -> Result<String, StoreError> {
        match RecordDate::new(date) {
            Some(date) => self.digests.digest(user_id, &date, field).await,
            None => Ok(String::new()),
        }
    }

    async fn reply_digest(
        &self,
        reply_token: &str,
        user_id: &str,
        date: &str,
        field: Field,
    ) -> Result<Disposition, HandleError> {
        let digest = self.field_digest(user_id, date, field).await?;
        self.reply_one(reply_token, OutgoingText::new(digest)).await
    }

    async fn schedule_export(
        &self,
        reply_token: &str,
        user_id: &str,
        date: &str,
    ) -> Result<Disposition, HandleError> {
        let digest = self.field_digest(user_id, date, Field::Note).await?;

        let Some(profile) = self.store.profile(user_id).await? else {
            return self
                .reply_one(reply_token, OutgoingText::new(EMAIL_MISSING_NOTICE))
                .await;
        };

        let exporter = self.exporter.clone();
        let job = Uuid::new_v4();
        let subject = format!("日誌 {date}");
        let user = user_id.to_string();
        info!(%job, user = %user, subject = %subject, "export scheduled");
        tokio::spawn(async move {
            if let Err(error) = exporter
                .export(&user, &profile.email, &subject, &digest)
                .await
            {
                let chain = format!("{error:#}");
                error!(%job, user = %user, error = %chain, "export failed");
            }
        });

        self.reply_one(reply_token, OutgoingText::new(EXPORT_ACK))
            .await
    }

    /// Free-text fallback: provision the user's partition, then reply with
    /// the greeting and digest shortcuts for today and yesterday.
    async fn greet(&self, reply_token: &str, user_id: &str) -> Result<Disposition, HandleError> {
        self.store.ensure_partition(user_id).await?;

        let today = RecordDate::today();
        let yesterday = RecordDate::yesterday();
        let greeting = format!(
            "Hi 讓您久等了！ 我是 {} ，樂於為您效勞！ \r\n\r\n如果您需要查看歷史記錄, 可以輸入以下關鍵字 \r\n #memo{today} \r\n #todo{today}",
            self.bot_name
        );
        let message = OutgoingText::new(greeting)
            .with_shortcut("昨日記事", &format!("#memo{yesterday}"))
            .with_shortcut("今日記事", &format!("#memo{today}"))
            .with_shortcut("昨日待辦", &format!("#todo{yesterday}"))
            .with_shortcut("今日待辦", &format!("#todo{today}"));
        self.reply_one(reply_token, message).await
    }

    async fn reply_one(
        &self,
        reply_token: &str,
        message: OutgoingText,
    ) -> Result<Disposition, HandleError> {
        self.messaging.reply(reply_token, vec![message]).await?;
        Ok(Disposition::Replied)
    }
}
