//! Voice-memo ingestion.
//!
//! Six stages, strictly in order: stage-directory creation, content
//! download, usability check, transcription, classification, persistence,
//! then the completion push. The run aborts on the first failure and the
//! caller owns the logging; an empty download is the one soft exit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::adapters::{Messaging, OutgoingText, SpeechToText};
use crate::core::classify::Classifier;
use crate::domain::{ClassifiedText, RecordDate};
use crate::store::RecordStore;

/// Trailer appended to every completion push.
pub const STORED_NOTICE: &str = "☁️已存入您的雲端空間.";

/// Downloads, transcribes, classifies, and stores one voice message.
pub struct IngestPipeline {
    messaging: Arc<dyn Messaging>,
    transcriber: Arc<dyn SpeechToText>,
    classifier: Classifier,
    store: Arc<dyn RecordStore>,
    staging_dir: PathBuf,
}

impl IngestPipeline {
    pub fn new(
        messaging: Arc<dyn Messaging>,
        transcriber: Arc<dyn SpeechToText>,
        classifier: Classifier,
        store: Arc<dyn RecordStore>,
        staging_dir: PathBuf,
    ) -> Self {
        Self {
            messaging,
            transcriber,
            classifier,
            store,
            staging_dir,
        }
    }

    /// Run the pipeline for one voice message. The record date is fixed
    /// here, so a run crossing midnight stays on the day it started.
    #[instrument(skip(self), fields(user = %user_id, message = %message_id))]
    pub async fn run(&self, user_id: &str, message_id: &str) -> Result<()> {
        let date = RecordDate::today();

        // Per-user, per-day staging partition. Creation is idempotent.
        let day_dir = self
            .staging_dir
            .join(format!("audio_{user_id}"))
            .join(date.as_str());
        tokio::fs::create_dir_all(&day_dir)
            .await
            .with_context(|| format!("Failed to create staging dir {}", day_dir.display()))?;

        let audio_path = day_dir.join(format!("{message_id}.m4a"));
        self.messaging
            .download_content(message_id, &audio_path)
            .await
            .context("Failed to download audio content")?;

        if !is_usable(&audio_path).await {
            info!("file stream is null.");
            return Ok(());
        }

        let transcript = self
            .transcriber
            .transcribe(&audio_path)
            .await
            .context("Failed to transcribe audio")?;
        info!(chars = transcript.chars().count(), "transcript ready");

        let completion = self
            .classifier
            .classify(&transcript)
            .await
            .context("Failed to classify transcript")?;

        let classified = ClassifiedText::parse(&completion);
        self.store
            .append(
                user_id,
                &date,
                classified.note.as_deref(),
                classified.todo.as_deref(),
            )
            .await
            .context("Failed to persist classified record")?;

        // The push carries the model's completion verbatim, tags included,
        // not the cleaned sections that were stored.
        let notice = format!("{completion}\r\n\r\n{STORED_NOTICE}");
        self.messaging
            .push(user_id, OutgoingText::new(notice))
            .await
            .context("Failed to push completion notice")?;

        info!(date = %date, "voice memo stored");
        Ok(())
    }
}

async fn is_usable(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len() > 0,
        Err(_) => false,
    }
}
