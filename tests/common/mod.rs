//! Shared test doubles for the integration tests.
//!
//! Every external collaborator gets an in-memory fake that records what it
//! was asked to do; failure switches let individual tests break one
//! collaborator at a time.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;

use noteflow::adapters::{
    Attachment, LanguageModel, MailTransport, Messaging, OutgoingText, SpeechToText,
};
use noteflow::core::{
    Classifier, DigestAggregator, DocumentRenderer, EventRouter, Exporter, IngestPipeline,
};
use noteflow::domain::{InboundEvent, RecordDate, UserProfile, UserRecord};
use noteflow::store::{RecordStore, StoreError};

/// Captures replies and pushes; serves canned bytes for content downloads.
pub struct RecordingMessenger {
    pub replies: Mutex<Vec<(String, Vec<OutgoingText>)>>,
    pub pushes: Mutex<Vec<(String, OutgoingText)>>,
    content: Mutex<Vec<u8>>,
    pub fail_download: AtomicBool,
    pub fail_push: AtomicBool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(Vec::new()),
            pushes: Mutex::new(Vec::new()),
            content: Mutex::new(b"voice-bytes".to_vec()),
            fail_download: AtomicBool::new(false),
            fail_push: AtomicBool::new(false),
        }
    }

    /// Bytes the next download writes (empty means an empty file).
    pub fn set_content(&self, bytes: &[u8]) {
        *self.content.lock().unwrap() = bytes.to_vec();
    }

    pub fn reply_texts(&self) -> Vec<String> {
        self.replies
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(_, messages)| messages.iter().map(|m| m.text().to_string()))
            .collect()
    }

    pub fn push_texts(&self) -> Vec<String> {
        self.pushes
            .lock()
            .unwrap()
            .iter()
            .map(|(_, message)| message.text().to_string())
            .collect()
    }
}

#[async_trait]
impl Messaging for RecordingMessenger {
    async fn reply(&self, reply_token: &str, messages: Vec<OutgoingText>) -> Result<()> {
        self.replies
            .lock()
            .unwrap()
            .push((reply_token.to_string(), messages));
        Ok(())
    }

    async fn push(&self, user_id: &str, message: OutgoingText) -> Result<()> {
        if self.fail_push.load(Ordering::SeqCst) {
            return Err(anyhow!("push rejected"));
        }
        self.pushes
            .lock()
            .unwrap()
            .push((user_id.to_string(), message));
        Ok(())
    }

    async fn download_content(&self, message_id: &str, dest: &Path) -> Result<()> {
        if self.fail_download.load(Ordering::SeqCst) {
            return Err(anyhow!("content not found: {message_id}"));
        }
        let bytes = self.content.lock().unwrap().clone();
        tokio::fs::write(dest, bytes).await?;
        Ok(())
    }
}

/// In-memory record store.
pub struct MemoryStore {
    pub rows: Mutex<Vec<UserRecord>>,
    pub profiles: Mutex<HashMap<String, String>>,
    pub partitions: Mutex<Vec<String>>,
    pub fail_reads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            profiles: Mutex::new(HashMap::new()),
            partitions: Mutex::new(Vec::new()),
            fail_reads: AtomicBool::new(false),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn ensure_partition(&self, user_id: &str) -> Result<(), StoreError> {
        let mut partitions = self.partitions.lock().unwrap();
        if !partitions.iter().any(|p| p == user_id) {
            partitions.push(user_id.to_string());
        }
        Ok(())
    }

    async fn append(
        &self,
        user_id: &str,
        date: &RecordDate,
        note: Option<&str>,
        todo: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut record = UserRecord::new(user_id, date.as_str());
        record.note = note.map(str::to_string);
        record.todo = todo.map(str::to_string);
        self.rows.lock().unwrap().push(record);
        Ok(())
    }

    async fn records_for_date(
        &self,
        user_id: &str,
        date: &RecordDate,
    ) -> Result<Vec<UserRecord>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Api {
                operation: "list records",
                kind: "UNAVAILABLE".to_string(),
                message: "store offline".to_string(),
            });
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.user_id == user_id && row.record_date == date.as_str())
            .cloned()
            .collect())
    }

    async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .get(user_id)
            .map(|email| UserProfile::new(user_id, email)))
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.user_id.clone(), profile.email.clone());
        Ok(())
    }
}

/// Returns a canned completion and records every prompt pair.
pub struct ScriptedModel {
    completion: Mutex<String>,
    pub calls: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
}

impl ScriptedModel {
    pub fn new(completion: &str) -> Self {
        Self {
            completion: Mutex::new(completion.to_string()),
            calls: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn set_completion(&self, completion: &str) {
        *self.completion.lock().unwrap() = completion.to_string();
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("model unavailable"));
        }
        self.calls
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));
        Ok(self.completion.lock().unwrap().clone())
    }
}

/// Returns a fixed transcript and records the paths it was handed.
pub struct FixedTranscriber {
    transcript: String,
    pub seen_paths: Mutex<Vec<PathBuf>>,
    pub fail: AtomicBool,
}

impl FixedTranscriber {
    pub fn new(transcript: &str) -> Self {
        Self {
            transcript: transcript.to_string(),
            seen_paths: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl SpeechToText for FixedTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("transcription unavailable"));
        }
        self.seen_paths
            .lock()
            .unwrap()
            .push(audio_path.to_path_buf());
        Ok(self.transcript.clone())
    }
}

/// One captured outbound mail.
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Attachment,
}

/// Records sent mail; optionally refuses every send.
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentMail>>,
    pub fail: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachment: Attachment,
    ) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("relay refused the message"));
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            attachment,
        });
        Ok(())
    }
}

/// A fully wired router plus handles into every fake.
pub struct Harness {
    pub router: EventRouter,
    pub messenger: Arc<RecordingMessenger>,
    pub store: Arc<MemoryStore>,
    pub model: Arc<ScriptedModel>,
    pub transcriber: Arc<FixedTranscriber>,
    pub mailer: Arc<RecordingMailer>,
    pub staging: TempDir,
}

pub fn harness(completion: &str, transcript: &str) -> Harness {
    let messenger = Arc::new(RecordingMessenger::new());
    let store = Arc::new(MemoryStore::new());
    let model = Arc::new(ScriptedModel::new(completion));
    let transcriber = Arc::new(FixedTranscriber::new(transcript));
    let mailer = Arc::new(RecordingMailer::new());
    let staging = TempDir::new().unwrap();

    let classifier = Classifier::new(model.clone());
    let ingest = Arc::new(IngestPipeline::new(
        messenger.clone(),
        transcriber.clone(),
        classifier,
        store.clone(),
        staging.path().to_path_buf(),
    ));
    let digests = DigestAggregator::new(store.clone());
    let renderer = DocumentRenderer::new(None).unwrap();
    let exporter = Arc::new(Exporter::new(
        model.clone(),
        mailer.clone(),
        messenger.clone(),
        renderer,
    ));

    let router = EventRouter::new(
        messenger.clone(),
        store.clone(),
        ingest,
        digests,
        exporter,
        "測試助理".to_string(),
    );

    Harness {
        router,
        messenger,
        store,
        model,
        transcriber,
        mailer,
        staging,
    }
}

/// Webhook-shaped text message event.
pub fn text_event(reply_token: &str, user_id: &str, text: &str) -> InboundEvent {
    serde_json::from_value(json!({
        "type": "message",
        "replyToken": reply_token,
        "source": { "type": "user", "userId": user_id },
        "message": { "id": "m-text", "type": "text", "text": text }
    }))
    .unwrap()
}

/// Webhook-shaped audio message event.
pub fn audio_event(reply_token: &str, user_id: &str, message_id: &str, provider: &str) -> InboundEvent {
    serde_json::from_value(json!({
        "type": "message",
        "replyToken": reply_token,
        "source": { "type": "user", "userId": user_id },
        "message": {
            "id": message_id,
            "type": "audio",
            "duration": 12000,
            "contentProvider": { "type": provider }
        }
    }))
    .unwrap()
}

/// Poll until `check` passes; panics if two seconds go by first. Detached
/// pipeline work has no completion handle, so tests watch for its side
/// effects instead.
pub async fn wait_until(check: impl Fn() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within deadline");
}
