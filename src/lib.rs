//! noteflow - voice-memo chat bot backend
//!
//! A webhook service for a messaging-platform bot: voice messages are
//! transcribed, classified into notes and to-dos by a language model, and
//! filed per user and day in a remote table store. Text commands read the
//! stored rows back as day digests, in chat or as a mailed document.
//!
//! # Architecture
//!
//! Every webhook event is acknowledged synchronously; the slow work
//! (transcription, classification, mail delivery) runs on detached tasks
//! and reports back through push messages:
//! - Voice messages feed the ingest pipeline (download, transcribe,
//!   classify, store, push)
//! - `#memo`/`#todo` commands reply with day digests
//! - `#tofile` restyles a digest and mails it as a PDF
//!
//! # Modules
//!
//! - `adapters`: external service clients (messaging platform, OpenAI, SMTP)
//! - `store`: the remote table store (rows, profiles, table provisioning)
//! - `core`: routing and pipelines (router, ingest, digest, export)
//! - `domain`: data structures (events, records, classified text)
//! - `server`: the axum webhook surface
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Run the webhook server
//! noteflow serve
//!
//! # Inspect the resolved configuration
//! noteflow config
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod store;

// Re-export main types at crate root for convenience
pub use config::AppConfig;
pub use core::{Disposition, EventRouter, HandleError};
pub use domain::{ClassifiedText, InboundEvent, RecordDate, UserProfile, UserRecord, WebhookBatch};
pub use store::{RecordStore, StoreError, TableStoreClient};
