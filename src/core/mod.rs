//! Core pipeline logic.
//!
//! This module contains:
//! - Router: webhook event dispatch and the text-command grammar
//! - Ingest: the voice-memo pipeline (download through completion push)
//! - Classify: transcript classification prompts
//! - Digest: day-digest aggregation over stored rows
//! - Export: digest restyling and mail delivery
//! - Document: PDF/plain-text rendering of digests

pub mod classify;
pub mod digest;
pub mod document;
pub mod export;
pub mod ingest;
pub mod router;

// Re-export commonly used types
pub use classify::{Classifier, CLASSIFY_INSTRUCTION};
pub use digest::DigestAggregator;
pub use document::DocumentRenderer;
pub use export::{Exporter, RESTYLE_INSTRUCTION};
pub use ingest::{IngestPipeline, STORED_NOTICE};
pub use router::{Disposition, EventRouter, HandleError, VOICE_ACK};
