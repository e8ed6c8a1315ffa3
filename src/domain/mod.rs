//! Domain types for the noteflow bot.
//!
//! This module contains the core data structures:
//! - Events: inbound webhook payloads from the messaging platform
//! - Records: per-user, per-day stored rows and profiles
//! - Classified text: the parsed note/to-do output of the classifier

pub mod classified;
pub mod event;
pub mod record;

// Re-export commonly used types
pub use classified::{ClassifiedText, NOTE_TAG, NO_DATA, TODO_TAG};
pub use event::{ContentProvider, EventSource, InboundEvent, IncomingMessage, WebhookBatch};
pub use record::{Field, RecordDate, UserProfile, UserRecord};
