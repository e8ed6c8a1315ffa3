//! Inbound webhook event model.
//!
//! The messaging platform delivers events in batches. Only message and join
//! events are acted on; any other event type lands in the catch-all variant
//! and is ignored rather than rejected.

use serde::Deserialize;

/// One webhook delivery: a batch of events for a single bot destination.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookBatch {
    /// Bot user id the batch was addressed to
    #[serde(default)]
    pub destination: Option<String>,

    /// Events in platform order
    pub events: Vec<InboundEvent>,
}

/// A single platform event, tagged by its `type` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InboundEvent {
    /// A user sent a message (text, audio, or something we do not handle)
    #[serde(rename_all = "camelCase")]
    Message {
        reply_token: String,
        source: EventSource,
        message: IncomingMessage,
    },

    /// The bot was added to a group or room
    #[serde(rename_all = "camelCase")]
    Join {
        reply_token: String,
        source: EventSource,
    },

    /// Any event type we do not recognize (follow, leave, postback, ...)
    #[serde(other)]
    Other,
}

/// Where an event came from: a user chat, a group, or a room.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    /// Source kind: `user`, `group`, or `room`
    #[serde(rename = "type")]
    pub kind: String,

    /// Sending user, when the platform discloses it
    #[serde(default)]
    pub user_id: Option<String>,

    #[serde(default)]
    pub group_id: Option<String>,

    #[serde(default)]
    pub room_id: Option<String>,
}

/// The message payload of a message event.
///
/// The kind is kept as a plain string so unrecognized kinds (sticker, image,
/// video, location, ...) survive deserialization and can be reported by name.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    pub id: String,

    /// Message kind: `text`, `audio`, or anything else the platform sends
    #[serde(rename = "type")]
    pub kind: String,

    /// Present for text messages
    #[serde(default)]
    pub text: Option<String>,

    /// Present for media messages
    #[serde(default)]
    pub content_provider: Option<ContentProvider>,
}

/// Where the bytes of a media message live.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentProvider {
    /// `line` when the platform hosts the content, `external` otherwise
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub original_content_url: Option<String>,
}

impl ContentProvider {
    /// True when the content must be fetched from the platform's content API.
    pub fn is_platform_hosted(&self) -> bool {
        self.kind == "line"
    }
}
