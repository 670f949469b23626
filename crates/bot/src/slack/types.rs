//! Slack Block Kit and Web API types.
//!
//! Two families live here. The builder types (`Block`, `Text`, ...) are the
//! subset of Block Kit the bot posts; they only serialize. The history types
//! (`HistoryMessage`, `RawBlock`, ...) are deliberately lenient
//! deserializers: the state reconstructor reads whole channels back,
//! including messages this bot never wrote, so every field is optional and
//! unknown block shapes must parse without error.
//!
//! See: <https://api.slack.com/block-kit>

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Outgoing Block Kit types
// =============================================================================

/// Block Kit block types the bot posts.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Section block with markdown or plain text.
    Section { text: Text },
    /// Context block with small muted text elements.
    Context { elements: Vec<ContextElement> },
    /// Actions block with interactive elements.
    Actions { elements: Vec<ActionElement> },
}

/// Text object types.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    /// Plain text (no formatting).
    PlainText { text: String, emoji: bool },
    /// Markdown text (supports formatting).
    Mrkdwn { text: String },
}

impl Text {
    /// Create a markdown text object.
    #[must_use]
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

/// Plain text object (for button labels).
#[derive(Debug, Clone, Serialize)]
pub struct PlainText {
    #[serde(rename = "type")]
    pub text_type: &'static str,
    pub text: String,
    pub emoji: bool,
}

impl PlainText {
    /// Create a new plain text object.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text_type: "plain_text",
            text: text.into(),
            emoji: true,
        }
    }
}

/// Context block elements.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextElement {
    /// Markdown text in context.
    Mrkdwn { text: String },
}

/// Action block elements.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionElement {
    /// Interactive button. `value` carries the opaque approval payload.
    Button {
        text: PlainText,
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
}

// =============================================================================
// History types (lenient deserializers)
// =============================================================================

/// One message as returned by `conversations.history` / `conversations.replies`.
///
/// The platform timestamp `ts` doubles as the message's identity and as a
/// wall-clock time source (seconds with a fractional part since the epoch).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryMessage {
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub blocks: Vec<RawBlock>,
}

/// A block read back from history. Only the fields the scans care about are
/// modeled; everything else is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBlock {
    #[serde(rename = "type", default)]
    pub block_type: String,
    #[serde(default)]
    pub text: Option<RawText>,
    #[serde(default)]
    pub elements: Vec<RawElement>,
}

/// Text of a block read back from history.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawText {
    #[serde(default)]
    pub text: String,
}

/// An interactive element read back from history. Context elements also
/// deserialize into this shape (with no `action_id`), which is fine - the
/// scans only look at action ids and values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawElement {
    #[serde(default)]
    pub action_id: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl HistoryMessage {
    /// Plain text plus every block's text, joined for keyword matching.
    #[must_use]
    pub fn searchable_text(&self) -> String {
        let mut combined = self.text.clone().unwrap_or_default();
        for block in &self.blocks {
            if let Some(text) = &block.text {
                combined.push('\n');
                combined.push_str(&text.text);
            }
        }
        combined
    }

    /// Whether any actions block carries an element with `action_id`.
    #[must_use]
    pub fn has_action(&self, action_id: &str) -> bool {
        self.action_element(action_id).is_some()
    }

    /// The `value` of the first element with `action_id`, if any.
    #[must_use]
    pub fn action_value(&self, action_id: &str) -> Option<&str> {
        self.action_element(action_id)?.value.as_deref()
    }

    fn action_element(&self, action_id: &str) -> Option<&RawElement> {
        self.blocks
            .iter()
            .filter(|block| block.block_type == "actions")
            .flat_map(|block| block.elements.iter())
            .find(|element| element.action_id.as_deref() == Some(action_id))
    }

    /// The message's send time derived from its platform timestamp.
    #[must_use]
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        slack_ts_to_datetime(&self.ts)
    }

    /// Whether the message was authored by a bot or carries a subtype.
    #[must_use]
    pub fn is_bot_authored(&self) -> bool {
        self.bot_id.is_some() || self.subtype.as_deref() == Some("bot_message")
    }
}

/// Parse a Slack `ts` value (`"1718000000.123456"`) into a UTC time.
#[must_use]
pub fn slack_ts_to_datetime(ts: &str) -> Option<DateTime<Utc>> {
    let seconds: f64 = ts.parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let millis = (seconds * 1000.0) as i64;
    DateTime::from_timestamp_millis(millis)
}

// =============================================================================
// Response types
// =============================================================================

/// Response from posting a message.
#[derive(Debug, Clone, Deserialize)]
pub struct PostMessageResponse {
    /// Whether the request was successful.
    pub ok: bool,
    /// Channel ID where message was posted.
    #[serde(default)]
    pub channel: Option<String>,
    /// Message timestamp (unique ID).
    #[serde(default)]
    pub ts: Option<String>,
    /// Error message if not ok.
    #[serde(default)]
    pub error: Option<String>,
}

/// Response from updating a message.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMessageResponse {
    /// Whether the request was successful.
    pub ok: bool,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response envelope for history and thread-reply fetches.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct HistoryResponse {
    pub ok: bool,
    #[serde(default)]
    pub messages: Vec<HistoryMessage>,
    #[serde(default)]
    pub response_metadata: ResponseMetadata,
    #[serde(default)]
    pub error: Option<String>,
}

/// Cursor envelope on paginated responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ResponseMetadata {
    #[serde(default)]
    pub next_cursor: String,
}

/// Response from `auth.test`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AuthTestResponse {
    pub ok: bool,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Minimal ok/error envelope for deletions, reactions and ephemerals.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AckResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

// =============================================================================
// Interaction payloads
// =============================================================================

/// Slack interaction payload from button clicks.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionPayload {
    /// Type of interaction.
    #[serde(rename = "type")]
    pub interaction_type: String,
    /// User who triggered the interaction.
    pub user: InteractionUser,
    /// Container information.
    pub container: InteractionContainer,
    /// Channel where interaction occurred.
    #[serde(default)]
    pub channel: Option<InteractionChannel>,
    /// The clicked message, when Slack includes it.
    #[serde(default)]
    pub message: Option<InteractionMessageRef>,
    /// Actions that were triggered.
    #[serde(default)]
    pub actions: Vec<InteractionAction>,
    /// Short-lived response URL, usable to replace the original message when
    /// `chat.update` fails.
    #[serde(default)]
    pub response_url: Option<String>,
}

impl InteractionPayload {
    /// The channel the click happened in.
    #[must_use]
    pub fn channel_id(&self) -> Option<&str> {
        self.container
            .channel_id
            .as_deref()
            .or_else(|| self.channel.as_ref().map(|channel| channel.id.as_str()))
    }

    /// The timestamp of the clicked message.
    #[must_use]
    pub fn message_ts(&self) -> Option<&str> {
        self.container
            .message_ts
            .as_deref()
            .or_else(|| self.message.as_ref().map(|message| message.ts.as_str()))
    }

    /// The root of the thread the clicked message belongs to. Falls back to
    /// the clicked message itself for a channel-level root.
    #[must_use]
    pub fn thread_root_ts(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|message| message.thread_ts.as_deref())
            .or_else(|| self.message_ts())
    }
}

/// User who triggered an interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionUser {
    /// Slack user ID.
    pub id: String,
    /// Username.
    #[serde(default)]
    pub username: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

impl InteractionUser {
    /// Best display name available for completion renderings.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or(&self.id)
    }
}

/// Container for the interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionContainer {
    /// Message timestamp.
    #[serde(default)]
    pub message_ts: Option<String>,
    /// Channel ID.
    #[serde(default)]
    pub channel_id: Option<String>,
}

/// Channel where interaction occurred.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionChannel {
    /// Channel ID.
    pub id: String,
}

/// Identity of the clicked message.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionMessageRef {
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
}

/// Action that was triggered.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionAction {
    /// Action ID (set when creating the button).
    pub action_id: String,
    /// Value attached to the action - the opaque approval payload.
    #[serde(default)]
    pub value: Option<String>,
}

/// A `message` event delivered via `event_callback`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
}

impl MessageEvent {
    /// Whether the event is a reply inside a thread (not the root itself).
    #[must_use]
    pub fn is_thread_reply(&self) -> bool {
        self.thread_ts
            .as_ref()
            .is_some_and(|thread_ts| thread_ts != &self.ts)
    }

    /// Whether the event was authored by a bot.
    #[must_use]
    pub fn is_bot_authored(&self) -> bool {
        self.bot_id.is_some() || self.subtype.as_deref() == Some("bot_message")
    }
}
