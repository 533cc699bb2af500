//! Events delivered over the shared channel, keyed by conversation id

use crate::types::{ConversationId, Usage};
use serde::{Deserialize, Serialize};

/// Event type a subscriber registers for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Started,
    Chunk,
    Complete,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Started,
        EventKind::Chunk,
        EventKind::Complete,
        EventKind::Error,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedPayload {
    pub conversation_id: ConversationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

/// Incremental delivery; `full_content` is cumulative, not a delta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkPayload {
    pub conversation_id: ConversationId,
    #[serde(default)]
    pub chunk: String,
    pub full_content: String,
    #[serde(default)]
    pub chunk_index: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePayload {
    pub conversation_id: ConversationId,
    pub full_response: String,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub conversation_id: ConversationId,
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl ErrorPayload {
    /// User-facing message with validation details appended
    pub fn message(&self) -> String {
        if self.validation_errors.is_empty() {
            self.error.clone()
        } else {
            format!("{}: {}", self.error, self.validation_errors.join("; "))
        }
    }
}

/// Inbound channel event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChannelEvent {
    Started(StartedPayload),
    Chunk(ChunkPayload),
    Complete(CompletePayload),
    Error(ErrorPayload),
}

impl ChannelEvent {
    pub fn from_json(frame: &str) -> serde_json::Result<Self> {
        serde_json::from_str(frame)
    }

    pub fn kind(&self) -> EventKind {
        match self {
            ChannelEvent::Started(_) => EventKind::Started,
            ChannelEvent::Chunk(_) => EventKind::Chunk,
            ChannelEvent::Complete(_) => EventKind::Complete,
            ChannelEvent::Error(_) => EventKind::Error,
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        match self {
            ChannelEvent::Started(p) => &p.conversation_id,
            ChannelEvent::Chunk(p) => &p.conversation_id,
            ChannelEvent::Complete(p) => &p.conversation_id,
            ChannelEvent::Error(p) => &p.conversation_id,
        }
    }

    pub fn tool_name(&self) -> Option<&str> {
        match self {
            ChannelEvent::Started(p) => p.tool_name.as_deref(),
            ChannelEvent::Chunk(p) => p.tool_name.as_deref(),
            ChannelEvent::Complete(p) => p.tool_name.as_deref(),
            ChannelEvent::Error(p) => p.tool_name.as_deref(),
        }
    }

    pub fn started(conversation_id: impl Into<ConversationId>, tool_name: &str) -> Self {
        ChannelEvent::Started(StartedPayload {
            conversation_id: conversation_id.into(),
            tool_name: Some(tool_name.to_string()),
        })
    }

    /// Main-analysis chunk. The delta is left empty; consumers read `full_content`.
    pub fn chunk(
        conversation_id: impl Into<ConversationId>,
        full_content: &str,
        chunk_index: u64,
        tool_name: Option<&str>,
    ) -> Self {
        ChannelEvent::Chunk(ChunkPayload {
            conversation_id: conversation_id.into(),
            chunk: String::new(),
            full_content: full_content.to_string(),
            chunk_index,
            tool_name: tool_name.map(str::to_string),
        })
    }

    pub fn complete(
        conversation_id: impl Into<ConversationId>,
        full_response: &str,
        message_id: &str,
        tool_name: Option<&str>,
    ) -> Self {
        ChannelEvent::Complete(CompletePayload {
            conversation_id: conversation_id.into(),
            full_response: full_response.to_string(),
            message_id: message_id.to_string(),
            usage: None,
            tool_name: tool_name.map(str::to_string),
        })
    }

    pub fn error(
        conversation_id: impl Into<ConversationId>,
        error: &str,
        tool_name: Option<&str>,
    ) -> Self {
        ChannelEvent::Error(ErrorPayload {
            conversation_id: conversation_id.into(),
            error: error.to_string(),
            validation_errors: Vec::new(),
            tool_name: tool_name.map(str::to_string),
        })
    }
}
