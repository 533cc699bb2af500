//! Core types for analysis conversations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque conversation identifier, assigned by the backend when an analysis starts
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Conversation lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    /// Remote start issued, waiting for the `started` event
    Starting,
    /// Receiving cumulative chunks of the main analysis
    Streaming,
    Complete,
    Error,
    /// A follow-up reply is streaming; the finalized result is untouched
    FollowUpStreaming,
}

impl Phase {
    /// Main analysis requested but not yet finalized
    pub fn is_in_flight(self) -> bool {
        matches!(self, Phase::Starting | Phase::Streaming)
    }
}

/// Which UI tab owns the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisTab {
    #[default]
    Draft,
    Strategy,
}

/// Token accounting reported with a completed response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(default, alias = "input_tokens")]
    pub input_tokens: u64,
    #[serde(default, alias = "output_tokens")]
    pub output_tokens: u64,
}

impl Usage {
    pub fn total(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// Finalized analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalResult {
    pub raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<serde_json::Value>,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl FinalResult {
    pub fn new(raw: impl Into<String>, message_id: impl Into<String>, usage: Option<Usage>) -> Self {
        let raw = raw.into();
        let structured = extract_structured(&raw);
        Self {
            raw,
            structured,
            message_id: message_id.into(),
            usage,
        }
    }
}

/// Parse the structured payload out of a raw response.
///
/// Accepts a bare JSON object/array or one wrapped in a ```` ```json ```` fence.
/// Plain prose yields `None`.
pub fn extract_structured(raw: &str) -> Option<serde_json::Value> {
    let trimmed = raw.trim();
    let body = match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```")?.trim()
        }
        None => trimmed,
    };

    if !(body.starts_with('{') || body.starts_with('[')) {
        return None;
    }
    serde_json::from_str(body).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Analysis,
    Followup,
}

/// A message in the follow-up thread of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Archived record in the history ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub role: Role,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn from_result(result: &FinalResult, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: Role::Assistant,
            entry_type: EntryType::Analysis,
            content: result.raw.clone(),
            structured: result.structured.clone(),
            message_id: Some(result.message_id.clone()),
            usage: result.usage,
            timestamp,
        }
    }

    pub fn from_follow_up(message: &FollowUpMessage) -> Self {
        Self {
            role: message.role,
            entry_type: EntryType::Followup,
            content: message.content.clone(),
            structured: None,
            message_id: message.message_id.clone(),
            usage: message.usage,
            timestamp: message.timestamp,
        }
    }
}

/// A named backend ability and whether it is enabled for a persona
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub is_enabled: bool,
}

/// Capability descriptor returned by `getCharacterTools`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharacterTools {
    #[serde(default)]
    pub available_tools: Vec<ToolDescriptor>,
}

impl CharacterTools {
    pub fn find(&self, name: &str) -> Option<&ToolDescriptor> {
        self.available_tools.iter().find(|t| t.name == name)
    }
}
