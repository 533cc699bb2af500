//! Core types, wire events and configuration for streaming analysis conversations

mod config;
mod error;
mod events;
mod types;

pub use config::Config;
pub use error::{Result, SessionError};
pub use events::{
    ChannelEvent, ChunkPayload, CompletePayload, ErrorPayload, EventKind, StartedPayload,
};
pub use types::{
    extract_structured, AnalysisTab, CharacterTools, ConversationId, EntryType, FinalResult,
    FollowUpMessage, HistoryEntry, Phase, Role, ToolDescriptor, Usage,
};
