//! Remote procedures the orchestrator depends on

use parley_core::{CharacterTools, Config, ConversationId, ToolDescriptor};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};

/// Result of a start-analysis call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedAnalysis {
    pub conversation_id: ConversationId,
}

/// Backend that performs the analysis.
///
/// Results are delivered asynchronously over the event channel. Implementations
/// must not publish events for a conversation before the start call returns,
/// since the orchestrator subscribes only once it knows the id.
pub trait AnalysisBackend {
    fn start_analysis_from_draft(
        &self,
        character_id: &str,
        panel_id: &str,
        draft_text: &str,
    ) -> anyhow::Result<StartedAnalysis>;

    fn start_analysis_from_strategy(
        &self,
        character_id: &str,
        panel_id: &str,
        topic: &str,
        goal: &str,
        audience: &str,
    ) -> anyhow::Result<StartedAnalysis>;

    fn send_follow_up(&self, conversation_id: &ConversationId, message: &str)
        -> anyhow::Result<()>;

    fn get_character_tools(&self, character_id: &str) -> anyhow::Result<CharacterTools>;
}

/// A call received by [`ScriptedBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    StartDraft {
        character_id: String,
        panel_id: String,
        draft_text: String,
    },
    StartStrategy {
        character_id: String,
        panel_id: String,
        topic: String,
        goal: String,
        audience: String,
    },
    FollowUp {
        conversation_id: ConversationId,
        message: String,
    },
    Tools {
        character_id: String,
    },
}

/// In-memory backend that hands out sequential conversation ids
/// (`c1`, `c2`, ...) and records every call. Events are published by the
/// caller, which makes replays and tests deterministic.
#[derive(Debug)]
pub struct ScriptedBackend {
    next_id: Cell<u64>,
    tools: RefCell<Option<CharacterTools>>,
    start_failure: RefCell<Option<String>>,
    follow_up_failure: RefCell<Option<String>>,
    calls: RefCell<Vec<BackendCall>>,
}

impl ScriptedBackend {
    /// Backend whose personas have both default analysis tools enabled
    pub fn new() -> Self {
        let config = Config::default();
        let tools = CharacterTools {
            available_tools: vec![
                ToolDescriptor {
                    name: config.draft_tool,
                    is_enabled: true,
                },
                ToolDescriptor {
                    name: config.strategy_tool,
                    is_enabled: true,
                },
            ],
        };
        Self::with_tools(Some(tools))
    }

    /// `None` makes capability lookups fail
    pub fn with_tools(tools: Option<CharacterTools>) -> Self {
        Self {
            next_id: Cell::new(1),
            tools: RefCell::new(tools),
            start_failure: RefCell::new(None),
            follow_up_failure: RefCell::new(None),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn set_tools(&self, tools: Option<CharacterTools>) {
        *self.tools.borrow_mut() = tools;
    }

    /// Make the next start call fail with `message`
    pub fn fail_next_start(&self, message: &str) {
        *self.start_failure.borrow_mut() = Some(message.to_string());
    }

    /// Make the next follow-up call fail with `message`
    pub fn fail_next_follow_up(&self, message: &str) {
        *self.follow_up_failure.borrow_mut() = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.borrow().clone()
    }

    /// Number of start calls received so far
    pub fn start_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, BackendCall::StartDraft { .. } | BackendCall::StartStrategy { .. }))
            .count()
    }

    fn issue(&self, call: BackendCall) -> anyhow::Result<StartedAnalysis> {
        self.calls.borrow_mut().push(call);
        if let Some(message) = self.start_failure.borrow_mut().take() {
            anyhow::bail!(message);
        }

        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Ok(StartedAnalysis {
            conversation_id: ConversationId::new(format!("c{id}")),
        })
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisBackend for ScriptedBackend {
    fn start_analysis_from_draft(
        &self,
        character_id: &str,
        panel_id: &str,
        draft_text: &str,
    ) -> anyhow::Result<StartedAnalysis> {
        self.issue(BackendCall::StartDraft {
            character_id: character_id.to_string(),
            panel_id: panel_id.to_string(),
            draft_text: draft_text.to_string(),
        })
    }

    fn start_analysis_from_strategy(
        &self,
        character_id: &str,
        panel_id: &str,
        topic: &str,
        goal: &str,
        audience: &str,
    ) -> anyhow::Result<StartedAnalysis> {
        self.issue(BackendCall::StartStrategy {
            character_id: character_id.to_string(),
            panel_id: panel_id.to_string(),
            topic: topic.to_string(),
            goal: goal.to_string(),
            audience: audience.to_string(),
        })
    }

    fn send_follow_up(
        &self,
        conversation_id: &ConversationId,
        message: &str,
    ) -> anyhow::Result<()> {
        self.calls.borrow_mut().push(BackendCall::FollowUp {
            conversation_id: conversation_id.clone(),
            message: message.to_string(),
        });
        if let Some(failure) = self.follow_up_failure.borrow_mut().take() {
            anyhow::bail!(failure);
        }
        Ok(())
    }

    fn get_character_tools(&self, character_id: &str) -> anyhow::Result<CharacterTools> {
        self.calls.borrow_mut().push(BackendCall::Tools {
            character_id: character_id.to_string(),
        });
        self.tools
            .borrow()
            .clone()
            .ok_or_else(|| anyhow::anyhow!("capability lookup unavailable for {character_id}"))
    }
}
