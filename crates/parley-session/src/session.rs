//! State of one logical conversation

use chrono::{DateTime, Duration, Utc};
use parley_core::{
    CompletePayload, ConversationId, FinalResult, FollowUpMessage, Phase, Role, SessionError,
};
use serde::Serialize;

/// Read-only view of a session for UI consumers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub conversation_id: Option<ConversationId>,
    pub phase: Phase,
    pub streaming_content: String,
    pub final_result: Option<FinalResult>,
    pub follow_up_buffer: String,
    pub follow_ups: Vec<FollowUpMessage>,
    pub error: Option<String>,
}

/// Mutable conversation state driven by the orchestrator.
///
/// `phase` tracks the main analysis only. A follow-up in flight is a separate
/// sub-state with its own buffer, reported as [`Phase::FollowUpStreaming`].
#[derive(Debug, Clone, Default)]
pub struct ConversationSession {
    conversation_id: Option<ConversationId>,
    phase: Phase,
    streaming_content: String,
    final_result: Option<FinalResult>,
    follow_up_buffer: String,
    follow_up_streaming: bool,
    pending_question: Option<FollowUpMessage>,
    follow_ups: Vec<FollowUpMessage>,
    error: Option<String>,
    last_activity: Option<DateTime<Utc>>,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation_id(&self) -> Option<&ConversationId> {
        self.conversation_id.as_ref()
    }

    pub fn phase(&self) -> Phase {
        if self.follow_up_streaming {
            Phase::FollowUpStreaming
        } else {
            self.phase
        }
    }

    /// Phase of the main analysis, ignoring any follow-up in flight
    pub fn main_phase(&self) -> Phase {
        self.phase
    }

    pub fn streaming_content(&self) -> &str {
        &self.streaming_content
    }

    pub fn final_result(&self) -> Option<&FinalResult> {
        self.final_result.as_ref()
    }

    pub fn follow_up_buffer(&self) -> &str {
        &self.follow_up_buffer
    }

    pub fn is_follow_up_streaming(&self) -> bool {
        self.follow_up_streaming
    }

    pub fn follow_ups(&self) -> &[FollowUpMessage] {
        &self.follow_ups
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            conversation_id: self.conversation_id.clone(),
            phase: self.phase(),
            streaming_content: self.streaming_content.clone(),
            final_result: self.final_result.clone(),
            follow_up_buffer: self.follow_up_buffer.clone(),
            follow_ups: self.follow_ups.clone(),
            error: self.error.clone(),
        }
    }

    pub(crate) fn record_error(&mut self, message: String) {
        self.error = Some(message);
    }

    /// Remote start issued; the conversation id is not known yet
    pub(crate) fn prepare(&mut self, now: DateTime<Utc>) {
        *self = Self::new();
        self.phase = Phase::Starting;
        self.last_activity = Some(now);
    }

    pub(crate) fn attach(&mut self, conversation_id: ConversationId) {
        self.conversation_id = Some(conversation_id);
    }

    pub(crate) fn fail_to_start(&mut self, message: String) {
        self.phase = Phase::Error;
        self.error = Some(message);
    }

    /// `Starting -> Streaming`; returns false when the event does not apply
    pub(crate) fn mark_started(&mut self, now: DateTime<Utc>) -> bool {
        if self.phase != Phase::Starting {
            return false;
        }
        self.phase = Phase::Streaming;
        self.last_activity = Some(now);
        true
    }

    /// Apply a cumulative chunk to the main buffer.
    ///
    /// The buffer is replaced, never appended to, and only when the new
    /// content is at least as long as what is already held.
    pub(crate) fn apply_chunk(&mut self, full_content: &str, now: DateTime<Utc>) -> bool {
        match self.phase {
            // Chunks imply the stream began even if `started` was lost
            Phase::Starting => self.phase = Phase::Streaming,
            Phase::Streaming => {}
            _ => return false,
        }
        self.last_activity = Some(now);
        replace_if_not_shorter(&mut self.streaming_content, full_content)
    }

    pub(crate) fn finalize(&mut self, payload: &CompletePayload) -> bool {
        if !self.phase.is_in_flight() {
            return false;
        }
        self.final_result = Some(FinalResult::new(
            payload.full_response.clone(),
            payload.message_id.clone(),
            payload.usage,
        ));
        self.phase = Phase::Complete;
        self.error = None;
        true
    }

    pub(crate) fn fail(&mut self, message: String) -> bool {
        if !self.phase.is_in_flight() {
            return false;
        }
        self.phase = Phase::Error;
        self.error = Some(message);
        true
    }

    pub(crate) fn begin_follow_up(&mut self, question: FollowUpMessage, now: DateTime<Utc>) {
        self.follow_up_buffer.clear();
        self.follow_up_streaming = true;
        self.pending_question = Some(question);
        self.error = None;
        self.last_activity = Some(now);
    }

    pub(crate) fn apply_follow_up_chunk(&mut self, full_content: &str, now: DateTime<Utc>) -> bool {
        if !self.follow_up_streaming {
            return false;
        }
        self.last_activity = Some(now);
        replace_if_not_shorter(&mut self.follow_up_buffer, full_content)
    }

    /// Append the question and its reply to the thread, clear the sub-buffer
    pub(crate) fn finish_follow_up(&mut self, payload: &CompletePayload, now: DateTime<Utc>) -> bool {
        if !self.follow_up_streaming {
            return false;
        }
        if let Some(question) = self.pending_question.take() {
            self.follow_ups.push(question);
        }
        self.follow_ups.push(FollowUpMessage {
            role: Role::Assistant,
            content: payload.full_response.clone(),
            timestamp: now,
            message_id: Some(payload.message_id.clone()),
            usage: payload.usage,
        });
        self.follow_up_buffer.clear();
        self.follow_up_streaming = false;
        true
    }

    /// Fail only the follow-up; the finalized main result is untouched
    pub(crate) fn fail_follow_up(&mut self, message: String) -> bool {
        if !self.follow_up_streaming {
            return false;
        }
        self.follow_up_buffer.clear();
        self.follow_up_streaming = false;
        self.pending_question = None;
        self.error = Some(message);
        true
    }

    /// Fail whatever is waiting once `timeout` has passed without events
    pub(crate) fn expire(&mut self, now: DateTime<Utc>, timeout: Duration) -> bool {
        let Some(last) = self.last_activity else {
            return false;
        };
        if now - last < timeout {
            return false;
        }

        let message = SessionError::Timeout(timeout.num_seconds().max(0) as u64).to_string();
        if self.follow_up_streaming {
            self.fail_follow_up(message)
        } else {
            self.fail(message)
        }
    }

    /// Drop buffers, error and any pending follow-up.
    ///
    /// An unfinished or failed attempt is abandoned entirely (returns true);
    /// a completed result and its thread are kept.
    pub(crate) fn reset_transient(&mut self) -> bool {
        self.streaming_content.clear();
        self.follow_up_buffer.clear();
        self.follow_up_streaming = false;
        self.pending_question = None;
        self.error = None;

        match self.phase {
            Phase::Starting | Phase::Streaming | Phase::Error => {
                self.phase = Phase::Idle;
                self.conversation_id = None;
                self.last_activity = None;
                true
            }
            _ => false,
        }
    }
}

fn replace_if_not_shorter(buffer: &mut String, full_content: &str) -> bool {
    if full_content.len() < buffer.len() {
        return false;
    }
    buffer.clear();
    buffer.push_str(full_content);
    true
}
