//! Error taxonomy for conversation operations

use thiserror::Error;

/// Failures surfaced by orchestrator operations.
///
/// The same message is also recorded in the session's `error` field, so
/// callers may ignore the `Err` and inspect state instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("{0} must not be empty")]
    EmptyInput(&'static str),

    #[error("no persona selected")]
    NoPersona,

    #[error("event channel is not connected")]
    NotConnected,

    #[error("no active conversation")]
    NoActiveConversation,

    #[error("a follow-up is already in flight")]
    FollowUpInFlight,

    #[error("no completed analysis to save")]
    NothingToSave,

    #[error("failed to start analysis: {0}")]
    Remote(String),

    #[error("failed to send follow-up: {0}")]
    FollowUp(String),

    #[error("no response after {0}s")]
    Timeout(u64),
}

impl SessionError {
    /// Raised before any remote call was attempted
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            SessionError::EmptyInput(_)
                | SessionError::NoPersona
                | SessionError::NotConnected
                | SessionError::NoActiveConversation
                | SessionError::FollowUpInFlight
                | SessionError::NothingToSave
        )
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
