//! Analysis inputs and their validation

use parley_core::{Config, SessionError};

/// What the user asked to have analysed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisRequest {
    Draft {
        draft_text: String,
    },
    Strategy {
        topic: String,
        goal: String,
        audience: String,
    },
}

impl AnalysisRequest {
    pub fn draft(draft_text: &str) -> Self {
        AnalysisRequest::Draft {
            draft_text: draft_text.trim().to_string(),
        }
    }

    pub fn strategy(topic: &str, goal: &str, audience: &str) -> Self {
        AnalysisRequest::Strategy {
            topic: topic.trim().to_string(),
            goal: goal.trim().to_string(),
            audience: audience.trim().to_string(),
        }
    }

    /// Every input must be non-empty
    pub fn validate(&self) -> Result<(), SessionError> {
        let fields: Vec<(&'static str, &str)> = match self {
            AnalysisRequest::Draft { draft_text } => vec![("draft", draft_text.as_str())],
            AnalysisRequest::Strategy {
                topic,
                goal,
                audience,
            } => vec![
                ("topic", topic.as_str()),
                ("goal", goal.as_str()),
                ("audience", audience.as_str()),
            ],
        };

        match fields.into_iter().find(|(_, value)| value.is_empty()) {
            Some((name, _)) => Err(SessionError::EmptyInput(name)),
            None => Ok(()),
        }
    }

    /// Tool the persona is expected to have for this kind of analysis
    pub fn tool_name<'a>(&self, config: &'a Config) -> &'a str {
        match self {
            AnalysisRequest::Draft { .. } => &config.draft_tool,
            AnalysisRequest::Strategy { .. } => &config.strategy_tool,
        }
    }
}
