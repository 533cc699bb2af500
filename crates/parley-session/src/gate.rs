//! Soft capability check against a persona's tool descriptor

use crate::backend::AnalysisBackend;
use parley_core::CharacterTools;
use serde::Serialize;
use tracing::warn;

/// Outcome of looking up a required tool for a persona
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ToolStatus {
    Enabled,
    Disabled,
    Missing,
    /// The descriptor could not be fetched
    Unavailable { reason: String },
}

impl ToolStatus {
    pub fn from_tools(tools: &CharacterTools, tool_name: &str) -> Self {
        match tools.find(tool_name) {
            Some(tool) if tool.is_enabled => ToolStatus::Enabled,
            Some(_) => ToolStatus::Disabled,
            None => ToolStatus::Missing,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, ToolStatus::Enabled)
    }
}

/// Look up `tool_name` for `character_id`.
///
/// Never blocks the analysis: anything other than an enabled tool is only
/// logged as a warning.
pub fn check_capability(
    backend: &dyn AnalysisBackend,
    character_id: &str,
    tool_name: &str,
) -> ToolStatus {
    let status = match backend.get_character_tools(character_id) {
        Ok(tools) => ToolStatus::from_tools(&tools, tool_name),
        Err(err) => ToolStatus::Unavailable {
            reason: format!("{err:#}"),
        },
    };

    match &status {
        ToolStatus::Enabled => {}
        ToolStatus::Disabled => {
            warn!(character_id, tool_name, "persona has the tool disabled, proceeding anyway")
        }
        ToolStatus::Missing => {
            warn!(character_id, tool_name, "persona lacks the tool, proceeding anyway")
        }
        ToolStatus::Unavailable { reason } => {
            warn!(character_id, tool_name, %reason, "capability lookup failed, proceeding anyway")
        }
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ScriptedBackend;
    use parley_core::ToolDescriptor;

    fn tools(entries: &[(&str, bool)]) -> CharacterTools {
        CharacterTools {
            available_tools: entries
                .iter()
                .map(|(name, is_enabled)| ToolDescriptor {
                    name: name.to_string(),
                    is_enabled: *is_enabled,
                })
                .collect(),
        }
    }

    #[test]
    fn test_status_from_tools() {
        let tools = tools(&[("draft_analysis", true), ("strategy_analysis", false)]);
        assert_eq!(ToolStatus::from_tools(&tools, "draft_analysis"), ToolStatus::Enabled);
        assert_eq!(ToolStatus::from_tools(&tools, "strategy_analysis"), ToolStatus::Disabled);
        assert_eq!(ToolStatus::from_tools(&tools, "web_search"), ToolStatus::Missing);
    }

    #[test]
    fn test_lookup_failure_is_unavailable() {
        let backend = ScriptedBackend::with_tools(None);
        let status = check_capability(&backend, "ada", "draft_analysis");
        assert!(matches!(status, ToolStatus::Unavailable { .. }));
        assert!(!status.is_enabled());
    }

    #[test]
    fn test_status_serializes_with_tag() {
        let json = serde_json::to_value(ToolStatus::Missing).unwrap();
        assert_eq!(json["status"], "missing");
    }
}
