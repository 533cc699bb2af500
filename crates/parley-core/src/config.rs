//! Configuration for analysis orchestration

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tool a persona needs for draft analysis
    pub draft_tool: String,

    /// Tool a persona needs for strategy analysis
    pub strategy_tool: String,

    /// Consult the persona's capability descriptor before starting
    pub capability_gate: bool,

    /// Fail a stuck stream after this many seconds (unbounded when unset)
    pub stream_timeout_secs: Option<u64>,

    /// Max entries the CLI shows from saved history
    pub history_limit: Option<usize>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            draft_tool: "draft_analysis".to_string(),
            strategy_tool: "strategy_analysis".to_string(),
            capability_gate: true,
            stream_timeout_secs: None,
            history_limit: Some(20),
        }
    }

    /// Load from a JSON file; missing keys keep their defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
