//! Drive an orchestrator from a scripted session.
//!
//! Each non-empty script line is either an operation (`{"op": ...}`) or a
//! wire-format channel event (`{"event": ...}`). Lines starting with `#`
//! are comments. The scripted backend hands out ids `c1`, `c2`, ... in
//! start order, so events in the script can address them directly.

use anyhow::Context;
use chrono::{Duration, Utc};
use parley_channel::EventChannel;
use parley_core::{AnalysisTab, ChannelEvent, Config, HistoryEntry, Phase};
use parley_session::{AnalysisOrchestrator, ScriptedBackend, SessionSnapshot, ToolStatus};
use parley_telemetry::Paths;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::rc::Rc;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", rename_all_fields = "camelCase")]
enum Operation {
    SelectPersona {
        character_id: Option<String>,
    },
    SwitchTab {
        tab: AnalysisTab,
    },
    Connect,
    Disconnect,
    AnalyzeDraft {
        draft_text: String,
    },
    AnalyzeStrategy {
        topic: String,
        goal: String,
        audience: String,
    },
    FollowUp {
        message: String,
    },
    Save,
    Reset,
    Clear,
    /// Check for a stuck stream as if `after_secs` had elapsed
    CheckTimeout {
        after_secs: i64,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScriptStep {
    Op(Operation),
    Event(ChannelEvent),
}

/// Final state printed after a replay
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub snapshot: SessionSnapshot,
    pub history: Vec<HistoryEntry>,
    /// Operations that failed, in script order
    pub rejected: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability: Option<ToolStatus>,
    pub events_delivered: usize,
}

pub struct Replay {
    orchestrator: AnalysisOrchestrator,
    channel: EventChannel,
    rejected: Vec<String>,
    delivered: usize,
}

impl Replay {
    /// Connected channel, scripted backend, no persona selected
    pub fn new(panel_id: &str, config: Config) -> Self {
        let channel = EventChannel::new();
        channel.set_connected(true);
        let backend = Rc::new(ScriptedBackend::new());
        let orchestrator = AnalysisOrchestrator::new(panel_id, channel.clone(), backend, config);
        Self {
            orchestrator,
            channel,
            rejected: Vec::new(),
            delivered: 0,
        }
    }

    pub fn run_script(&mut self, script: &str) -> anyhow::Result<()> {
        for (line_no, line) in script.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let step: ScriptStep = serde_json::from_str(line)
                .with_context(|| format!("parsing script line {}", line_no + 1))?;
            self.apply(step);
        }
        Ok(())
    }

    pub fn orchestrator_mut(&mut self) -> &mut AnalysisOrchestrator {
        &mut self.orchestrator
    }

    pub fn report(&self) -> ReplayReport {
        ReplayReport {
            snapshot: self.orchestrator.snapshot(),
            history: self.orchestrator.history(),
            rejected: self.rejected.clone(),
            capability: self.orchestrator.last_capability(),
            events_delivered: self.delivered,
        }
    }

    fn apply(&mut self, step: ScriptStep) {
        match step {
            ScriptStep::Event(event) => self.delivered += self.channel.publish(&event),
            ScriptStep::Op(op) => {
                if let Err(err) = self.perform(op) {
                    warn!(%err, "operation rejected");
                    self.rejected.push(err.to_string());
                }
            }
        }
    }

    fn perform(&mut self, op: Operation) -> anyhow::Result<()> {
        match op {
            Operation::SelectPersona { character_id } => {
                self.orchestrator.select_persona(character_id.as_deref())
            }
            Operation::SwitchTab { tab } => self.orchestrator.switch_tab(tab),
            Operation::Connect => self.channel.set_connected(true),
            Operation::Disconnect => self.channel.set_connected(false),
            Operation::AnalyzeDraft { draft_text } => {
                self.orchestrator.analyze_from_draft(&draft_text)?;
            }
            Operation::AnalyzeStrategy {
                topic,
                goal,
                audience,
            } => {
                self.orchestrator
                    .analyze_from_strategy(&topic, &goal, &audience)?;
            }
            Operation::FollowUp { message } => {
                self.orchestrator.send_follow_up_message(&message)?
            }
            Operation::Save => {
                self.orchestrator.save_analysis()?;
            }
            Operation::Reset => self.orchestrator.reset(),
            Operation::Clear => self.orchestrator.clear_conversation(),
            Operation::CheckTimeout { after_secs } => {
                let at = Duration::try_seconds(after_secs)
                    .and_then(|elapsed| Utc::now().checked_add_signed(elapsed))
                    .ok_or_else(|| anyhow::anyhow!("afterSecs {after_secs} is out of range"))?;
                self.orchestrator.check_timeout(at);
            }
        }
        Ok(())
    }
}

pub fn run(script: &Path, panel: &str, config_path: Option<&Path>, save: bool) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let config = load_config(config_path, &paths)?;
    let contents = std::fs::read_to_string(script)
        .with_context(|| format!("reading script {}", script.display()))?;

    let mut replay = Replay::new(panel, config);
    replay.run_script(&contents)?;

    if save {
        let orchestrator = replay.orchestrator_mut();
        if orchestrator.phase() == Phase::Complete {
            orchestrator.save_analysis()?;
        }
        let path = paths.history_file(panel);
        let written = orchestrator.save_history(&path)?;
        info!(path = %path.display(), written, "history saved");
    }

    println!("{}", serde_json::to_string_pretty(&replay.report())?);
    Ok(())
}

fn load_config(explicit: Option<&Path>, paths: &Paths) -> anyhow::Result<Config> {
    match explicit {
        Some(path) => Config::load(path),
        None if paths.config_file().exists() => Config::load(&paths.config_file()),
        None => Ok(Config::new()),
    }
}
