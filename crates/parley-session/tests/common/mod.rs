#![allow(dead_code)]

use parley_channel::EventChannel;
use parley_core::{ChannelEvent, Config, ConversationId};
use parley_session::{AnalysisOrchestrator, ScriptedBackend};
use std::rc::Rc;

pub const DRAFT_TOOL: &str = "draft_analysis";

pub struct Harness {
    pub orchestrator: AnalysisOrchestrator,
    pub channel: EventChannel,
    pub backend: Rc<ScriptedBackend>,
}

pub fn harness() -> Harness {
    harness_with(Config::new())
}

pub fn harness_with(config: Config) -> Harness {
    let channel = EventChannel::new();
    channel.set_connected(true);
    let backend = Rc::new(ScriptedBackend::new());
    let mut orchestrator =
        AnalysisOrchestrator::new("panel-1", channel.clone(), backend.clone(), config);
    orchestrator.select_persona(Some("ada"));
    Harness {
        orchestrator,
        channel,
        backend,
    }
}

/// Stream `text` one cumulative prefix per chunk, then complete it
pub fn stream_analysis(channel: &EventChannel, id: &ConversationId, text: &str, message_id: &str) {
    channel.publish(&ChannelEvent::started(id.clone(), DRAFT_TOOL));
    let mut content = String::new();
    for (index, ch) in text.chars().enumerate() {
        content.push(ch);
        channel.publish(&ChannelEvent::chunk(id.clone(), &content, index as u64, Some(DRAFT_TOOL)));
    }
    channel.publish(&ChannelEvent::complete(id.clone(), text, message_id, Some(DRAFT_TOOL)));
}

/// Follow-up replies arrive without a tool name
pub fn stream_follow_up(channel: &EventChannel, id: &ConversationId, text: &str, message_id: &str) {
    channel.publish(&ChannelEvent::chunk(id.clone(), text, 0, None));
    channel.publish(&ChannelEvent::complete(id.clone(), text, message_id, None));
}
