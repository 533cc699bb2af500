//! Per-surface orchestration of a streaming analysis conversation

use crate::backend::AnalysisBackend;
use crate::gate::{check_capability, ToolStatus};
use crate::ledger::HistoryLedger;
use crate::request::AnalysisRequest;
use crate::session::{ConversationSession, SessionSnapshot};
use chrono::{DateTime, Duration, Utc};
use parley_channel::{EventChannel, Subscription};
use parley_core::{
    AnalysisTab, ChannelEvent, Config, ConversationId, EventKind, FollowUpMessage, HistoryEntry,
    Phase, Result, Role, SessionError,
};
use parley_telemetry::TelemetryError;
use std::cell::RefCell;
use std::path::Path;
use std::rc::{Rc, Weak};
use tracing::{debug, info, warn};

/// State shared between the orchestrator and its channel handlers
#[derive(Default)]
struct Surface {
    session: ConversationSession,
    ledger: HistoryLedger,
    subscriptions: Vec<Subscription>,
    persona: Option<String>,
    tab: AnalysisTab,
    last_capability: Option<ToolStatus>,
}

impl Surface {
    fn handle_event(&mut self, event: &ChannelEvent, now: DateTime<Utc>) {
        let session = &mut self.session;
        if session.conversation_id() != Some(event.conversation_id()) {
            debug!(conversation_id = %event.conversation_id(), "stale event dropped");
            return;
        }

        // Follow-up payloads carry no tool name
        let for_follow_up = session.is_follow_up_streaming() && event.tool_name().is_none();
        let applied = match event {
            ChannelEvent::Started(_) => session.mark_started(now),
            ChannelEvent::Chunk(p) if for_follow_up => {
                session.apply_follow_up_chunk(&p.full_content, now)
            }
            ChannelEvent::Chunk(p) => session.apply_chunk(&p.full_content, now),
            ChannelEvent::Complete(p) if for_follow_up => session.finish_follow_up(p, now),
            ChannelEvent::Complete(p) => session.finalize(p),
            ChannelEvent::Error(p) => {
                let message = p.message();
                warn!(
                    conversation_id = %p.conversation_id,
                    follow_up = for_follow_up,
                    %message,
                    "remote error"
                );
                if for_follow_up {
                    session.fail_follow_up(message)
                } else {
                    session.fail(message)
                }
            }
        };

        if !applied {
            debug!(kind = ?event.kind(), phase = ?session.phase(), "event ignored in current phase");
        }
    }

    fn archive_completed(&mut self, now: DateTime<Utc>) -> bool {
        if self.session.main_phase() != Phase::Complete {
            return false;
        }
        let Some(result) = self.session.final_result() else {
            return false;
        };
        self.ledger.archive(result, self.session.follow_ups(), now)
    }

    fn teardown(&mut self) {
        if let Some(id) = self.session.conversation_id() {
            debug!(conversation_id = %id, "conversation torn down");
        }
        self.subscriptions.clear();
        self.session = ConversationSession::new();
    }
}

fn dispatch(surface: &Weak<RefCell<Surface>>, event: &ChannelEvent) {
    let Some(shared) = surface.upgrade() else {
        return;
    };
    match shared.try_borrow_mut() {
        Ok(mut state) => state.handle_event(event, Utc::now()),
        Err(_) => warn!(conversation_id = %event.conversation_id(), "surface busy, event dropped"),
    };
}

/// Owns the single active conversation of one UI surface.
///
/// Subscriptions to the shared channel follow the current conversation id:
/// they are replaced when a new analysis starts and released on
/// [`clear_conversation`](Self::clear_conversation), on abandoning an
/// unfinished attempt, and when the orchestrator is dropped.
///
/// Clearing only stops the local listener. A remote computation already
/// running keeps going and its late events are discarded.
pub struct AnalysisOrchestrator {
    panel_id: String,
    config: Config,
    channel: EventChannel,
    backend: Rc<dyn AnalysisBackend>,
    surface: Rc<RefCell<Surface>>,
}

impl AnalysisOrchestrator {
    pub fn new(
        panel_id: impl Into<String>,
        channel: EventChannel,
        backend: Rc<dyn AnalysisBackend>,
        config: Config,
    ) -> Self {
        Self {
            panel_id: panel_id.into(),
            config,
            channel,
            backend,
            surface: Rc::new(RefCell::new(Surface::default())),
        }
    }

    pub fn panel_id(&self) -> &str {
        &self.panel_id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.surface.borrow().session.phase()
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.surface.borrow().session.conversation_id().cloned()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.surface.borrow().session.snapshot()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.surface.borrow().ledger.entries().to_vec()
    }

    pub fn persona(&self) -> Option<String> {
        self.surface.borrow().persona.clone()
    }

    pub fn tab(&self) -> AnalysisTab {
        self.surface.borrow().tab
    }

    /// Result of the most recent capability check, if one ran
    pub fn last_capability(&self) -> Option<ToolStatus> {
        self.surface.borrow().last_capability.clone()
    }

    /// Switching persona starts a fresh conversation
    pub fn select_persona(&mut self, character_id: Option<&str>) {
        if self.surface.borrow().persona.as_deref() == character_id {
            return;
        }
        self.clear_conversation();
        self.surface.borrow_mut().persona = character_id.map(str::to_string);
    }

    /// Tabs own independent sessions; switching starts a fresh one
    pub fn switch_tab(&mut self, tab: AnalysisTab) {
        if self.surface.borrow().tab == tab {
            return;
        }
        self.clear_conversation();
        self.surface.borrow_mut().tab = tab;
    }

    pub fn analyze_from_draft(&mut self, draft_text: &str) -> Result<ConversationId> {
        self.analyze(AnalysisRequest::draft(draft_text))
    }

    pub fn analyze_from_strategy(
        &mut self,
        topic: &str,
        goal: &str,
        audience: &str,
    ) -> Result<ConversationId> {
        self.analyze(AnalysisRequest::strategy(topic, goal, audience))
    }

    /// Start a new analysis, archiving a completed predecessor first.
    ///
    /// Precondition failures return before any remote call is made.
    pub fn analyze(&mut self, request: AnalysisRequest) -> Result<ConversationId> {
        let character_id = self
            .preflight(&request)
            .map_err(|err| self.record(err))?;

        if self.config.capability_gate {
            let status = check_capability(
                self.backend.as_ref(),
                &character_id,
                request.tool_name(&self.config),
            );
            self.surface.borrow_mut().last_capability = Some(status);
        }

        let now = Utc::now();
        {
            let mut surface = self.surface.borrow_mut();
            if surface.archive_completed(now) {
                debug!(panel_id = %self.panel_id, "previous analysis archived");
            }
            surface.subscriptions.clear();
            surface.session.prepare(now);
        }

        let started = match &request {
            AnalysisRequest::Draft { draft_text } => {
                self.backend
                    .start_analysis_from_draft(&character_id, &self.panel_id, draft_text)
            }
            AnalysisRequest::Strategy {
                topic,
                goal,
                audience,
            } => self.backend.start_analysis_from_strategy(
                &character_id,
                &self.panel_id,
                topic,
                goal,
                audience,
            ),
        };

        match started {
            Ok(started) => {
                let conversation_id = started.conversation_id;
                let subscriptions = self.listen(&conversation_id);
                let mut surface = self.surface.borrow_mut();
                surface.subscriptions = subscriptions;
                surface.session.attach(conversation_id.clone());
                info!(
                    panel_id = %self.panel_id,
                    conversation_id = %conversation_id,
                    character_id = %character_id,
                    "analysis started"
                );
                Ok(conversation_id)
            }
            Err(err) => {
                let err = SessionError::Remote(format!("{err:#}"));
                warn!(panel_id = %self.panel_id, %err, "start analysis failed");
                self.surface
                    .borrow_mut()
                    .session
                    .fail_to_start(err.to_string());
                Err(err)
            }
        }
    }

    /// Ask a question about the current conversation.
    ///
    /// The reply streams into a separate buffer and never touches the
    /// finalized analysis.
    pub fn send_follow_up_message(&mut self, message: &str) -> Result<()> {
        let message = message.trim();
        let conversation_id = self
            .follow_up_preflight(message)
            .map_err(|err| self.record(err))?;

        let now = Utc::now();
        self.surface.borrow_mut().session.begin_follow_up(
            FollowUpMessage {
                role: Role::User,
                content: message.to_string(),
                timestamp: now,
                message_id: None,
                usage: None,
            },
            now,
        );

        if let Err(err) = self.backend.send_follow_up(&conversation_id, message) {
            let err = SessionError::FollowUp(format!("{err:#}"));
            warn!(conversation_id = %conversation_id, %err, "follow-up failed");
            self.surface
                .borrow_mut()
                .session
                .fail_follow_up(err.to_string());
            return Err(err);
        }

        debug!(conversation_id = %conversation_id, "follow-up sent");
        Ok(())
    }

    /// Full teardown back to `Idle`; safe to call repeatedly
    pub fn clear_conversation(&mut self) {
        self.surface.borrow_mut().teardown();
    }

    /// Discard the current attempt's buffers and error.
    ///
    /// Narrower than [`clear_conversation`](Self::clear_conversation): a
    /// completed result and its follow-up thread survive.
    pub fn reset(&mut self) {
        let mut surface = self.surface.borrow_mut();
        if surface.session.reset_transient() {
            surface.subscriptions.clear();
        }
    }

    /// Archive the completed analysis now instead of on the next start
    pub fn save_analysis(&mut self) -> Result<bool> {
        let mut surface = self.surface.borrow_mut();
        if surface.session.main_phase() != Phase::Complete {
            let err = SessionError::NothingToSave;
            surface.session.record_error(err.to_string());
            return Err(err);
        }
        Ok(surface.archive_completed(Utc::now()))
    }

    /// Fail a session that has waited longer than `stream_timeout_secs`
    /// without events. Does nothing when no timeout is configured.
    pub fn check_timeout(&mut self, now: DateTime<Utc>) -> bool {
        let Some(secs) = self.config.stream_timeout_secs else {
            return false;
        };
        let timeout = Duration::seconds(secs.min(u64::from(u32::MAX)) as i64);

        let mut surface = self.surface.borrow_mut();
        let expired = surface.session.expire(now, timeout);
        if expired {
            warn!(
                panel_id = %self.panel_id,
                conversation_id = ?surface.session.conversation_id(),
                secs,
                "stream timed out"
            );
        }
        expired
    }

    /// Forget all archived history; used when the surface itself resets
    pub fn clear_history(&mut self) {
        self.surface.borrow_mut().ledger.clear();
    }

    /// Persist archived history to `path`, skipping already-saved entries
    pub fn save_history(&self, path: &Path) -> std::result::Result<usize, TelemetryError> {
        self.surface.borrow().ledger.save_to(path)
    }

    fn preflight(&self, request: &AnalysisRequest) -> Result<String> {
        request.validate()?;
        let persona = self
            .surface
            .borrow()
            .persona
            .clone()
            .ok_or(SessionError::NoPersona)?;
        if !self.channel.is_connected() {
            return Err(SessionError::NotConnected);
        }
        Ok(persona)
    }

    fn follow_up_preflight(&self, message: &str) -> Result<ConversationId> {
        let surface = self.surface.borrow();
        let conversation_id = surface
            .session
            .conversation_id()
            .cloned()
            .ok_or(SessionError::NoActiveConversation)?;
        if !self.channel.is_connected() {
            return Err(SessionError::NotConnected);
        }
        if message.is_empty() {
            return Err(SessionError::EmptyInput("message"));
        }
        if surface.session.is_follow_up_streaming() {
            return Err(SessionError::FollowUpInFlight);
        }
        Ok(conversation_id)
    }

    fn record(&self, err: SessionError) -> SessionError {
        debug!(panel_id = %self.panel_id, %err, "operation rejected");
        self.surface.borrow_mut().session.record_error(err.to_string());
        err
    }

    fn listen(&self, conversation_id: &ConversationId) -> Vec<Subscription> {
        EventKind::ALL
            .into_iter()
            .map(|kind| {
                let surface = Rc::downgrade(&self.surface);
                self.channel
                    .subscribe(conversation_id.clone(), kind, move |event| {
                        dispatch(&surface, event)
                    })
            })
            .collect()
    }
}
