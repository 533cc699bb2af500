//! Publish/subscribe router for one user session's event channel

use crate::subscription::Subscription;
use parley_core::{ChannelEvent, ConversationId, EventKind};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, warn};

/// Callback invoked for every matching event
pub type Handler = Box<dyn FnMut(&ChannelEvent)>;

type SharedHandler = Rc<RefCell<Handler>>;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("malformed event frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

struct Registration {
    token: u64,
    kind: EventKind,
    handler: SharedHandler,
}

#[derive(Default)]
pub(crate) struct Registry {
    routes: HashMap<ConversationId, Vec<Registration>>,
    next_token: u64,
    connected: bool,
}

impl Registry {
    pub(crate) fn unregister(&mut self, conversation_id: &ConversationId, token: u64) -> bool {
        let Some(registrations) = self.routes.get_mut(conversation_id) else {
            return false;
        };
        let before = registrations.len();
        registrations.retain(|r| r.token != token);
        let removed = registrations.len() != before;
        if registrations.is_empty() {
            self.routes.remove(conversation_id);
        }
        removed
    }

    fn is_registered(&self, conversation_id: &ConversationId, token: u64) -> bool {
        self.routes
            .get(conversation_id)
            .is_some_and(|regs| regs.iter().any(|r| r.token == token))
    }
}

/// Cloneable handle to the shared channel.
///
/// Dispatch is single-threaded: handlers run one at a time, in subscription
/// order, and only for registrations matching the event's conversation id
/// and kind. Ordering holds within one conversation id only.
#[derive(Clone, Default)]
pub struct EventChannel {
    inner: Rc<RefCell<Registry>>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.borrow().connected
    }

    pub fn set_connected(&self, connected: bool) {
        let mut registry = self.inner.borrow_mut();
        if registry.connected != connected {
            debug!(connected, "channel connectivity changed");
        }
        registry.connected = connected;
    }

    /// Register `handler` for `kind` events on `conversation_id`.
    ///
    /// The registration lives as long as the returned guard.
    pub fn subscribe<F>(
        &self,
        conversation_id: ConversationId,
        kind: EventKind,
        handler: F,
    ) -> Subscription
    where
        F: FnMut(&ChannelEvent) + 'static,
    {
        let mut registry = self.inner.borrow_mut();
        let token = registry.next_token;
        registry.next_token += 1;
        registry
            .routes
            .entry(conversation_id.clone())
            .or_default()
            .push(Registration {
                token,
                kind,
                handler: Rc::new(RefCell::new(Box::new(handler))),
            });
        debug!(conversation_id = %conversation_id, ?kind, token, "subscribed");

        Subscription::new(Rc::downgrade(&self.inner), conversation_id, kind, token)
    }

    /// Deliver an event to its subscribers; returns how many handlers ran
    pub fn publish(&self, event: &ChannelEvent) -> usize {
        let conversation_id = event.conversation_id();
        let kind = event.kind();

        let targets: Vec<(u64, SharedHandler)> = {
            let registry = self.inner.borrow();
            match registry.routes.get(conversation_id) {
                Some(registrations) => registrations
                    .iter()
                    .filter(|r| r.kind == kind)
                    .map(|r| (r.token, Rc::clone(&r.handler)))
                    .collect(),
                None => Vec::new(),
            }
        };

        if targets.is_empty() {
            debug!(conversation_id = %conversation_id, ?kind, "no listener, event dropped");
            return 0;
        }

        let mut delivered = 0;
        for (token, handler) in targets {
            // An earlier handler in this dispatch may have unsubscribed this one
            if !self.inner.borrow().is_registered(conversation_id, token) {
                continue;
            }
            match handler.try_borrow_mut() {
                Ok(mut f) => {
                    (&mut *f)(event);
                    delivered += 1;
                }
                Err(_) => {
                    warn!(conversation_id = %conversation_id, token, "handler re-entered, skipped");
                }
            }
        }
        delivered
    }

    /// Decode a JSON wire frame and publish it
    pub fn publish_json(&self, frame: &str) -> Result<usize, ChannelError> {
        let event = ChannelEvent::from_json(frame)?;
        Ok(self.publish(&event))
    }

    pub fn subscription_count(&self, conversation_id: &ConversationId) -> usize {
        self.inner
            .borrow()
            .routes
            .get(conversation_id)
            .map_or(0, Vec::len)
    }

    /// Number of conversation ids with at least one live subscription
    pub fn conversation_count(&self) -> usize {
        self.inner.borrow().routes.len()
    }
}
