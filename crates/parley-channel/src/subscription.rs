//! Scoped registration guard

use crate::channel::Registry;
use parley_core::{ConversationId, EventKind};
use std::cell::RefCell;
use std::rc::Weak;
use tracing::debug;

/// Live registration on an [`EventChannel`](crate::EventChannel).
///
/// Released on [`unsubscribe`](Subscription::unsubscribe) or drop, whichever
/// comes first. Holds only a weak reference, so an outstanding guard never
/// keeps the channel alive.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    channel: Weak<RefCell<Registry>>,
    conversation_id: ConversationId,
    kind: EventKind,
    token: u64,
    active: bool,
}

impl Subscription {
    pub(crate) fn new(
        channel: Weak<RefCell<Registry>>,
        conversation_id: ConversationId,
        kind: EventKind,
        token: u64,
    ) -> Self {
        Self {
            channel,
            conversation_id,
            kind,
            token,
            active: true,
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.active && self.channel.strong_count() > 0
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        if let Some(registry) = self.channel.upgrade() {
            if registry
                .borrow_mut()
                .unregister(&self.conversation_id, self.token)
            {
                debug!(
                    conversation_id = %self.conversation_id,
                    kind = ?self.kind,
                    token = self.token,
                    "unsubscribed"
                );
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("conversation_id", &self.conversation_id)
            .field("kind", &self.kind)
            .field("active", &self.is_active())
            .finish()
    }
}
