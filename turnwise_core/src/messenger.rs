//! Agent-facing handle onto the registry.

use crate::registry::Shared;

use std::collections::HashSet;
use std::sync::{Arc, Weak};
use turnwise_env::{Agent, AgentId, MessageFabric, MessageRef};

/// The handle agents use to talk to the rest of the population.
///
/// Holds only a weak reference, so agents storing a messenger do not keep
/// the registry alive. Once the registry is dropped every operation becomes
/// a silent no-op.
pub struct Messenger<A: Agent> {
    shared: Weak<Shared<A>>,
}

impl<A: Agent> Messenger<A> {
    pub(crate) fn new(shared: Weak<Shared<A>>) -> Self {
        Self { shared }
    }

    /// Creates a messenger attached to nothing. Useful for agents built
    /// outside a registry, e.g. in unit tests.
    pub fn detached() -> Self {
        Self { shared: Weak::new() }
    }

    /// Returns true while the owning registry is alive.
    pub fn is_attached(&self) -> bool {
        self.shared.strong_count() > 0
    }

    /// Resolves once the current turn's barrier has resolved.
    ///
    /// Returns immediately when no turn is in progress.
    pub async fn messaging_closed(&self) {
        let reporter = self.upgrade().and_then(|shared| shared.completion_reporter());
        if let Some(reporter) = reporter {
            reporter.closed().await;
        }
    }

    fn upgrade(&self) -> Option<Arc<Shared<A>>> {
        self.shared.upgrade()
    }
}

impl<A: Agent> Clone for Messenger<A> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<A: Agent> std::fmt::Debug for Messenger<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Messenger")
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl<A: Agent> MessageFabric<A> for Messenger<A> {
    fn send_message(&self, msg: MessageRef<A>, recipients: &[AgentId]) {
        if let Some(shared) = self.upgrade() {
            shared.send_message(msg, recipients);
        }
    }

    fn send_synchronous_message(&self, msg: MessageRef<A>, recipients: &[AgentId]) {
        if let Some(shared) = self.upgrade() {
            shared.send_synchronous_message(msg, recipients);
        }
    }

    fn broadcast_message(&self, msg: MessageRef<A>) {
        if let Some(shared) = self.upgrade() {
            shared.broadcast_message(msg);
        }
    }

    fn broadcast_synchronous_message(&self, msg: MessageRef<A>) {
        if let Some(shared) = self.upgrade() {
            shared.broadcast_synchronous_message(msg);
        }
    }

    fn view_agent_ids(&self) -> HashSet<AgentId> {
        match self.upgrade() {
            Some(shared) => shared.entries().keys().copied().collect(),
            None => HashSet::new(),
        }
    }

    fn report_finished_messaging(&self, id: AgentId) {
        if let Some(shared) = self.upgrade() {
            shared.report_finished_messaging(id);
        }
    }
}
