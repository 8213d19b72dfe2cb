//! Building blocks for concrete agents and messages.
//!
//! ```ignore
//! struct Trader {
//!     base: BaseAgent<Trader>,
//!     balance: AtomicI64,
//! }
//!
//! impl Agent for Trader {
//!     fn id(&self) -> AgentId { self.base.id() }
//! }
//! ```

use crate::messenger::Messenger;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use turnwise_env::{Agent, AgentId, MessageFabric, MessageRef};

/// Identity plus messenger; embed this in a concrete agent.
pub struct BaseAgent<A: Agent> {
    id: AgentId,
    messenger: Messenger<A>,
}

impl<A: Agent> BaseAgent<A> {
    /// Creates a base with a fresh random ID.
    pub fn new(messenger: Messenger<A>) -> Self {
        Self::with_id(AgentId::new(), messenger)
    }

    /// Creates a base with a caller-chosen ID.
    pub fn with_id(id: AgentId, messenger: Messenger<A>) -> Self {
        Self { id, messenger }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn messenger(&self) -> &Messenger<A> {
        &self.messenger
    }

    /// Header for a new message sent by this agent.
    pub fn create_base_message(&self) -> BaseMessage {
        BaseMessage::new(self.id)
    }

    /// Reports this agent as finished messaging for the current turn.
    pub fn signal_messaging_complete(&self) {
        self.messenger.report_finished_messaging(self.id);
    }

    pub fn send_message(&self, msg: MessageRef<A>, recipient: AgentId) {
        self.messenger.send_message(msg, &[recipient]);
    }

    pub fn send_synchronous_message(&self, msg: MessageRef<A>, recipient: AgentId) {
        self.messenger.send_synchronous_message(msg, &[recipient]);
    }

    pub fn broadcast_message(&self, msg: MessageRef<A>) {
        self.messenger.broadcast_message(msg);
    }

    pub fn broadcast_synchronous_message(&self, msg: MessageRef<A>) {
        self.messenger.broadcast_synchronous_message(msg);
    }

    /// IDs of every live agent, this one included.
    pub fn view_agent_ids(&self) -> HashSet<AgentId> {
        self.messenger.view_agent_ids()
    }
}

impl<A: Agent> Clone for BaseAgent<A> {
    fn clone(&self) -> Self {
        Self::with_id(self.id, self.messenger.clone())
    }
}

impl<A: Agent> std::fmt::Debug for BaseAgent<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseAgent").field("id", &self.id).finish()
    }
}

/// Common header embedded in concrete message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseMessage {
    sender: AgentId,
}

impl BaseMessage {
    pub fn new(sender: AgentId) -> Self {
        Self { sender }
    }

    pub fn sender(&self) -> AgentId {
        self.sender
    }
}
