//! Agent and message capability traits.

use crate::types::AgentId;
use std::sync::Arc;

/// The capability set the runtime requires of every agent.
///
/// Methods take `&self`: the registry shares each agent between its mailbox
/// worker and any peer performing a synchronous send, so agents keep their
/// mutable state behind atomics or locks of their own choosing.
///
/// # Delivery guarantees
///
/// - Asynchronous messages are handled one at a time by the agent's
///   dedicated worker, in the order they were queued.
/// - Synchronous messages run on the sender's thread and may overlap with
///   the worker.
pub trait Agent: Send + Sync + 'static {
    /// Returns the agent's identity. Must never change.
    fn id(&self) -> AgentId;

    /// Refreshes internal state outside the turn loop.
    ///
    /// Called once per agent when a run begins.
    fn refresh_internal_state(&self) {}

    /// Performs this agent's purely synchronous messaging for a turn.
    ///
    /// Invoked by `Registry::run_synchronous_messaging_session`.
    fn run_synchronous_messaging(&self) {}
}

/// A message addressed to agents of type `A`.
///
/// The message knows which handler to call on its recipient, so the runtime
/// can deliver any variant without inspecting the payload.
pub trait Message<A: ?Sized>: Send + Sync + 'static {
    /// Returns the ID of the agent that created the message.
    fn sender(&self) -> AgentId;

    /// Invokes the recipient's handler for this message variant.
    fn dispatch(&self, recipient: &A);
}

/// Shared message handle; broadcasts deliver the same instance to everyone.
pub type MessageRef<A> = Arc<dyn Message<A>>;
