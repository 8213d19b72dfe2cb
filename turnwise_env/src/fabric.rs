//! Messaging fabric abstraction exposed to agents.

use crate::agent::MessageRef;
use crate::types::AgentId;
use std::collections::HashSet;

/// The operations an agent may perform on the rest of the population.
///
/// Agents only ever see peer IDs through this trait, never peer objects, so
/// the only way to affect another agent is by delivering a message to it.
///
/// # Message Flow
///
/// ```text
/// Agent A                 Fabric                   Agent B
///   |                       |                         |
///   |-- send_message ------>|-- mailbox (FIFO) ------>|-- worker: dispatch
///   |-- send_synchronous -->|-- dispatch inline ----->|
///   |-- report_finished --->|-- completion barrier    |
/// ```
///
/// # Failure
///
/// Sends never fail from the caller's point of view. Unknown recipients,
/// closed windows and bandwidth overruns are dropped silently and counted
/// as failed sends in the turn's diagnostics.
pub trait MessageFabric<A: ?Sized>: Send + Sync {
    /// Queues `msg` into each recipient's mailbox.
    fn send_message(&self, msg: MessageRef<A>, recipients: &[AgentId]);

    /// Dispatches `msg` to each recipient on the calling thread.
    ///
    /// Recipients equal to the sender are skipped and not counted.
    fn send_synchronous_message(&self, msg: MessageRef<A>, recipients: &[AgentId]);

    /// Queues `msg` to every live agent except its sender.
    fn broadcast_message(&self, msg: MessageRef<A>);

    /// Dispatches `msg` inline to every live agent except its sender.
    fn broadcast_synchronous_message(&self, msg: MessageRef<A>);

    /// Returns a snapshot of the currently registered agent IDs.
    fn view_agent_ids(&self) -> HashSet<AgentId>;

    /// Signals that `id` has finished messaging for the current turn.
    ///
    /// Only the first report per agent per turn counts; reports made after
    /// the turn's barrier resolved are ignored. Never blocks.
    fn report_finished_messaging(&self, id: AgentId);
}
