//! Turnwise Core - Turn-Based Multi-Agent Runtime
//!
//! This library runs a population of agents through iterations of turns:
//! 1. **Mailboxes**: every agent owns a FIFO queue drained by a dedicated worker
//! 2. **Completion Barrier**: a turn ends when every agent reports or the deadline passes
//! 3. **Diagnostics**: sent/succeeded/finished counters, snapshotted per turn
//! 4. **Scheduler**: drives iterations × turns through pluggable turn logic

pub mod barrier;
pub mod base_agent;
pub mod config;
pub mod diagnostics;
pub mod messenger;
pub mod registry;
pub mod report;
pub mod scheduler;

mod delivery;
mod mailbox;

#[cfg(test)]
mod testing;

// Re-export key types for convenience
pub use barrier::{BarrierOutcome, BarrierResult, CompletionBarrier, CompletionReporter};
pub use base_agent::{BaseAgent, BaseMessage};
pub use config::RuntimeConfig;
pub use diagnostics::{DiagnosticsEngine, DiagnosticsSnapshot};
pub use messenger::Messenger;
pub use registry::Registry;
pub use report::{RunSummary, TurnReport};
pub use scheduler::{AgentGenerator, AgentGeneratorCountPair, Scheduler, SchedulerState, TurnLogic};

pub use turnwise_env::{Agent, AgentId, DeliveryError, Message, MessageFabric, MessageRef, RuntimeError};
