//! Error types for the Turnwise runtime.

use crate::types::AgentId;
use thiserror::Error;

/// Errors surfaced to callers of the runtime.
///
/// Only configuration mistakes and misuse of the registry are reported this
/// way. Delivery failures never reach callers; they are counted by the
/// diagnostics engine instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuntimeError {
    /// The scheduler was started without a turn-logic hook.
    #[error("Turn logic has not been set; call set_turn_logic before run")]
    MissingTurnLogic,

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An agent with this ID is already registered.
    #[error("Agent already registered: {0}")]
    DuplicateAgent(AgentId),

    /// Registration changed while a turn's messaging window was open.
    #[error("Registration changes are not allowed while a turn is in progress")]
    TurnInProgress,

    /// The OS refused to start an agent's mailbox worker.
    #[error("Failed to start worker for {0}: {1}")]
    WorkerSpawn(AgentId, String),

    /// The scheduler already ran to completion and its workers are gone.
    #[error("Scheduler has already finished")]
    AlreadyFinished,
}

impl RuntimeError {
    /// Creates an invalid-configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Reasons a single delivery was dropped.
///
/// Internal classification only: every variant is counted as a failed send
/// and logged, never returned to the sending agent.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// Recipient is not registered (never was, or has been removed).
    #[error("Unknown or removed recipient: {0}")]
    UnknownRecipient(AgentId),

    /// The turn's messaging window is closed (timeout or shutdown).
    #[error("Messaging window is closed")]
    WindowClosed,

    /// Sender exceeded its per-turn asynchronous message ceiling.
    #[error("Bandwidth ceiling of {0} messages exceeded")]
    BandwidthExceeded(usize),

    /// Recipient's mailbox was closed before the message could be queued.
    #[error("Mailbox closed for {0}")]
    MailboxClosed(AgentId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RuntimeError::invalid_config("turns must be positive");
        assert_eq!(err.to_string(), "Invalid configuration: turns must be positive");

        let id = AgentId::from_seed(3);
        let drop = DeliveryError::UnknownRecipient(id);
        assert!(drop.to_string().contains(&id.to_string()));
    }
}
