//! Errors raised by the simulation harness.

use thiserror::Error;
use turnwise_core::RuntimeError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scenario {scenario} needs at least {needed} agents, got {got}")]
    TooFewAgents {
        scenario: &'static str,
        needed: usize,
        got: usize,
    },
}
