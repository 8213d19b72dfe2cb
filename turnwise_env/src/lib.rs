//! Turnwise Boundary Contracts
//!
//! This crate defines the seams between the turn-based runtime and the code
//! that plugs into it:
//! - **Identity**: `AgentId`, opaque and never reused
//! - **Agents**: the `Agent` capability trait
//! - **Messages**: the `Message` trait, which carries its own dispatch
//! - **Fabric**: `MessageFabric`, the only view of the population an agent
//!   ever gets (send, broadcast, view IDs, report completion)
//!
//! # Example
//!
//! ```ignore
//! use turnwise_env::{Agent, AgentId, Message, MessageFabric};
//!
//! struct Ping(AgentId);
//!
//! impl Message<MyAgent> for Ping {
//!     fn sender(&self) -> AgentId { self.0 }
//!     fn dispatch(&self, recipient: &MyAgent) { recipient.handle_ping(self) }
//! }
//! ```

mod agent;
mod error;
mod fabric;
mod types;

pub use agent::{Agent, Message, MessageRef};
pub use error::{DeliveryError, RuntimeError};
pub use fabric::MessageFabric;
pub use types::AgentId;
