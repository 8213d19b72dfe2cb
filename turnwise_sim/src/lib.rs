//! Turnwise Simulation Harness
//!
//! Runs populations of demo agents through the turn scheduler and checks
//! the delivery and barrier counters each turn produces.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       ScenarioRunner                         │
//! │  seed ──► ChaCha8Rng ──► agent IDs, silent agents            │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │ Scheduler (turnwise_core)                              │  │
//! │  │   SimWorld: TurnLogic ──► CounterAgent × N             │  │
//! │  │   per turn: greet / echo / sync session ──► barrier    │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │        │                                                     │
//! │        ▼                                                     │
//! │  RunSummary ──► pass/fail checks ──► RunExport (JSON)        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use turnwise_sim::{ScenarioRunner, ScenarioId};
//!
//! let result = ScenarioRunner::new(42, 6).run(ScenarioId::Stragglers);
//! assert!(result.passed);
//! ```

pub mod agent;
pub mod error;
pub mod exporter;
pub mod runner;
pub mod scenarios;
pub mod world;

pub use agent::{CounterAgent, EchoMessage, GreetingMessage};
pub use error::SimError;
pub use exporter::RunExport;
pub use runner::{ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
pub use world::SimWorld;
