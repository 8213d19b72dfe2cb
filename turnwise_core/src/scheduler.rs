//! Scheduler - drives iterations × turns around the completion barrier.
//!
//! # Turn Lifecycle
//!
//! ```text
//! ┌────────────────────────────── turn N ───────────────────────────────┐
//! │ run_start_of_turn(&mut registry)      window closed, may add/remove │
//! │ barrier INIT + window opens           deadline = now + timeout      │
//! │ run_turn(&registry)                   agents send / report          │
//! │ barrier.wait()                        all reported | timed out      │
//! │ window closes, diagnostics snapshot + reset → TurnReport            │
//! └─────────────────────────────────────────────────────────────────────┘
//!   turn N+1 starts only after turn N's barrier has resolved
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let population = vec![AgentGeneratorCountPair::new(MyAgent::new, 10)];
//! let mut scheduler = Scheduler::new(RuntimeConfig::default(), population)?
//!     .with_turn_logic(MyTurnLogic);
//! let summary = scheduler.run().await?;
//! ```

use crate::barrier::{BarrierOutcome, CompletionBarrier};
use crate::config::RuntimeConfig;
use crate::messenger::Messenger;
use crate::registry::Registry;
use crate::report::{RunSummary, TurnReport};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use turnwise_env::{Agent, RuntimeError};

/// Builds one agent from the messenger it will use.
pub type AgentGenerator<A> = Box<dyn Fn(Messenger<A>) -> A + Send + Sync>;

/// A generator and how many agents to build with it.
pub struct AgentGeneratorCountPair<A: Agent> {
    generator: AgentGenerator<A>,
    count: usize,
}

impl<A: Agent> AgentGeneratorCountPair<A> {
    pub fn new<F>(generator: F, count: usize) -> Self
    where
        F: Fn(Messenger<A>) -> A + Send + Sync + 'static,
    {
        Self {
            generator: Box::new(generator),
            count,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// Simulation-specific logic plugged into the scheduler.
///
/// Only `run_turn` sees the registry while the messaging window is open,
/// and only through a shared reference. The other hooks run between turns
/// and may add or remove agents.
#[async_trait]
pub trait TurnLogic<A: Agent>: Send {
    /// Called before the first turn of each iteration.
    async fn run_start_of_iteration(&mut self, _registry: &mut Registry<A>, _iteration: usize) {}

    /// Called before each turn's messaging window opens.
    async fn run_start_of_turn(&mut self, _registry: &mut Registry<A>, _iteration: usize, _turn: usize) {}

    /// Triggers the agents' messaging for one turn.
    async fn run_turn(&mut self, registry: &Registry<A>, iteration: usize, turn: usize);

    /// Called after the last turn of each iteration.
    async fn run_end_of_iteration(&mut self, _registry: &mut Registry<A>, _iteration: usize) {}
}

/// Lifecycle of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Created,
    Running,
    Finished,
}

/// Owns the registry and runs the turn loop.
pub struct Scheduler<A: Agent> {
    config: RuntimeConfig,
    registry: Registry<A>,
    turn_logic: Option<Box<dyn TurnLogic<A>>>,
    state: SchedulerState,
}

impl<A: Agent> Scheduler<A> {
    /// Validates `config` and builds the initial population.
    pub fn new(config: RuntimeConfig, population: Vec<AgentGeneratorCountPair<A>>) -> Result<Self, RuntimeError> {
        config.validate()?;

        let mut registry = Registry::new(config.bandwidth);
        for pair in &population {
            for _ in 0..pair.count {
                let agent = (pair.generator)(registry.messenger());
                registry.add(agent)?;
            }
        }
        info!("{} agents initialised", registry.len());

        Ok(Self {
            config,
            registry,
            turn_logic: None,
            state: SchedulerState::Created,
        })
    }

    /// Sets the turn logic (builder form).
    pub fn with_turn_logic(mut self, logic: impl TurnLogic<A> + 'static) -> Self {
        self.set_turn_logic(logic);
        self
    }

    pub fn set_turn_logic(&mut self, logic: impl TurnLogic<A> + 'static) {
        self.turn_logic = Some(Box::new(logic));
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn registry(&self) -> &Registry<A> {
        &self.registry
    }

    /// Mutable registry access; only possible while the scheduler is idle.
    pub fn registry_mut(&mut self) -> &mut Registry<A> {
        &mut self.registry
    }

    /// Runs every iteration and turn, then shuts the registry down.
    ///
    /// # Errors
    /// * `MissingTurnLogic` - no turn logic was set; nothing ran
    /// * `AlreadyFinished` - the scheduler has already completed a run
    pub async fn run(&mut self) -> Result<RunSummary, RuntimeError> {
        if self.state == SchedulerState::Finished {
            return Err(RuntimeError::AlreadyFinished);
        }
        let mut logic = self.turn_logic.take().ok_or(RuntimeError::MissingTurnLogic)?;

        self.state = SchedulerState::Running;
        info!(
            agents = self.registry.len(),
            iterations = self.config.iterations,
            turns = self.config.turns,
            "Scheduler starting"
        );
        self.registry.refresh_all();

        let mut summary = RunSummary::default();
        for iteration in 1..=self.config.iterations {
            logic.run_start_of_iteration(&mut self.registry, iteration).await;
            for turn in 1..=self.config.turns {
                let report = self.run_single_turn(logic.as_mut(), iteration, turn).await;
                summary.push(report);
            }
            logic.run_end_of_iteration(&mut self.registry, iteration).await;
            debug!(iteration, "Iteration finished");
        }

        self.registry.shutdown().await;
        self.turn_logic = Some(logic);
        self.state = SchedulerState::Finished;

        info!(
            turns = summary.len(),
            sent = summary.total_sent(),
            dropped = summary.total_dropped(),
            timed_out = summary.timed_out_turns(),
            "Scheduler finished"
        );
        Ok(summary)
    }

    async fn run_single_turn(&mut self, logic: &mut dyn TurnLogic<A>, iteration: usize, turn: usize) -> TurnReport {
        logic.run_start_of_turn(&mut self.registry, iteration, turn).await;
        info!("Iteration {}, Turn {} starting", iteration, turn);

        let (barrier, reporter) = CompletionBarrier::open(self.config.turn_timeout);
        self.registry.open_window(reporter);

        logic.run_turn(&self.registry, iteration, turn).await;

        let expected = self.registry.view_ids();
        let result = barrier.wait(&expected).await;
        self.registry.close_window();

        match result.outcome {
            BarrierOutcome::AllReported => {
                debug!(iteration, turn, "All agents finished messaging");
            }
            BarrierOutcome::TimedOut => {
                warn!(
                    iteration,
                    turn,
                    reported = result.reported,
                    expected = expected.len(),
                    "Messaging timed out before every agent finished"
                );
            }
        }

        let diagnostics = self.registry.finish_turn_diagnostics(result.reported);
        info!(
            sent = diagnostics.sent,
            succeeded = diagnostics.succeeded,
            dropped = diagnostics.dropped,
            "Iteration {}, Turn {} finished ({:.1}% delivered, {:.1}% finished)",
            iteration,
            turn,
            diagnostics.success_rate_percent,
            diagnostics.end_messaging_rate_percent,
        );

        TurnReport::new(iteration, turn, &result, diagnostics)
    }
}
