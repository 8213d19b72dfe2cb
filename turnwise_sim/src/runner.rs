//! Scenario runner - builds a scheduler per scenario and checks the outcome.

use crate::agent::CounterAgent;
use crate::error::SimError;
use crate::scenarios::ScenarioId;
use crate::world::SimWorld;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};
use turnwise_core::{
    AgentGeneratorCountPair, AgentId, BarrierOutcome, Messenger, RunSummary, RuntimeConfig,
    Scheduler, TurnReport,
};

/// Ceiling applied to the ping-pong scenario when none is configured.
pub const DEFAULT_PING_PONG_BANDWIDTH: usize = 16;

/// Share of agents that stay silent in the stragglers scenario.
pub const DEFAULT_SILENT_FRACTION: f64 = 0.25;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Configuration the scheduler ran with
    pub config: RuntimeConfig,

    /// Number of agents at the start of the run
    pub agents: usize,

    /// Number of agents that never report
    pub silent_agents: usize,

    /// Per-turn reports
    pub summary: RunSummary,

    /// Failure message if any
    pub failure_reason: Option<String>,
}

impl ScenarioResult {
    fn failed(scenario: ScenarioId, seed: u64, config: RuntimeConfig, agents: usize, reason: String) -> Self {
        Self {
            scenario,
            seed,
            passed: false,
            config,
            agents,
            silent_agents: 0,
            summary: RunSummary::default(),
            failure_reason: Some(reason),
        }
    }
}

/// Runs scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Number of agents
    num_agents: usize,

    /// Scheduler configuration shared by every scenario
    config: RuntimeConfig,

    /// Share of silent agents in the stragglers scenario
    silent_fraction: f64,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64, num_agents: usize) -> Self {
        Self {
            seed,
            num_agents,
            config: RuntimeConfig::default()
                .with_turns(3)
                .with_turn_timeout(Duration::from_millis(200)),
            silent_fraction: DEFAULT_SILENT_FRACTION,
        }
    }

    /// Replaces the scheduler configuration.
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the iteration count.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.config.iterations = iterations;
        self
    }

    /// Sets the turns per iteration.
    pub fn with_turns(mut self, turns: usize) -> Self {
        self.config.turns = turns;
        self
    }

    /// Sets the per-turn timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.turn_timeout = timeout;
        self
    }

    /// Sets the per-sender bandwidth ceiling.
    pub fn with_bandwidth(mut self, ceiling: usize) -> Self {
        self.config.bandwidth = Some(ceiling);
        self
    }

    /// Sets the share of silent agents in the stragglers scenario.
    pub fn with_silent_fraction(mut self, fraction: f64) -> Self {
        self.silent_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Configuration actually used for `scenario`.
    pub fn config_for(&self, scenario: ScenarioId) -> RuntimeConfig {
        let mut config = self.config.clone();
        if scenario == ScenarioId::PingPong && config.bandwidth.is_none() {
            config.bandwidth = Some(DEFAULT_PING_PONG_BANDWIDTH);
        }
        config
    }

    /// Runs a scenario on a fresh tokio runtime and returns the result.
    ///
    /// Must not be called from inside an async context; use `run_async`
    /// there instead.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build();

        match runtime {
            Ok(runtime) => runtime.block_on(self.run_async(scenario)),
            Err(e) => ScenarioResult::failed(
                scenario,
                self.seed,
                self.config_for(scenario),
                self.num_agents,
                SimError::from(e).to_string(),
            ),
        }
    }

    /// Runs a scenario on the current runtime.
    pub async fn run_async(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        let config = self.config_for(scenario);

        match self.execute(scenario, config.clone()).await {
            Ok((summary, silent_agents)) => {
                let failure_reason = self.evaluate(scenario, &config, &summary, silent_agents);
                if let Some(reason) = &failure_reason {
                    warn!("Scenario {} failed: {}", scenario.name(), reason);
                }
                ScenarioResult {
                    scenario,
                    seed: self.seed,
                    passed: failure_reason.is_none(),
                    config,
                    agents: self.num_agents,
                    silent_agents,
                    summary,
                    failure_reason,
                }
            }
            Err(e) => ScenarioResult::failed(scenario, self.seed, config, self.num_agents, e.to_string()),
        }
    }

    async fn execute(&self, scenario: ScenarioId, config: RuntimeConfig) -> Result<(RunSummary, usize), SimError> {
        if self.num_agents < scenario.min_agents() {
            return Err(SimError::TooFewAgents {
                scenario: scenario.name(),
                needed: scenario.min_agents(),
                got: self.num_agents,
            });
        }

        let silent = match scenario {
            ScenarioId::Stragglers => silent_indices(self.seed, self.num_agents, self.silent_fraction),
            _ => HashSet::new(),
        };
        let silent_agents = silent.len();
        debug!(silent = silent_agents, "Population planned");

        let population = vec![AgentGeneratorCountPair::new(
            seeded_generator(self.seed, silent),
            self.num_agents,
        )];
        let mut scheduler = Scheduler::new(config, population)?.with_turn_logic(SimWorld::new(scenario));
        let summary = scheduler.run().await?;

        Ok((summary, silent_agents))
    }

    /// Returns a failure reason, or `None` when the run behaved as expected.
    fn evaluate(&self, scenario: ScenarioId, config: &RuntimeConfig, summary: &RunSummary, silent: usize) -> Option<String> {
        let expected_turns = config.total_turns();
        if summary.len() != expected_turns {
            return Some(format!("ran {} turns, expected {}", summary.len(), expected_turns));
        }

        let n = self.num_agents;
        for report in &summary.turns {
            let d = &report.diagnostics;
            let live = d.total_agents;
            let failure = match scenario {
                ScenarioId::Broadcast | ScenarioId::Synchronous => check_full_delivery(report, live)
                    .or_else(|| expect_outcome(report, BarrierOutcome::AllReported)),
                ScenarioId::Stragglers => {
                    let outcome = if silent > 0 {
                        BarrierOutcome::TimedOut
                    } else {
                        BarrierOutcome::AllReported
                    };
                    check_full_delivery(report, live)
                        .or_else(|| expect_outcome(report, outcome))
                        .or_else(|| expect_count("finished reports", d.end_messaging_reports, n - silent))
                }
                ScenarioId::PingPong => {
                    // The server's opening serve plus one reply per budget slot on
                    // each side; the next reply is the single drop.
                    let ceiling = config.bandwidth.unwrap_or(DEFAULT_PING_PONG_BANDWIDTH);
                    expect_outcome(report, BarrierOutcome::TimedOut)
                        .or_else(|| expect_count("sent", d.sent, 2 * ceiling + 1))
                        .or_else(|| expect_count("succeeded", d.succeeded, 2 * ceiling))
                }
                ScenarioId::Departure => {
                    let departed = n - live;
                    expect_outcome(report, BarrierOutcome::AllReported)
                        .or_else(|| expect_count("dropped", d.dropped, departed))
                        .or_else(|| expect_count("succeeded", d.succeeded, live * (live - 1)))
                }
            };
            if let Some(reason) = failure {
                return Some(format!(
                    "iteration {} turn {}: {}",
                    report.iteration, report.turn, reason
                ));
            }
        }
        None
    }
}

/// Every live agent reached every peer and nothing was dropped.
fn check_full_delivery(report: &TurnReport, live: usize) -> Option<String> {
    let d = &report.diagnostics;
    let expected = live * live.saturating_sub(1);
    expect_count("sent", d.sent, expected).or_else(|| expect_count("dropped", d.dropped, 0))
}

fn expect_outcome(report: &TurnReport, expected: BarrierOutcome) -> Option<String> {
    if report.outcome == expected {
        None
    } else {
        Some(format!("barrier {:?}, expected {:?}", report.outcome, expected))
    }
}

fn expect_count(what: &str, actual: usize, expected: usize) -> Option<String> {
    if actual == expected {
        None
    } else {
        Some(format!("{} = {}, expected {}", what, actual, expected))
    }
}

/// Picks which agent indices stay silent. At least one agent always talks.
pub fn silent_indices(seed: u64, agents: usize, fraction: f64) -> HashSet<usize> {
    if agents < 2 {
        return HashSet::new();
    }
    let wanted = ((agents as f64 * fraction).round() as usize).min(agents - 1);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rand::seq::index::sample(&mut rng, agents, wanted)
        .into_iter()
        .collect()
}

/// Builds agents with IDs drawn from `seed`, marking `silent` indices.
fn seeded_generator(
    seed: u64,
    silent: HashSet<usize>,
) -> impl Fn(Messenger<CounterAgent>) -> CounterAgent + Send + Sync + 'static {
    // Separate stream from the silent-index draw.
    let state = Mutex::new((ChaCha8Rng::seed_from_u64(seed.wrapping_mul(0x9e3779b97f4a7c15)), 0usize));
    let silent = Arc::new(silent);

    move |messenger| {
        let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
        let (rng, index) = &mut *guard;
        let id = AgentId::from_seed(rng.gen::<u64>() | 1);
        let agent = CounterAgent::new(id, messenger, silent.contains(index));
        *index += 1;
        agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn runner(seed: u64, agents: usize) -> ScenarioRunner {
        ScenarioRunner::new(seed, agents)
            .with_turns(2)
            .with_timeout(Duration::from_millis(150))
    }

    #[test]
    fn test_broadcast_scenario() {
        let result = runner(42, 5).run(ScenarioId::Broadcast);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.summary.total_sent(), 2 * 5 * 4);
        assert_eq!(result.summary.timed_out_turns(), 0);
    }

    #[test]
    fn test_synchronous_scenario() {
        let result = runner(42, 4).run(ScenarioId::Synchronous);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.summary.total_succeeded(), 2 * 4 * 3);
    }

    #[test]
    fn test_stragglers_scenario() {
        let result = runner(7, 8).run(ScenarioId::Stragglers);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.silent_agents, 2);
        assert_eq!(result.summary.timed_out_turns(), 2);
    }

    #[test]
    fn test_ping_pong_scenario() {
        let result = runner(42, 3).with_bandwidth(4).run(ScenarioId::PingPong);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.summary.total_dropped(), 2);
    }

    #[test]
    fn test_departure_scenario() {
        let result = runner(42, 4).with_turns(3).run(ScenarioId::Departure);

        assert!(result.passed, "{:?}", result.failure_reason);
        // One stale send in turn 2, two in turn 3.
        assert_eq!(result.summary.total_dropped(), 3);
    }

    #[test]
    fn test_too_few_agents() {
        let result = runner(42, 1).run(ScenarioId::PingPong);

        assert!(!result.passed);
        assert!(result.failure_reason.unwrap().contains("at least 2"));
    }

    #[test]
    fn test_silent_selection_deterministic() {
        assert_eq!(silent_indices(42, 10, 0.3), silent_indices(42, 10, 0.3));
        assert_eq!(silent_indices(42, 10, 0.3).len(), 3);
        assert!(silent_indices(42, 1, 1.0).is_empty());
    }

    proptest! {
        #[test]
        fn prop_someone_always_talks(seed in any::<u64>(), agents in 0usize..64, fraction in 0.0f64..=1.0) {
            let silent = silent_indices(seed, agents, fraction);
            prop_assert!(silent.len() < agents.max(1));
            prop_assert!(silent.iter().all(|&i| i < agents));
        }
    }
}
