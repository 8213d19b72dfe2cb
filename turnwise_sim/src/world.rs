//! SimWorld - the turn logic that drives counter agents through a scenario.

use crate::agent::CounterAgent;
use crate::scenarios::ScenarioId;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use turnwise_core::{Agent, AgentId, Registry, TurnLogic};

/// Turn logic for one scenario run.
pub struct SimWorld {
    scenario: ScenarioId,

    /// Agents removed so far (departure scenario)
    departed: Vec<AgentId>,

    turns_started: usize,
}

impl SimWorld {
    pub fn new(scenario: ScenarioId) -> Self {
        Self {
            scenario,
            departed: Vec::new(),
            turns_started: 0,
        }
    }

    pub fn scenario(&self) -> ScenarioId {
        self.scenario
    }

    /// IDs removed by the departure scenario, in removal order.
    pub fn departed(&self) -> &[AgentId] {
        &self.departed
    }

    /// Lowest-ID agents first, so the same seed always picks the same actors.
    fn sorted_agents(registry: &Registry<CounterAgent>) -> Vec<Arc<CounterAgent>> {
        let mut agents = registry.agents();
        agents.sort_by_key(|agent| agent.id());
        agents
    }
}

#[async_trait]
impl TurnLogic<CounterAgent> for SimWorld {
    async fn run_start_of_turn(&mut self, registry: &mut Registry<CounterAgent>, _iteration: usize, _turn: usize) {
        // The first turn of the run keeps everyone.
        if self.scenario == ScenarioId::Departure && self.turns_started > 0 && registry.len() > 1 {
            if let Some(leaving) = Self::sorted_agents(registry).first().map(|a| a.id()) {
                if let Ok(Some(_)) = registry.remove(leaving) {
                    debug!(agent = %leaving, "Agent departed");
                    self.departed.push(leaving);
                }
            }
        }
        self.turns_started += 1;

        let goal = registry.len().saturating_sub(1);
        for agent in registry.agents() {
            agent.begin_turn(goal);
        }
    }

    async fn run_turn(&mut self, registry: &Registry<CounterAgent>, _iteration: usize, _turn: usize) {
        match self.scenario {
            ScenarioId::Broadcast | ScenarioId::Stragglers => {
                for agent in registry.agents() {
                    agent.greet();
                }
            }
            ScenarioId::Synchronous => {
                registry.run_synchronous_messaging_session();
            }
            ScenarioId::PingPong => {
                let agents = Self::sorted_agents(registry);
                if let [server, receiver, ..] = agents.as_slice() {
                    server.serve(receiver.id());
                }
            }
            ScenarioId::Departure => {
                let agents = Self::sorted_agents(registry);
                if let Some(first) = agents.first() {
                    for gone in &self.departed {
                        first.greet_one(*gone);
                    }
                }
                for agent in &agents {
                    agent.greet();
                }
            }
        }
    }
}
