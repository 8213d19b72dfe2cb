//! Scenarios exercised by the simulation harness.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// TW-001: Every agent greets every peer asynchronously
    Broadcast,

    /// TW-002: Greetings delivered inline during the synchronous session
    Synchronous,

    /// TW-003: Some agents never report; every turn hits the deadline
    Stragglers,

    /// TW-004: Two agents rally echoes until the bandwidth ceiling cuts it
    PingPong,

    /// TW-005: One agent leaves each turn; messages to it are dropped
    Departure,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Broadcast,
            ScenarioId::Synchronous,
            ScenarioId::Stragglers,
            ScenarioId::PingPong,
            ScenarioId::Departure,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Broadcast => "broadcast",
            ScenarioId::Synchronous => "synchronous",
            ScenarioId::Stragglers => "stragglers",
            ScenarioId::PingPong => "ping_pong",
            ScenarioId::Departure => "departure",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Broadcast => "All agents broadcast, full delivery, barrier resolves on reports",
            ScenarioId::Synchronous => "Inline greetings in the synchronous session, no mailbox traffic",
            ScenarioId::Stragglers => "A seeded fraction of agents stays silent, turns time out",
            ScenarioId::PingPong => "Runaway echo rally stopped by the per-sender bandwidth ceiling",
            ScenarioId::Departure => "Agents leave between turns, stale recipients are dropped",
        }
    }

    /// Minimum population the scenario can run with.
    pub fn min_agents(&self) -> usize {
        match self {
            ScenarioId::PingPong | ScenarioId::Departure => 2,
            _ => 1,
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "broadcast" | "tw-001" => Ok(ScenarioId::Broadcast),
            "synchronous" | "sync" | "tw-002" => Ok(ScenarioId::Synchronous),
            "stragglers" | "tw-003" => Ok(ScenarioId::Stragglers),
            "ping_pong" | "pingpong" | "tw-004" => Ok(ScenarioId::PingPong),
            "departure" | "tw-005" => Ok(ScenarioId::Departure),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
