//! Runtime configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use turnwise_env::RuntimeError;

/// Configuration for a scheduler run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Number of outer iterations
    pub iterations: usize,

    /// Turns per iteration
    pub turns: usize,

    /// Wall-clock bound on each turn's completion barrier
    #[serde(rename = "turn_timeout_ms", with = "duration_ms")]
    pub turn_timeout: Duration,

    /// Maximum asynchronous deliveries accepted per sender per turn
    /// (None = unlimited)
    pub bandwidth: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            iterations: 1,
            turns: 1,
            turn_timeout: Duration::from_secs(1),
            bandwidth: None,
        }
    }
}

impl RuntimeConfig {
    /// Creates a configuration with the given loop shape and timeout.
    pub fn new(iterations: usize, turns: usize, turn_timeout: Duration) -> Self {
        Self {
            iterations,
            turns,
            turn_timeout,
            bandwidth: None,
        }
    }

    /// Sets the iteration count.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Sets the turns per iteration.
    pub fn with_turns(mut self, turns: usize) -> Self {
        self.turns = turns;
        self
    }

    /// Sets the per-turn timeout.
    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = timeout;
        self
    }

    /// Sets the per-sender asynchronous message ceiling.
    pub fn with_bandwidth(mut self, ceiling: usize) -> Self {
        self.bandwidth = Some(ceiling);
        self
    }

    /// Parses a configuration from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, RuntimeError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RuntimeError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.iterations == 0 {
            return Err(RuntimeError::invalid_config("iterations must be at least 1"));
        }
        if self.turns == 0 {
            return Err(RuntimeError::invalid_config("turns must be at least 1"));
        }
        if self.turn_timeout.is_zero() {
            return Err(RuntimeError::invalid_config("turn timeout must be non-zero"));
        }
        if self.bandwidth == Some(0) {
            return Err(RuntimeError::invalid_config("bandwidth ceiling must be at least 1"));
        }
        Ok(())
    }

    /// Total number of turns the run will execute.
    pub fn total_turns(&self) -> usize {
        self.iterations * self.turns
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
