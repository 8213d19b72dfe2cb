//! JSON exporter for scenario runs.
//!
//! Writes every turn report of a run so it can be inspected or diffed
//! between seeds.

use crate::runner::ScenarioResult;

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use turnwise_core::{RuntimeConfig, TurnReport};

/// Complete run export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Agents at the start of the run
    pub agents: usize,

    /// Agents that never reported
    pub silent_agents: usize,

    /// Scheduler configuration
    pub config: RuntimeConfig,

    /// All turn reports, in order
    pub turns: Vec<TurnReport>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl RunExport {
    /// Captures a finished scenario.
    pub fn from_result(result: &ScenarioResult) -> Self {
        Self {
            scenario: result.scenario.name().to_string(),
            seed: result.seed,
            agents: result.agents,
            silent_agents: result.silent_agents,
            config: result.config.clone(),
            turns: result.summary.turns.clone(),
            passed: result.passed,
            failure_reason: result.failure_reason.clone(),
        }
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Reads an export back from a JSON file.
    pub fn read_from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ScenarioRunner;
    use crate::scenarios::ScenarioId;
    use std::time::Duration;

    #[test]
    fn test_export_written_and_read_back() {
        let result = ScenarioRunner::new(3, 3)
            .with_turns(2)
            .with_timeout(Duration::from_millis(100))
            .run(ScenarioId::Broadcast);
        let export = RunExport::from_result(&result);

        let path = std::env::temp_dir().join(format!("turnwise-export-{}.json", std::process::id()));
        export.write_to_file(&path).unwrap();
        let read = RunExport::read_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(read.scenario, "broadcast");
        assert_eq!(read.turns.len(), 2);
        assert_eq!(read.turns, export.turns);
        assert_eq!(read.config.turn_timeout, Duration::from_millis(100));
        assert!(read.passed);
        assert!(read.failure_reason.is_none());
    }
}
