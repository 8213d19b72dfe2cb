//! Turnwise Diagnostics Module
//! ===========================
//!
//! Per-turn tallies of message delivery outcomes:
//! - **Sent**: every attempted delivery (one per recipient)
//! - **Succeeded**: deliveries that were queued or dispatched
//! - **End-messaging reports**: distinct agents that reported completion
//!   before the turn's barrier resolved
//!
//! Counters are reset at every turn boundary; the scheduler captures a
//! [`DiagnosticsSnapshot`] first.

use serde::{Deserialize, Serialize};

/// Running counters for the current turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticsEngine {
    sent: usize,
    succeeded: usize,
    end_messaging_reports: usize,
}

impl DiagnosticsEngine {
    /// Creates an engine with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of one delivery attempt.
    pub fn report_send_status(&mut self, success: bool) {
        self.sent += 1;
        if success {
            self.succeeded += 1;
        }
    }

    /// Records how many distinct agents reported completion this turn.
    pub fn report_end_messaging_status(&mut self, reports: usize) {
        self.end_messaging_reports = reports;
    }

    /// Zeroes all counters for the next turn.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn sent(&self) -> usize {
        self.sent
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn end_messaging_reports(&self) -> usize {
        self.end_messaging_reports
    }

    // =========================================================================
    // DERIVED METRICS
    // =========================================================================

    /// Deliveries that were attempted but not completed.
    pub fn drop_count(&self) -> usize {
        self.sent - self.succeeded
    }

    /// Percentage of attempted deliveries that succeeded.
    ///
    /// With nothing sent the turn is vacuously perfect and this returns 100.
    pub fn success_rate_percent(&self) -> f64 {
        if self.sent == 0 {
            return 100.0;
        }
        100.0 * self.succeeded as f64 / self.sent as f64
    }

    /// Percentage of `total_agents` that reported completion.
    ///
    /// Returns 100 for an empty population.
    pub fn end_messaging_rate_percent(&self, total_agents: usize) -> f64 {
        if total_agents == 0 {
            return 100.0;
        }
        100.0 * self.end_messaging_reports as f64 / total_agents as f64
    }

    /// Captures the counters and derived rates.
    pub fn snapshot(&self, total_agents: usize) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            sent: self.sent,
            succeeded: self.succeeded,
            dropped: self.drop_count(),
            end_messaging_reports: self.end_messaging_reports,
            total_agents,
            success_rate_percent: self.success_rate_percent(),
            end_messaging_rate_percent: self.end_messaging_rate_percent(total_agents),
        }
    }
}

/// Immutable copy of one turn's diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsSnapshot {
    pub sent: usize,
    pub succeeded: usize,
    pub dropped: usize,
    pub end_messaging_reports: usize,
    /// Registered agents when the barrier resolved
    pub total_agents: usize,
    pub success_rate_percent: f64,
    pub end_messaging_rate_percent: f64,
}

// =============================================================================
// TESTS
// =============================================================================
