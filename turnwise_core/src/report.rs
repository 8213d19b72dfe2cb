//! Per-turn and per-run reports produced by the scheduler.

use crate::barrier::{BarrierOutcome, BarrierResult};
use crate::diagnostics::DiagnosticsSnapshot;

use serde::{Deserialize, Serialize};

/// What happened in a single turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReport {
    /// 1-based iteration number
    pub iteration: usize,

    /// 1-based turn number within the iteration
    pub turn: usize,

    /// How the completion barrier resolved
    pub outcome: BarrierOutcome,

    /// Time the barrier took to resolve, measured from the window opening
    pub barrier_elapsed_ms: u64,

    /// Delivery counters captured before the reset
    pub diagnostics: DiagnosticsSnapshot,
}

impl TurnReport {
    pub fn new(iteration: usize, turn: usize, barrier: &BarrierResult, diagnostics: DiagnosticsSnapshot) -> Self {
        Self {
            iteration,
            turn,
            outcome: barrier.outcome,
            barrier_elapsed_ms: barrier.elapsed.as_millis() as u64,
            diagnostics,
        }
    }

    pub fn timed_out(&self) -> bool {
        self.outcome == BarrierOutcome::TimedOut
    }
}

/// Ordered turn reports for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub turns: Vec<TurnReport>,
}

impl RunSummary {
    pub fn push(&mut self, report: TurnReport) {
        self.turns.push(report);
    }

    /// Looks up a turn by its 1-based coordinates.
    pub fn turn(&self, iteration: usize, turn: usize) -> Option<&TurnReport> {
        self.turns
            .iter()
            .find(|r| r.iteration == iteration && r.turn == turn)
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn total_sent(&self) -> usize {
        self.turns.iter().map(|r| r.diagnostics.sent).sum()
    }

    pub fn total_succeeded(&self) -> usize {
        self.turns.iter().map(|r| r.diagnostics.succeeded).sum()
    }

    pub fn total_dropped(&self) -> usize {
        self.turns.iter().map(|r| r.diagnostics.dropped).sum()
    }

    /// Number of turns whose barrier hit the deadline.
    pub fn timed_out_turns(&self) -> usize {
        self.turns.iter().filter(|r| r.timed_out()).count()
    }

    /// Overall delivery success rate; 100 when nothing was sent.
    pub fn success_rate_percent(&self) -> f64 {
        let sent = self.total_sent();
        if sent == 0 {
            return 100.0;
        }
        100.0 * self.total_succeeded() as f64 / sent as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticsEngine;
    use std::time::Duration;

    fn report(iteration: usize, turn: usize, outcome: BarrierOutcome, sent: usize, ok: usize) -> TurnReport {
        let mut engine = DiagnosticsEngine::new();
        for i in 0..sent {
            engine.report_send_status(i < ok);
        }
        let barrier = BarrierResult {
            outcome,
            reported: 0,
            elapsed: Duration::from_millis(12),
        };
        TurnReport::new(iteration, turn, &barrier, engine.snapshot(3))
    }

    #[test]
    fn test_summary_totals() {
        let mut summary = RunSummary::default();
        summary.push(report(1, 1, BarrierOutcome::AllReported, 6, 6));
        summary.push(report(1, 2, BarrierOutcome::TimedOut, 4, 1));

        assert_eq!(summary.len(), 2);
        assert_eq!(summary.total_sent(), 10);
        assert_eq!(summary.total_succeeded(), 7);
        assert_eq!(summary.total_dropped(), 3);
        assert_eq!(summary.timed_out_turns(), 1);
        assert!((summary.success_rate_percent() - 70.0).abs() < 1e-9);
        assert_eq!(summary.turn(1, 2).map(|r| r.barrier_elapsed_ms), Some(12));
        assert!(summary.turn(2, 1).is_none());
    }

    #[test]
    fn test_report_serializes_outcome_snake_case() {
        let json = serde_json::to_string(&report(1, 1, BarrierOutcome::TimedOut, 0, 0)).unwrap();
        assert!(json.contains("\"outcome\":\"timed_out\""));
    }
}
