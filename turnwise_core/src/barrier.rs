//! Completion Barrier - per-turn collector of "finished messaging" reports.
//!
//! # State Machine
//!
//! ```text
//!   open()            wait()                        terminal
//!  ┌──────┐  ┌──────────────────────┐   all N IDs   ┌──────────────┐
//!  │ INIT ├─►│ OPEN / CLOSING       ├──────────────►│ ALL_REPORTED │
//!  └──────┘  │ collect distinct IDs │   deadline    ├──────────────┤
//!            │ until N or deadline  ├──────────────►│  TIMED_OUT   │
//!            └──────────────────────┘               └──────────────┘
//! ```
//!
//! The deadline is fixed when the barrier is opened, so `wait` never blocks
//! past `open + timeout`. A report counts if it was sent before the barrier
//! resolved, even when `wait` is first polled after the deadline. On either
//! terminal state the completion channel is closed and the done-broadcast
//! fires; reporters never block, and reports arriving afterwards are
//! discarded.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::trace;
use turnwise_env::AgentId;

/// How a turn's barrier resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierOutcome {
    /// Every registered agent reported before the deadline.
    AllReported,
    /// The deadline fired with only a partial set of reports.
    TimedOut,
}

impl BarrierOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BarrierOutcome::AllReported)
    }
}

/// Result of waiting on a barrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarrierResult {
    pub outcome: BarrierOutcome,

    /// Distinct expected IDs that reported
    pub reported: usize,

    /// Time from `open` to resolution
    pub elapsed: Duration,
}

/// Collector half of a turn's completion barrier.
pub struct CompletionBarrier {
    rx: mpsc::UnboundedReceiver<AgentId>,
    done_tx: watch::Sender<bool>,
    opened_at: Instant,
    deadline: Instant,
}

/// Reporting half, handed to the messaging window for the turn.
#[derive(Debug, Clone)]
pub struct CompletionReporter {
    tx: mpsc::UnboundedSender<AgentId>,
    done_rx: watch::Receiver<bool>,
}

impl CompletionBarrier {
    /// Allocates a fresh barrier whose deadline is `timeout` from now.
    pub fn open(timeout: Duration) -> (Self, CompletionReporter) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = watch::channel(false);
        let opened_at = Instant::now();

        let barrier = Self {
            rx,
            done_tx,
            opened_at,
            deadline: opened_at + timeout,
        };
        (barrier, CompletionReporter { tx, done_rx })
    }

    /// Collects reports until every ID in `expected` has reported or the
    /// deadline passes. IDs outside `expected` and repeats are ignored.
    ///
    /// Reports already queued when the deadline fires still count, so a
    /// caller that starts waiting late loses nothing sent in time.
    pub async fn wait(mut self, expected: &HashSet<AgentId>) -> BarrierResult {
        let mut reported: HashSet<AgentId> = HashSet::with_capacity(expected.len());

        while reported.len() < expected.len() {
            tokio::select! {
                biased;

                _ = sleep_until(self.deadline) => break,
                received = self.rx.recv() => match received {
                    Some(id) => record(expected, &mut reported, id),
                    None => {
                        // Every reporter is gone; nothing more can arrive.
                        sleep_until(self.deadline).await;
                        break;
                    }
                },
            }
        }

        self.drain_queued(expected, &mut reported);
        self.rx.close();
        self.done_tx.send_replace(true);

        let outcome = if reported.len() >= expected.len() {
            BarrierOutcome::AllReported
        } else {
            BarrierOutcome::TimedOut
        };
        BarrierResult {
            outcome,
            reported: reported.len(),
            elapsed: self.opened_at.elapsed(),
        }
    }

    /// Takes whatever is already in the channel without waiting.
    fn drain_queued(&mut self, expected: &HashSet<AgentId>, reported: &mut HashSet<AgentId>) {
        while reported.len() < expected.len() {
            match self.rx.try_recv() {
                Ok(id) => record(expected, reported, id),
                Err(_) => break,
            }
        }
    }
}

fn record(expected: &HashSet<AgentId>, reported: &mut HashSet<AgentId>, id: AgentId) {
    if !expected.contains(&id) {
        trace!(agent = %id, "Ignoring report from unregistered agent");
    } else if reported.insert(id) {
        trace!(agent = %id, "Agent finished messaging");
    }
}

impl CompletionReporter {
    /// Reports that `id` has finished messaging. Never blocks; a no-op once
    /// the barrier has resolved.
    pub fn report(&self, id: AgentId) {
        if self.tx.send(id).is_err() {
            trace!(agent = %id, "Late completion report discarded");
        }
    }

    /// Returns true once the barrier has resolved.
    pub fn is_closed(&self) -> bool {
        *self.done_rx.borrow()
    }

    /// Waits for the done-broadcast.
    pub async fn closed(&self) {
        let mut done = self.done_rx.clone();
        while !*done.borrow_and_update() {
            if done.changed().await.is_err() {
                // Barrier dropped without resolving; treat as closed.
                return;
            }
        }
    }
}
