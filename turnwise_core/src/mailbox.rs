//! Per-agent mailbox and its dedicated worker.
//!
//! Each registered agent owns one unbounded FIFO queue. A dedicated OS
//! thread is the queue's only consumer, so asynchronous messages for one
//! agent are handled strictly one at a time and in enqueue order. Handlers
//! are plain synchronous code and may block (long computations, sleeps)
//! without starving the scheduler.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;
use tracing::trace;
use turnwise_env::{Agent, AgentId, DeliveryError, MessageRef};

/// Sending half of an agent's mailbox plus its per-turn send counter.
pub(crate) struct Mailbox<A: Agent> {
    owner: AgentId,
    tx: mpsc::UnboundedSender<MessageRef<A>>,

    /// Asynchronous deliveries this agent has sent during the current turn
    sent_this_turn: AtomicUsize,
}

impl<A: Agent> Mailbox<A> {
    /// Creates the mailbox for `agent` and starts its worker thread.
    pub(crate) fn spawn(agent: Arc<A>) -> io::Result<(Self, JoinHandle<()>)> {
        let owner = agent.id();
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = thread::Builder::new()
            .name(format!("turnwise-agent-{}", owner))
            .spawn(move || run_worker(agent, rx))?;

        let mailbox = Self {
            owner,
            tx,
            sent_this_turn: AtomicUsize::new(0),
        };
        Ok((mailbox, worker))
    }

    /// Queues a message for the owning agent.
    pub(crate) fn enqueue(&self, msg: MessageRef<A>) -> Result<(), DeliveryError> {
        self.tx
            .send(msg)
            .map_err(|_| DeliveryError::MailboxClosed(self.owner))
    }

    /// Charges one outgoing delivery against `ceiling`.
    ///
    /// Deliveries beyond the ceiling are refused (drop-newest).
    pub(crate) fn charge_send(&self, ceiling: Option<usize>) -> Result<(), DeliveryError> {
        let Some(limit) = ceiling else {
            return Ok(());
        };
        let previous = self.sent_this_turn.fetch_add(1, Ordering::AcqRel);
        if previous >= limit {
            return Err(DeliveryError::BandwidthExceeded(limit));
        }
        Ok(())
    }

    /// Clears the per-turn send counter.
    pub(crate) fn reset_turn_budget(&self) {
        self.sent_this_turn.store(0, Ordering::Release);
    }
}

/// Drains the mailbox until every sender is dropped.
fn run_worker<A: Agent>(agent: Arc<A>, mut rx: mpsc::UnboundedReceiver<MessageRef<A>>) {
    let id = agent.id();
    trace!(agent = %id, "Mailbox worker started");

    while let Some(msg) = rx.blocking_recv() {
        msg.dispatch(&agent);
    }

    trace!(agent = %id, "Mailbox closed, worker exiting");
}
