//! Delivery paths: asynchronous (mailbox) and synchronous (inline).
//!
//! Every attempted delivery is counted once per recipient. Drops are never
//! surfaced to the sending agent; they are logged and counted as failures.

use crate::barrier::CompletionReporter;
use crate::registry::Shared;

use std::sync::Arc;
use tracing::{debug, trace};
use turnwise_env::{Agent, AgentId, DeliveryError, MessageRef};

impl<A: Agent> Shared<A> {
    /// Queues `msg` into each recipient's mailbox.
    pub(crate) fn send_message(&self, msg: MessageRef<A>, recipients: &[AgentId]) {
        let sender = msg.sender();
        for &recipient in recipients {
            let outcome = self.enqueue(&msg, recipient);
            self.record(sender, recipient, outcome);
        }
    }

    /// Dispatches `msg` inline to each recipient except the sender.
    pub(crate) fn send_synchronous_message(&self, msg: MessageRef<A>, recipients: &[AgentId]) {
        let sender = msg.sender();
        for &recipient in recipients {
            if recipient == sender {
                continue;
            }
            match self.resolve_for_sync(recipient) {
                Ok(agent) => {
                    self.record(sender, recipient, Ok(()));
                    // No locks held: the handler may send in turn.
                    msg.dispatch(&agent);
                }
                Err(reason) => self.record(sender, recipient, Err(reason)),
            }
        }
    }

    pub(crate) fn broadcast_message(&self, msg: MessageRef<A>) {
        let recipients = self.peers_of(msg.sender());
        self.send_message(msg, &recipients);
    }

    pub(crate) fn broadcast_synchronous_message(&self, msg: MessageRef<A>) {
        let recipients = self.peers_of(msg.sender());
        self.send_synchronous_message(msg, &recipients);
    }

    /// Forwards a completion report to the open turn's barrier.
    pub(crate) fn report_finished_messaging(&self, id: AgentId) {
        match &self.window().reporter {
            Some(reporter) => reporter.report(id),
            None => trace!(agent = %id, "Completion reported outside a turn"),
        }
    }

    pub(crate) fn completion_reporter(&self) -> Option<CompletionReporter> {
        self.window().reporter.clone()
    }

    /// Every live ID except `sender`.
    fn peers_of(&self, sender: AgentId) -> Vec<AgentId> {
        self.entries()
            .keys()
            .copied()
            .filter(|id| *id != sender)
            .collect()
    }

    /// Holds the window's read lock across the enqueue so a concurrent
    /// close cannot interleave with it.
    fn enqueue(&self, msg: &MessageRef<A>, recipient: AgentId) -> Result<(), DeliveryError> {
        let window = self.window();
        if !window.open {
            return Err(DeliveryError::WindowClosed);
        }

        let entries = self.entries();
        let target = entries
            .get(&recipient)
            .ok_or(DeliveryError::UnknownRecipient(recipient))?;
        if let Some(origin) = entries.get(&msg.sender()) {
            origin.mailbox.charge_send(self.bandwidth)?;
        }
        target.mailbox.enqueue(msg.clone())
    }

    fn resolve_for_sync(&self, recipient: AgentId) -> Result<Arc<A>, DeliveryError> {
        let window = self.window();
        if !window.open {
            return Err(DeliveryError::WindowClosed);
        }
        self.access_by_id(recipient)
            .ok_or(DeliveryError::UnknownRecipient(recipient))
    }

    fn record(&self, sender: AgentId, recipient: AgentId, outcome: Result<(), DeliveryError>) {
        if let Err(reason) = &outcome {
            debug!(from = %sender, to = %recipient, "Message dropped: {}", reason);
        }
        self.diagnostics().report_send_status(outcome.is_ok());
    }
}
