//! Shared fixtures for unit tests.

use crate::base_agent::{BaseAgent, BaseMessage};
use crate::messenger::Messenger;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use turnwise_env::{Agent, AgentId, Message, MessageRef};

/// Agent that logs every ping it receives and reports completion once it
/// has received `goal` of them.
pub(crate) struct TestAgent {
    base: BaseAgent<TestAgent>,
    goal: usize,
    received: AtomicUsize,
    log: Mutex<Vec<(AgentId, u64)>>,
}

impl TestAgent {
    pub(crate) fn new(id: AgentId, messenger: Messenger<TestAgent>, goal: usize) -> Self {
        Self {
            base: BaseAgent::with_id(id, messenger),
            goal,
            received: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn detached(id: AgentId, goal: usize) -> Self {
        Self::new(id, Messenger::detached(), goal)
    }

    pub(crate) fn base(&self) -> &BaseAgent<TestAgent> {
        &self.base
    }

    pub(crate) fn received(&self) -> usize {
        self.received.load(Ordering::Acquire)
    }

    pub(crate) fn received_log(&self) -> Vec<(AgentId, u64)> {
        self.log.lock().unwrap().clone()
    }

    fn handle_ping(&self, msg: &PingMessage) {
        self.log.lock().unwrap().push((msg.header.sender(), msg.seq));
        let count = self.received.fetch_add(1, Ordering::AcqRel) + 1;
        if count == self.goal {
            self.base.signal_messaging_complete();
        }
    }
}

impl fmt::Debug for TestAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestAgent")
            .field("id", &self.base.id())
            .field("goal", &self.goal)
            .field("received", &self.received())
            .finish()
    }
}

impl Agent for TestAgent {
    fn id(&self) -> AgentId {
        self.base.id()
    }
}

pub(crate) struct PingMessage {
    header: BaseMessage,
    seq: u64,
}

impl Message<TestAgent> for PingMessage {
    fn sender(&self) -> AgentId {
        self.header.sender()
    }

    fn dispatch(&self, recipient: &TestAgent) {
        recipient.handle_ping(self);
    }
}

pub(crate) fn ping(sender: AgentId, seq: u64) -> MessageRef<TestAgent> {
    Arc::new(PingMessage {
        header: BaseMessage::new(sender),
        seq,
    })
}

/// Polls `condition` for up to two seconds.
pub(crate) async fn wait_until(condition: impl Fn() -> bool) -> bool {
    for _ in 0..400 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
