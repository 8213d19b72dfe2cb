//! CounterAgent - the demo agent every scenario runs.
//!
//! A counter agent greets its peers, counts the greetings it receives and
//! reports completion once it has heard from every peer. Silent agents do
//! the same work but never report, which holds the barrier until its
//! deadline.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use turnwise_core::{BaseAgent, BaseMessage, Messenger};
use turnwise_env::{Agent, AgentId, Message, MessageRef};

/// A simulated agent driven by the scenario logic.
pub struct CounterAgent {
    base: BaseAgent<CounterAgent>,

    /// Never reports completion when set
    silent: bool,

    /// Greetings needed this turn before reporting
    goal: AtomicUsize,

    /// Greetings received this turn
    received: AtomicUsize,

    /// Greetings received over the whole run
    total_received: AtomicUsize,

    /// Echo volleys handled over the whole run
    echoes: AtomicU64,

    /// Guards against reporting twice in one turn
    reported: AtomicBool,

    /// Number of times the runtime refreshed this agent
    refreshes: AtomicUsize,
}

impl CounterAgent {
    /// Creates an agent with the given identity.
    ///
    /// # Arguments
    /// * `id` - Agent identity (seeded for reproducible runs)
    /// * `messenger` - Handle onto the registry
    /// * `silent` - Whether the agent withholds its completion report
    pub fn new(id: AgentId, messenger: Messenger<CounterAgent>, silent: bool) -> Self {
        Self {
            base: BaseAgent::with_id(id, messenger),
            silent,
            goal: AtomicUsize::new(0),
            received: AtomicUsize::new(0),
            total_received: AtomicUsize::new(0),
            echoes: AtomicU64::new(0),
            reported: AtomicBool::new(false),
            refreshes: AtomicUsize::new(0),
        }
    }

    pub fn base(&self) -> &BaseAgent<CounterAgent> {
        &self.base
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn received_this_turn(&self) -> usize {
        self.received.load(Ordering::Acquire)
    }

    pub fn total_received(&self) -> usize {
        self.total_received.load(Ordering::Acquire)
    }

    pub fn echoes(&self) -> u64 {
        self.echoes.load(Ordering::Acquire)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::Acquire)
    }

    /// Prepares the agent for a new turn. Called while the window is closed.
    pub fn begin_turn(&self, goal: usize) {
        self.goal.store(goal, Ordering::Release);
        self.received.store(0, Ordering::Release);
        self.reported.store(false, Ordering::Release);
    }

    /// Greets every peer asynchronously.
    ///
    /// With no peers to wait for, reports straight away.
    pub fn greet(&self) {
        self.base.broadcast_message(self.greeting());
        if self.goal.load(Ordering::Acquire) == 0 {
            self.report();
        }
    }

    /// Greets `recipient` directly, whether or not it is still registered.
    pub fn greet_one(&self, recipient: AgentId) {
        self.base.send_message(self.greeting(), recipient);
    }

    /// Starts an echo rally with `recipient`.
    pub fn serve(&self, recipient: AgentId) {
        self.base.send_message(self.echo(0), recipient);
    }

    fn greeting(&self) -> MessageRef<CounterAgent> {
        Arc::new(GreetingMessage {
            header: self.base.create_base_message(),
        })
    }

    fn echo(&self, volley: u64) -> MessageRef<CounterAgent> {
        Arc::new(EchoMessage {
            header: self.base.create_base_message(),
            volley,
        })
    }

    fn report(&self) {
        if self.silent || self.reported.swap(true, Ordering::AcqRel) {
            return;
        }
        self.base.signal_messaging_complete();
    }

    fn handle_greeting(&self) {
        self.total_received.fetch_add(1, Ordering::AcqRel);
        let count = self.received.fetch_add(1, Ordering::AcqRel) + 1;
        if count >= self.goal.load(Ordering::Acquire) {
            self.report();
        }
    }

    fn handle_echo(&self, msg: &EchoMessage) {
        self.echoes.fetch_add(1, Ordering::AcqRel);
        self.base.send_message(self.echo(msg.volley + 1), msg.header.sender());
    }
}

impl Agent for CounterAgent {
    fn id(&self) -> AgentId {
        self.base.id()
    }

    fn refresh_internal_state(&self) {
        self.refreshes.fetch_add(1, Ordering::AcqRel);
    }

    fn run_synchronous_messaging(&self) {
        self.base.broadcast_synchronous_message(self.greeting());
    }
}

/// Increments the recipient's greeting counter.
pub struct GreetingMessage {
    header: BaseMessage,
}

impl Message<CounterAgent> for GreetingMessage {
    fn sender(&self) -> AgentId {
        self.header.sender()
    }

    fn dispatch(&self, recipient: &CounterAgent) {
        recipient.handle_greeting();
    }
}

/// Answered by sending another echo back, indefinitely.
pub struct EchoMessage {
    header: BaseMessage,
    volley: u64,
}

impl EchoMessage {
    pub fn volley(&self) -> u64 {
        self.volley
    }
}

impl Message<CounterAgent> for EchoMessage {
    fn sender(&self) -> AgentId {
        self.header.sender()
    }

    fn dispatch(&self, recipient: &CounterAgent) {
        recipient.handle_echo(self);
    }
}
