//! End-to-end turn cycles through the public scheduler API.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use turnwise_core::{
    Agent, AgentGeneratorCountPair, AgentId, BarrierOutcome, BaseAgent, BaseMessage, Message,
    MessageRef, Messenger, Registry, RuntimeConfig, RuntimeError, Scheduler, TurnLogic,
};

struct Node {
    base: BaseAgent<Node>,
    inbox: Mutex<Vec<(AgentId, u64)>>,
    sync_seen: AtomicUsize,
    refreshed: AtomicUsize,
}

impl Node {
    fn new(messenger: Messenger<Node>) -> Self {
        Self {
            base: BaseAgent::new(messenger),
            inbox: Mutex::new(Vec::new()),
            sync_seen: AtomicUsize::new(0),
            refreshed: AtomicUsize::new(0),
        }
    }

    fn tag(&self, seq: u64) -> MessageRef<Node> {
        Arc::new(Tag {
            header: self.base.create_base_message(),
            seq,
            synchronous: false,
        })
    }

    fn sync_tag(&self) -> MessageRef<Node> {
        Arc::new(Tag {
            header: self.base.create_base_message(),
            seq: 0,
            synchronous: true,
        })
    }

    fn inbox(&self) -> Vec<(AgentId, u64)> {
        self.inbox.lock().unwrap().clone()
    }
}

impl Agent for Node {
    fn id(&self) -> AgentId {
        self.base.id()
    }

    fn refresh_internal_state(&self) {
        self.refreshed.fetch_add(1, Ordering::SeqCst);
    }

    fn run_synchronous_messaging(&self) {
        self.base.broadcast_synchronous_message(self.sync_tag());
    }
}

struct Tag {
    header: BaseMessage,
    seq: u64,
    synchronous: bool,
}

impl Message<Node> for Tag {
    fn sender(&self) -> AgentId {
        self.header.sender()
    }

    fn dispatch(&self, recipient: &Node) {
        if self.synchronous {
            recipient.sync_seen.fetch_add(1, Ordering::SeqCst);
        } else {
            recipient.inbox.lock().unwrap().push((self.header.sender(), self.seq));
        }
    }
}

fn nodes(count: usize) -> Vec<AgentGeneratorCountPair<Node>> {
    vec![AgentGeneratorCountPair::new(Node::new, count)]
}

fn config(iterations: usize, turns: usize, timeout_ms: u64) -> RuntimeConfig {
    RuntimeConfig::new(iterations, turns, Duration::from_millis(timeout_ms))
}

/// Every agent broadcasts once, then reports.
struct BroadcastAndReport;

#[async_trait]
impl TurnLogic<Node> for BroadcastAndReport {
    async fn run_turn(&mut self, registry: &Registry<Node>, _iteration: usize, turn: usize) {
        for node in registry.agents() {
            node.base.broadcast_message(node.tag(turn as u64));
            node.base.signal_messaging_complete();
        }
    }
}

#[tokio::test]
async fn broadcast_turns_complete_with_full_delivery() {
    let mut scheduler = Scheduler::new(config(1, 2, 500), nodes(3))
        .unwrap()
        .with_turn_logic(BroadcastAndReport);

    let summary = scheduler.run().await.unwrap();

    assert_eq!(summary.len(), 2);
    for report in &summary.turns {
        assert_eq!(report.outcome, BarrierOutcome::AllReported);
        assert_eq!(report.diagnostics.sent, 6);
        assert_eq!(report.diagnostics.succeeded, 6);
        assert_eq!(report.diagnostics.end_messaging_reports, 3);
        assert_eq!(report.diagnostics.total_agents, 3);
    }
    assert_eq!(summary.timed_out_turns(), 0);
}

/// Only the first `reporters` agents (by sorted ID) report.
struct PartialReport {
    reporters: usize,
}

#[async_trait]
impl TurnLogic<Node> for PartialReport {
    async fn run_turn(&mut self, registry: &Registry<Node>, _iteration: usize, _turn: usize) {
        let mut agents = registry.agents();
        agents.sort_by_key(|node| node.id());
        for node in agents.iter().take(self.reporters) {
            node.base.signal_messaging_complete();
        }
    }
}

#[tokio::test]
async fn stragglers_time_out_the_turn() {
    let mut scheduler = Scheduler::new(config(1, 1, 50), nodes(5))
        .unwrap()
        .with_turn_logic(PartialReport { reporters: 2 });

    let summary = scheduler.run().await.unwrap();
    let report = summary.turn(1, 1).unwrap();

    assert_eq!(report.outcome, BarrierOutcome::TimedOut);
    assert_eq!(report.diagnostics.end_messaging_reports, 2);
    assert!(report.barrier_elapsed_ms >= 50);
}

/// Every agent reports, then the turn keeps running past the timeout.
struct ReportThenStall {
    stall: Duration,
}

#[async_trait]
impl TurnLogic<Node> for ReportThenStall {
    async fn run_turn(&mut self, registry: &Registry<Node>, _iteration: usize, _turn: usize) {
        for node in registry.agents() {
            node.base.signal_messaging_complete();
        }
        tokio::time::sleep(self.stall).await;
    }
}

#[tokio::test]
async fn reports_sent_in_time_count_when_turn_overruns() {
    let mut scheduler = Scheduler::new(config(1, 1, 50), nodes(3))
        .unwrap()
        .with_turn_logic(ReportThenStall {
            stall: Duration::from_millis(80),
        });

    let summary = scheduler.run().await.unwrap();
    let report = summary.turn(1, 1).unwrap();

    assert_eq!(report.outcome, BarrierOutcome::AllReported);
    assert_eq!(report.diagnostics.end_messaging_reports, 3);
    assert_eq!(summary.timed_out_turns(), 0);
}

#[tokio::test]
async fn empty_population_resolves_immediately() {
    let mut scheduler = Scheduler::new(config(2, 2, 5_000), nodes(0))
        .unwrap()
        .with_turn_logic(BroadcastAndReport);

    let summary = scheduler.run().await.unwrap();

    assert_eq!(summary.len(), 4);
    assert!(summary.turns.iter().all(|r| r.outcome == BarrierOutcome::AllReported));
    assert!(summary.turns.iter().all(|r| r.barrier_elapsed_ms < 1_000));
}

#[tokio::test]
async fn run_without_turn_logic_is_rejected() {
    let mut scheduler = Scheduler::new(config(1, 1, 50), nodes(2)).unwrap();
    assert_eq!(scheduler.run().await.unwrap_err(), RuntimeError::MissingTurnLogic);
}

/// Removes one agent before turn 2, then has a survivor message it.
struct Departure {
    departed: Option<AgentId>,
}

#[async_trait]
impl TurnLogic<Node> for Departure {
    async fn run_start_of_turn(&mut self, registry: &mut Registry<Node>, _iteration: usize, turn: usize) {
        if turn == 2 {
            let mut ids: Vec<_> = registry.view_ids().into_iter().collect();
            ids.sort();
            let gone = ids[0];
            assert!(registry.remove(gone).unwrap().is_some());
            self.departed = Some(gone);
        }
    }

    async fn run_turn(&mut self, registry: &Registry<Node>, _iteration: usize, turn: usize) {
        for node in registry.agents() {
            if let Some(gone) = self.departed {
                node.base.send_message(node.tag(turn as u64), gone);
            }
            node.base.signal_messaging_complete();
        }
    }
}

#[tokio::test]
async fn sends_to_departed_agent_are_dropped() {
    let mut scheduler = Scheduler::new(config(1, 2, 500), nodes(3))
        .unwrap()
        .with_turn_logic(Departure { departed: None });

    let summary = scheduler.run().await.unwrap();
    let second = summary.turn(1, 2).unwrap();

    assert_eq!(second.outcome, BarrierOutcome::AllReported);
    assert_eq!(second.diagnostics.total_agents, 2);
    assert_eq!(second.diagnostics.sent, 2);
    assert_eq!(second.diagnostics.dropped, 2);
    assert_eq!(second.diagnostics.end_messaging_reports, 2);
}

/// First agent streams numbered messages to the second.
struct Stream {
    count: u64,
    pair: Arc<Mutex<Option<(AgentId, AgentId)>>>,
}

#[async_trait]
impl TurnLogic<Node> for Stream {
    async fn run_turn(&mut self, registry: &Registry<Node>, _iteration: usize, _turn: usize) {
        let mut agents = registry.agents();
        agents.sort_by_key(|node| node.id());
        let (from, to) = (&agents[0], &agents[1]);
        *self.pair.lock().unwrap() = Some((from.id(), to.id()));

        for seq in 0..self.count {
            from.base.send_message(from.tag(seq), to.id());
        }
        for node in &agents {
            node.base.signal_messaging_complete();
        }
    }
}

#[tokio::test]
async fn mailbox_preserves_send_order() {
    let pair = Arc::new(Mutex::new(None));
    let mut scheduler = Scheduler::new(config(1, 1, 500), nodes(2))
        .unwrap()
        .with_turn_logic(Stream {
            count: 200,
            pair: pair.clone(),
        });

    // Hold the agents past shutdown to inspect them afterwards.
    let agents = scheduler.registry().agents();
    let summary = scheduler.run().await.unwrap();
    assert_eq!(summary.total_succeeded(), 200);

    let (from, to) = (*pair.lock().unwrap()).unwrap();
    let receiver = agents.iter().find(|node| node.id() == to).unwrap();
    let inbox = receiver.inbox();

    // Shutdown joins the workers, so every queued message has been handled.
    assert_eq!(inbox.len(), 200);
    assert!(inbox.iter().all(|(sender, _)| *sender == from));
    let seqs: Vec<u64> = inbox.iter().map(|(_, seq)| *seq).collect();
    assert_eq!(seqs, (0..200).collect::<Vec<_>>());
}

#[tokio::test]
async fn bandwidth_ceiling_drops_excess_sends() {
    let pair = Arc::new(Mutex::new(None));
    let mut scheduler = Scheduler::new(config(1, 2, 500).with_bandwidth(3), nodes(2))
        .unwrap()
        .with_turn_logic(Stream {
            count: 5,
            pair: pair.clone(),
        });

    let summary = scheduler.run().await.unwrap();

    // Budgets reset each turn.
    for report in &summary.turns {
        assert_eq!(report.diagnostics.sent, 5);
        assert_eq!(report.diagnostics.succeeded, 3);
        assert_eq!(report.diagnostics.dropped, 2);
    }
}

/// Runs the synchronous session, then everybody reports.
struct SyncSession;

#[async_trait]
impl TurnLogic<Node> for SyncSession {
    async fn run_turn(&mut self, registry: &Registry<Node>, _iteration: usize, _turn: usize) {
        registry.run_synchronous_messaging_session();
        for node in registry.agents() {
            // Handled inline, so already visible here.
            assert_eq!(node.sync_seen.load(Ordering::SeqCst), registry.len() - 1);
            node.base.signal_messaging_complete();
        }
    }
}

#[tokio::test]
async fn synchronous_session_delivers_inline() {
    let mut scheduler = Scheduler::new(config(1, 1, 500), nodes(4))
        .unwrap()
        .with_turn_logic(SyncSession);
    let agents = scheduler.registry().agents();

    let summary = scheduler.run().await.unwrap();
    let report = summary.turn(1, 1).unwrap();

    assert_eq!(report.outcome, BarrierOutcome::AllReported);
    assert_eq!(report.diagnostics.sent, 12);
    assert_eq!(report.diagnostics.succeeded, 12);
    assert!(agents.iter().all(|node| node.refreshed.load(Ordering::SeqCst) == 1));
}

/// Counts hook invocations in order.
struct HookTrace {
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl TurnLogic<Node> for HookTrace {
    async fn run_start_of_iteration(&mut self, _registry: &mut Registry<Node>, iteration: usize) {
        self.log.lock().unwrap().push(format!("iter-start {}", iteration));
    }

    async fn run_start_of_turn(&mut self, registry: &mut Registry<Node>, iteration: usize, turn: usize) {
        assert!(!registry.is_window_open());
        self.log.lock().unwrap().push(format!("turn-start {}.{}", iteration, turn));
    }

    async fn run_turn(&mut self, registry: &Registry<Node>, iteration: usize, turn: usize) {
        assert!(registry.is_window_open());
        self.log.lock().unwrap().push(format!("turn {}.{}", iteration, turn));
        for node in registry.agents() {
            node.base.signal_messaging_complete();
        }
    }

    async fn run_end_of_iteration(&mut self, _registry: &mut Registry<Node>, iteration: usize) {
        self.log.lock().unwrap().push(format!("iter-end {}", iteration));
    }
}

#[tokio::test]
async fn hooks_run_in_loop_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = Scheduler::new(config(2, 2, 500), nodes(2))
        .unwrap()
        .with_turn_logic(HookTrace { log: log.clone() });

    scheduler.run().await.unwrap();

    let expected = vec![
        "iter-start 1",
        "turn-start 1.1",
        "turn 1.1",
        "turn-start 1.2",
        "turn 1.2",
        "iter-end 1",
        "iter-start 2",
        "turn-start 2.1",
        "turn 2.1",
        "turn-start 2.2",
        "turn 2.2",
        "iter-end 2",
    ];
    assert_eq!(*log.lock().unwrap(), expected);
}
