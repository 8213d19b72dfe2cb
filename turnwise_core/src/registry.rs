//! Agent Registry - owns agent lifetimes, identities and mailboxes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────── Registry ─────────────────────────────┐
//! │  Arc<Shared>                                                      │
//! │   ├─ window: RwLock<MessagingWindow>  (open flag + reporter)      │
//! │   ├─ entries: RwLock<AgentId → { Arc<Agent>, Mailbox }>           │
//! │   └─ diagnostics: Mutex<DiagnosticsEngine>                        │
//! │                                                                   │
//! │  workers: one thread per mailbox, reaped on add/remove/shutdown   │
//! └───────────────────────────────────────────────────────────────────┘
//!          ▲ Weak
//!      Messenger (held by agents: send / broadcast / view IDs / report)
//! ```
//!
//! Lock order is always `window` then `entries`, never the reverse.
//! Mutating operations take `&mut self`; the scheduler only lends `&mut`
//! to hooks that run while the messaging window is closed.

use crate::barrier::CompletionReporter;
use crate::diagnostics::{DiagnosticsEngine, DiagnosticsSnapshot};
use crate::mailbox::Mailbox;
use crate::messenger::Messenger;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::JoinHandle;
use tracing::{debug, warn};
use turnwise_env::{Agent, AgentId, RuntimeError};

/// Gate checked before every send.
#[derive(Default)]
pub(crate) struct MessagingWindow {
    /// Sends are accepted only while open
    pub(crate) open: bool,

    /// Set once at shutdown; the window never reopens
    pub(crate) shut_down: bool,

    /// Completion reporter for the turn in progress
    pub(crate) reporter: Option<CompletionReporter>,
}

/// A registered agent and its mailbox.
pub(crate) struct AgentEntry<A: Agent> {
    pub(crate) agent: Arc<A>,
    pub(crate) mailbox: Mailbox<A>,
}

/// State shared between the registry and every messenger.
pub(crate) struct Shared<A: Agent> {
    pub(crate) window: RwLock<MessagingWindow>,
    pub(crate) entries: RwLock<HashMap<AgentId, AgentEntry<A>>>,
    pub(crate) diagnostics: Mutex<DiagnosticsEngine>,
    pub(crate) bandwidth: Option<usize>,
}

impl<A: Agent> Shared<A> {
    pub(crate) fn window(&self) -> RwLockReadGuard<'_, MessagingWindow> {
        self.window.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn window_mut(&self) -> RwLockWriteGuard<'_, MessagingWindow> {
        self.window.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn entries(&self) -> RwLockReadGuard<'_, HashMap<AgentId, AgentEntry<A>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn entries_mut(&self) -> RwLockWriteGuard<'_, HashMap<AgentId, AgentEntry<A>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn diagnostics(&self) -> MutexGuard<'_, DiagnosticsEngine> {
        self.diagnostics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn access_by_id(&self, id: AgentId) -> Option<Arc<A>> {
        self.entries().get(&id).map(|entry| entry.agent.clone())
    }
}

/// Owner of every registered agent.
pub struct Registry<A: Agent> {
    shared: Arc<Shared<A>>,

    /// Worker threads, including those of removed agents still draining
    workers: Vec<JoinHandle<()>>,
}

impl<A: Agent> Registry<A> {
    /// Creates an empty registry.
    ///
    /// # Arguments
    /// * `bandwidth` - Per-sender asynchronous delivery ceiling per turn
    pub fn new(bandwidth: Option<usize>) -> Self {
        let shared = Shared {
            window: RwLock::new(MessagingWindow::default()),
            entries: RwLock::new(HashMap::new()),
            diagnostics: Mutex::new(DiagnosticsEngine::new()),
            bandwidth,
        };
        Self {
            shared: Arc::new(shared),
            workers: Vec::new(),
        }
    }

    /// Returns an agent-facing handle onto this registry.
    pub fn messenger(&self) -> Messenger<A> {
        Messenger::new(Arc::downgrade(&self.shared))
    }

    /// Registers `agent`, allocates its mailbox and starts its worker.
    pub fn add(&mut self, agent: A) -> Result<AgentId, RuntimeError> {
        self.reap_finished_workers();

        let id = agent.id();
        let window = self.shared.window();
        if window.open {
            return Err(RuntimeError::TurnInProgress);
        }
        if window.shut_down {
            return Err(RuntimeError::AlreadyFinished);
        }

        let mut entries = self.shared.entries_mut();
        if entries.contains_key(&id) {
            return Err(RuntimeError::DuplicateAgent(id));
        }

        let agent = Arc::new(agent);
        let (mailbox, worker) = Mailbox::spawn(agent.clone())
            .map_err(|e| RuntimeError::WorkerSpawn(id, e.to_string()))?;
        entries.insert(id, AgentEntry { agent, mailbox });
        self.workers.push(worker);

        debug!(agent = %id, "Agent registered");
        Ok(id)
    }

    /// Unregisters `id` and closes its mailbox.
    ///
    /// Messages already queued are still handled before the worker exits.
    /// Returns the agent, or `None` if it was not registered.
    pub fn remove(&mut self, id: AgentId) -> Result<Option<Arc<A>>, RuntimeError> {
        let window = self.shared.window();
        if window.open {
            return Err(RuntimeError::TurnInProgress);
        }

        let removed = self.shared.entries_mut().remove(&id);
        drop(window);
        if removed.is_some() {
            debug!(agent = %id, "Agent removed");
        }
        self.reap_finished_workers();
        // Dropping the entry drops the mailbox sender, ending the worker.
        Ok(removed.map(|entry| entry.agent))
    }

    /// Joins workers of removed agents that have already drained.
    fn reap_finished_workers(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.workers)
            .into_iter()
            .partition(|handle| handle.is_finished());
        self.workers = running;

        for handle in finished {
            if handle.join().is_err() {
                warn!("Mailbox worker exited by panic");
            }
        }
    }

    /// Snapshot of the live agent IDs.
    pub fn view_ids(&self) -> HashSet<AgentId> {
        self.shared.entries().keys().copied().collect()
    }

    /// Snapshot of the live agents, for turn logic to drive.
    pub fn agents(&self) -> Vec<Arc<A>> {
        self.shared
            .entries()
            .values()
            .map(|entry| entry.agent.clone())
            .collect()
    }

    /// Looks up a live agent. Meant for the delivery path and hooks;
    /// agents never receive peer objects.
    pub fn access_by_id(&self, id: AgentId) -> Option<Arc<A>> {
        self.shared.access_by_id(id)
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.shared.entries().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.shared.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls `refresh_internal_state` on every agent.
    pub fn refresh_all(&self) {
        for agent in self.agents() {
            agent.refresh_internal_state();
        }
    }

    /// Runs every agent's synchronous messaging hook, one after another.
    pub fn run_synchronous_messaging_session(&self) {
        for agent in self.agents() {
            agent.run_synchronous_messaging();
        }
    }

    /// Current (not yet reset) diagnostics for the turn in progress.
    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.shared.diagnostics().snapshot(self.len())
    }

    /// Returns true while a turn's messaging window is open.
    pub fn is_window_open(&self) -> bool {
        self.shared.window().open
    }

    // =========================================================================
    // TURN PHASES (driven by the scheduler)
    // =========================================================================

    /// Opens the messaging window for a new turn.
    pub(crate) fn open_window(&self, reporter: CompletionReporter) {
        let mut window = self.shared.window_mut();
        if window.shut_down {
            return;
        }
        for entry in self.shared.entries().values() {
            entry.mailbox.reset_turn_budget();
        }
        window.open = true;
        window.reporter = Some(reporter);
    }

    /// Closes the messaging window; later sends are dropped.
    pub(crate) fn close_window(&self) {
        let mut window = self.shared.window_mut();
        window.open = false;
        window.reporter = None;
    }

    /// Records the barrier count, snapshots and resets diagnostics.
    pub(crate) fn finish_turn_diagnostics(&self, end_messaging_reports: usize) -> DiagnosticsSnapshot {
        let total = self.len();
        let mut diagnostics = self.shared.diagnostics();
        diagnostics.report_end_messaging_status(end_messaging_reports);
        let snapshot = diagnostics.snapshot(total);
        diagnostics.reset();
        snapshot
    }

    /// Closes every mailbox permanently and waits for all workers.
    pub async fn shutdown(&mut self) {
        {
            let mut window = self.shared.window_mut();
            window.open = false;
            window.shut_down = true;
            window.reporter = None;
            // Closed under the window's write lock so no send races it.
            self.shared.entries_mut().clear();
        }

        let workers = std::mem::take(&mut self.workers);
        let count = workers.len();
        let joined = tokio::task::spawn_blocking(move || {
            workers
                .into_iter()
                .map(|worker| worker.join())
                .filter(Result::is_err)
                .count()
        })
        .await;

        match joined {
            Ok(0) => debug!(workers = count, "All mailbox workers stopped"),
            Ok(panicked) => warn!(panicked, "Mailbox workers exited by panic"),
            Err(e) => warn!("Failed to join mailbox workers: {}", e),
        }
    }
}
