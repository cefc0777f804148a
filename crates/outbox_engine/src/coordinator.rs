//! Sync coordinator state machine.
//!
//! One cooperative loop drains intake signals and routes each one either to
//! local synthesis or to a forked executor. The loop never waits on the
//! network; its only suspension point is the intake receive.

use crate::config::SyncConfig;
use crate::context::SyncContext;
use crate::error::{SyncError, SyncResult};
use crate::executor::{ExecutionReport, RequestExecutor};
use crate::http::{CallOutcome, NetworkCallLayer};
use crate::queue::QueueStore;
use crate::synthesis::LocalSynthesizer;
use crate::transport::HttpClient;
use outbox_protocol::{Action, IntakeSignal, Request, RequestId, ResultPayload};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// The current state of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Waiting for the next intake signal.
    Idle,
    /// Deciding between synthesis and dispatch.
    Branching,
    /// An executor was forked this cycle.
    Dispatched,
    /// A response was synthesized this cycle.
    Synthesized,
}

impl CoordinatorState {
    /// Returns true while a cycle is in progress.
    pub fn is_active(&self) -> bool {
        !matches!(self, CoordinatorState::Idle)
    }
}

/// Statistics about coordinator cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Intake signals handled.
    pub cycles: u64,
    /// Responses synthesized locally.
    pub synthesized: u64,
    /// Executors forked.
    pub dispatched: u64,
    /// Online cycles that found no matching queue entry.
    pub no_match: u64,
    /// Offline cycles with nothing to replay.
    pub noops: u64,
    /// Older duplicates dropped in favor of a newer queued entry.
    pub superseded: u64,
    /// Executor runs finished.
    pub completed: u64,
    /// Executor runs that ended in a failure response.
    pub failed: u64,
}

/// What one intake cycle did.
#[derive(Debug)]
pub enum CycleOutcome {
    /// A response was synthesized for the replayed entry.
    Synthesized {
        /// The replayed queue entry.
        request_id: RequestId,
    },
    /// An executor was forked for the matched entry.
    Dispatched {
        /// The matched queue entry.
        request_id: RequestId,
        /// The executor task.
        task: JoinHandle<ExecutionReport>,
    },
    /// Online, but no idle queue entry matched.
    NoMatch,
    /// Offline, but nothing could be replayed.
    Noop,
}

impl CycleOutcome {
    /// Returns the queue entry this cycle acted on.
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            CycleOutcome::Synthesized { request_id } | CycleOutcome::Dispatched { request_id, .. } => {
                Some(*request_id)
            }
            CycleOutcome::NoMatch | CycleOutcome::Noop => None,
        }
    }
}

/// Queue entries currently owned by an executor.
#[derive(Debug, Default)]
struct InFlight {
    ids: Mutex<HashSet<RequestId>>,
    idle: Notify,
}

impl InFlight {
    fn try_acquire(self: &Arc<Self>, id: RequestId) -> Option<InFlightGuard> {
        if !self.ids.lock().insert(id) {
            return None;
        }
        Some(InFlightGuard {
            inflight: Arc::clone(self),
            id,
        })
    }

    fn contains(&self, id: &RequestId) -> bool {
        self.ids.lock().contains(id)
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.ids.lock().is_empty() {
                return;
            }
            notified.await;
        }
    }
}

/// Releases an in-flight entry when its executor finishes.
struct InFlightGuard {
    inflight: Arc<InFlight>,
    id: RequestId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut ids = self.inflight.ids.lock();
        ids.remove(&self.id);
        if ids.is_empty() {
            self.inflight.idle.notify_waiters();
        }
    }
}

/// Producer handle: admits requests into the queue and signals the
/// coordinator.
#[derive(Clone)]
pub struct Outbox {
    queue: Arc<dyn QueueStore>,
    intake: mpsc::UnboundedSender<IntakeSignal>,
}

impl Outbox {
    /// Appends `request` to the queue and signals the coordinator.
    pub fn admit(&self, request: Request) -> SyncResult<RequestId> {
        request.validate()?;
        let id = request.id;
        self.queue.append(request.clone());
        self.intake
            .send(IntakeSignal::new(request))
            .map_err(|_| SyncError::IntakeClosed)?;
        debug!(request_id = %id, "request admitted");
        Ok(id)
    }

    /// Signals every pending entry again, e.g. after connectivity returns.
    ///
    /// Returns the number of signals sent.
    pub fn replay_pending(&self) -> SyncResult<usize> {
        let pending = self.queue.snapshot();
        let count = pending.len();
        for request in pending {
            self.intake
                .send(IntakeSignal::new(request))
                .map_err(|_| SyncError::IntakeClosed)?;
        }
        info!(count, "replaying pending requests");
        Ok(count)
    }

    /// Returns the number of pending entries.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl std::fmt::Debug for Outbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbox")
            .field("pending", &self.queue.len())
            .field("closed", &self.intake.is_closed())
            .finish()
    }
}

/// The sync coordinator routes admitted requests.
pub struct SyncCoordinator<C: HttpClient> {
    context: SyncContext,
    executor: RequestExecutor<C>,
    synthesizer: LocalSynthesizer,
    intake: mpsc::UnboundedReceiver<IntakeSignal>,
    inflight: Arc<InFlight>,
    state: RwLock<CoordinatorState>,
    stats: Arc<RwLock<CoordinatorStats>>,
}

impl<C: HttpClient> SyncCoordinator<C> {
    /// Creates a coordinator and the handle that feeds it.
    pub fn new(config: SyncConfig, context: SyncContext, client: C) -> (Self, Outbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        let layer = Arc::new(NetworkCallLayer::new(client, &config));
        let executor = RequestExecutor::new(layer, context.clone(), Arc::new(config));
        let synthesizer = LocalSynthesizer::new(Arc::clone(&context.local_state));
        let outbox = Outbox {
            queue: Arc::clone(&context.queue),
            intake: tx,
        };

        let coordinator = Self {
            context,
            executor,
            synthesizer,
            intake: rx,
            inflight: Arc::new(InFlight::default()),
            state: RwLock::new(CoordinatorState::Idle),
            stats: Arc::new(RwLock::new(CoordinatorStats::default())),
        };
        (coordinator, outbox)
    }

    /// Creates a coordinator and runs it on the current tokio runtime.
    ///
    /// The task ends once every `Outbox` clone is dropped and all forked
    /// executors have finished.
    pub fn spawn(
        config: SyncConfig,
        context: SyncContext,
        client: C,
    ) -> (Outbox, JoinHandle<CoordinatorStats>) {
        let (coordinator, outbox) = Self::new(config, context, client);
        (outbox, tokio::spawn(coordinator.run()))
    }

    /// Gets the current state.
    pub fn state(&self) -> CoordinatorState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> CoordinatorStats {
        self.stats.read().clone()
    }

    fn set_state(&self, state: CoordinatorState) {
        *self.state.write() = state;
    }

    /// Drains intake signals until the channel closes.
    pub async fn run(mut self) -> CoordinatorStats {
        info!("sync coordinator started");
        while let Some(signal) = self.intake.recv().await {
            // Dropping the handle detaches the executor.
            let _ = self.handle_intake(signal);
            self.set_state(CoordinatorState::Idle);
        }

        self.inflight.wait_idle().await;
        let stats = self.stats();
        info!(
            cycles = stats.cycles,
            dispatched = stats.dispatched,
            synthesized = stats.synthesized,
            "sync coordinator stopped"
        );
        stats
    }

    /// Runs one intake cycle.
    ///
    /// Connectivity is read once; the cycle never waits on the network.
    pub fn handle_intake(&self, signal: IntakeSignal) -> CycleOutcome {
        self.set_state(CoordinatorState::Branching);
        self.stats.write().cycles += 1;

        let request = signal.request;
        let connected = self.context.connectivity.is_connected();
        let local_only = request.targets_provisional_entity();

        let outcome = if local_only {
            debug!(request_id = %request.id, connected, "answering provisional read locally");
            self.synthesize_local_only(&request)
        } else if !connected {
            debug!(request_id = %request.id, "offline, answering locally");
            self.synthesize_current()
        } else {
            self.dispatch_match(&request)
        };

        if matches!(outcome, CycleOutcome::NoMatch | CycleOutcome::Noop) {
            self.set_state(CoordinatorState::Idle);
        }
        outcome
    }

    /// Replays the most recently queued entry through local synthesis.
    fn synthesize_current(&self) -> CycleOutcome {
        let Some(current) = self.context.queue.latest() else {
            warn!(error = %SyncError::LocalSynthesisNoop, "nothing to synthesize");
            self.stats.write().noops += 1;
            return CycleOutcome::Noop;
        };

        let outcome = self.synthesize(&current);
        // A read of a never-synced entity can never run upstream.
        if current.targets_provisional_entity() {
            self.context.emit(Action::Removal(current));
        }
        outcome
    }

    /// Answers a read of a never-synced entity and drops every queued copy
    /// of it.
    fn synthesize_local_only(&self, request: &Request) -> CycleOutcome {
        let outcome = self.synthesize(request);
        for entry in self.context.queue.snapshot() {
            if entry.is_duplicate_of(request) {
                self.context.emit(Action::Removal(entry));
            }
        }
        outcome
    }

    /// Emits a locally synthesized result for `entry`.
    fn synthesize(&self, entry: &Request) -> CycleOutcome {
        let Some(response) = self.synthesizer.synthesize(entry) else {
            warn!(
                request_id = %entry.id,
                kind = entry.kind.label(),
                "request has no local synthesis"
            );
            self.stats.write().noops += 1;
            return CycleOutcome::Noop;
        };

        if let Some(handler) = entry.handler() {
            self.context
                .emit(Action::result(handler, ResultPayload::new(response)));
        }

        self.set_state(CoordinatorState::Synthesized);
        self.stats.write().synthesized += 1;
        CycleOutcome::Synthesized {
            request_id: entry.id,
        }
    }

    /// Forks an executor for the most recently queued idle entry matching
    /// `request` and supersedes the idle duplicates queued before it.
    fn dispatch_match(&self, request: &Request) -> CycleOutcome {
        let mut matches: Vec<Request> = self
            .context
            .queue
            .snapshot()
            .into_iter()
            .filter(|entry| entry.is_duplicate_of(request))
            .collect();
        let claimed = matches.iter().enumerate().rev().find_map(|(position, entry)| {
            self.inflight
                .try_acquire(entry.id)
                .map(|guard| (position, entry.clone(), guard))
        });

        let Some((position, entry, guard)) = claimed else {
            debug!(
                request_id = %request.id,
                action = request.action(),
                in_flight = self.inflight.contains(&request.id),
                "no idle queue entry matched"
            );
            self.stats.write().no_match += 1;
            return CycleOutcome::NoMatch;
        };

        matches.truncate(position);
        for stale in matches {
            if self.inflight.contains(&stale.id) || !carries_identity(&stale) {
                continue;
            }
            debug!(request_id = %stale.id, superseded_by = %entry.id, "superseding stale duplicate");
            self.context.emit(Action::Removal(stale));
            self.stats.write().superseded += 1;
        }

        let request_id = entry.id;
        debug!(%request_id, action = entry.action(), url = entry.url(), "dispatching");

        let executor = self.executor.clone();
        let stats = Arc::clone(&self.stats);
        let task = tokio::spawn(async move {
            let _guard = guard;
            let report = executor.execute(entry).await;
            let mut stats = stats.write();
            stats.completed += 1;
            if report.outcome != CallOutcome::Success {
                stats.failed += 1;
            }
            report
        });

        self.set_state(CoordinatorState::Dispatched);
        self.stats.write().dispatched += 1;
        CycleOutcome::Dispatched { request_id, task }
    }
}

/// Creates without a client-assigned `ID` are distinct entities even when
/// they share a url.
fn carries_identity(entry: &Request) -> bool {
    !entry.kind.is_create() || entry.entity_id().is_some()
}
