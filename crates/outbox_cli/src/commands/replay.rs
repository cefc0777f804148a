//! Replay command implementation.
//!
//! Feeds every entry of a queue file through a coordinator, prints the
//! emitted actions as JSON lines and rewrites the file with whatever is still
//! pending afterwards.

use crate::client::ReqwestClient;
use crate::queue_file;
use outbox_engine::{
    ConnectivityFlag, CoordinatorStats, CycleOutcome, HttpClient, LocalSnapshot,
    MemoryLocalState, MemoryQueueStore, QueueStore, RecordingSink, SyncConfig, SyncContext,
    SyncCoordinator,
};
use outbox_protocol::{Action, IntakeSignal, Request};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Options for the replay command.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Queue file to replay.
    pub path: PathBuf,
    /// Base url for relative request urls.
    pub base_url: String,
    /// Answer everything locally.
    pub offline: bool,
    /// JSON file with local lists for offline reads.
    pub local_state: Option<PathBuf>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Leave the queue file untouched.
    pub dry_run: bool,
}

/// Outcome of a replay.
#[derive(Debug)]
pub struct ReplayReport {
    /// Coordinator counters.
    pub stats: CoordinatorStats,
    /// Every emitted action, in emission order.
    pub actions: Vec<Action>,
    /// Entries still queued afterwards.
    pub pending: Vec<Request>,
}

/// Runs the replay command.
pub fn run(options: ReplayOptions) -> Result<(), Box<dyn std::error::Error>> {
    let requests = queue_file::load(&options.path)?;
    let local_state = match &options.local_state {
        Some(path) => load_local_state(path)?,
        None => MemoryLocalState::new(),
    };

    let mut config = SyncConfig::new().with_base_url(options.base_url.as_str());
    if let Some(secs) = options.timeout_secs {
        config = config.with_request_timeout(Duration::from_secs(secs));
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(replay(
        requests,
        config,
        !options.offline,
        local_state,
        ReqwestClient::new(),
    ));

    for action in &report.actions {
        println!("{}", serde_json::to_string(action)?);
    }

    if options.dry_run {
        info!(pending = report.pending.len(), "dry run, queue file left unchanged");
    } else {
        queue_file::save(&options.path, &report.pending)?;
    }

    info!(
        cycles = report.stats.cycles,
        dispatched = report.stats.dispatched,
        synthesized = report.stats.synthesized,
        failed = report.stats.failed,
        pending = report.pending.len(),
        "replay finished"
    );
    Ok(())
}

/// Replays `requests` in order, one intake cycle each, and waits for every
/// forked executor.
pub async fn replay<C: HttpClient>(
    requests: Vec<Request>,
    config: SyncConfig,
    connected: bool,
    local_state: MemoryLocalState,
    client: C,
) -> ReplayReport {
    let queue = Arc::new(MemoryQueueStore::new());
    let sink = Arc::new(RecordingSink::new());
    let context = SyncContext::new(
        queue.clone(),
        Arc::new(ConnectivityFlag::new(connected)),
        Arc::new(local_state),
        sink.clone(),
    );
    let (coordinator, _outbox) = SyncCoordinator::new(config, context, client);

    let mut tasks = Vec::new();
    for request in requests {
        queue.append(request.clone());
        if let CycleOutcome::Dispatched { task, .. } =
            coordinator.handle_intake(IntakeSignal::new(request))
        {
            tasks.push(task);
        }
    }
    for task in tasks {
        if let Err(e) = task.await {
            warn!(error = %e, "executor task failed");
        }
    }

    ReplayReport {
        stats: coordinator.stats(),
        actions: sink.actions(),
        pending: queue.snapshot(),
    }
}

fn load_local_state(path: &Path) -> Result<MemoryLocalState, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let snapshot: LocalSnapshot = serde_json::from_str(&text)?;
    Ok(MemoryLocalState::from_snapshot(snapshot))
}
