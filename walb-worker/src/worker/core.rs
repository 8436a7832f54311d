//! Worker core - main struct, tick and run loop.
//!
//! Handler methods are implemented in separate modules:
//! - `select`: per-volume task selection
//! - `dispatch`: bounded dispatch of selected tasks

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::dispatch::DispatchReport;
use super::registry::TaskRegistry;
use crate::config::{Config, ReplServerSettings};
use crate::controller::{Controller, ControllerError, ARCHIVED_STATE};
use crate::server::ServerParams;

/// Default time between two reconciliation ticks.
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 10;

/// Name given to the archive server described by `[general]`.
pub const PRIMARY_ARCHIVE_NAME: &str = "a0";

/// A replication target resolved from `[repl_servers.<name>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplTarget {
    pub name: String,
    pub server: ServerParams,
    pub settings: ReplServerSettings,
}

/// Outcome of one reconciliation tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Volumes evaluated this tick
    pub volumes: usize,
    /// Tasks proposed by selection
    pub candidates: usize,
    /// What dispatch did with the candidates
    pub dispatch: DispatchReport,
}

// =============================================================================
// Worker
// =============================================================================

/// The background reconciliation engine.
///
/// Every tick the worker reads live state through its [`Controller`], derives
/// the tasks each volume needs, and starts as many of them as the concurrency
/// cap allows. Nothing is queued between ticks: a task that could not start
/// is derived again on the next tick if its condition still holds.
pub struct Worker<C: Controller> {
    /// Immutable policy.
    pub(crate) config: Arc<Config>,

    /// Remote command layer.
    pub(crate) controller: Arc<C>,

    /// The archive server managed by this worker.
    pub(crate) a0: ServerParams,

    /// Replication targets in name order.
    pub(crate) repl_targets: Vec<ReplTarget>,

    /// Running tasks, bounded by `general.max_concurrent_tasks`.
    pub(crate) registry: TaskRegistry,

    /// Time between ticks in [`Worker::run`].
    pub(crate) tick_interval: Duration,
}

impl<C: Controller> Worker<C> {
    /// Creates a worker for the archive described by `config.general`.
    pub fn new(config: Config, controller: Arc<C>) -> Self {
        let a0 = ServerParams::archive(
            PRIMARY_ARCHIVE_NAME,
            config.general.addr.clone(),
            config.general.port,
        );

        let repl_targets = config
            .repl_servers
            .iter()
            .map(|(name, settings)| ReplTarget {
                name: name.clone(),
                server: ServerParams::archive(name.clone(), settings.addr.clone(), settings.port),
                settings: settings.clone(),
            })
            .collect();

        let registry = TaskRegistry::new(config.general.max_concurrent_tasks);

        Self {
            config: Arc::new(config),
            controller,
            a0,
            repl_targets,
            registry,
            tick_interval: Duration::from_secs(DEFAULT_TICK_INTERVAL_SECS),
        }
    }

    /// Sets a custom tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// The archive server managed by this worker.
    pub fn primary_archive(&self) -> &ServerParams {
        &self.a0
    }

    pub fn repl_targets(&self) -> &[ReplTarget] {
        &self.repl_targets
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Runs one reconciliation cycle at wall-clock time `now`.
    ///
    /// Fails only if the volume list cannot be fetched; per-volume problems
    /// are logged and skipped.
    pub async fn tick(&self, now: SystemTime) -> Result<TickReport, ControllerError> {
        let vols = self.controller.get_vol_list(&self.a0).await?;
        let vols = self.archived_volumes(vols).await;

        let candidates = self.select_tasks(&vols, now).await;
        let candidate_count = candidates.len();
        let dispatch = self.dispatch(candidates);

        debug!(
            volumes = vols.len(),
            candidates = candidate_count,
            admitted = dispatch.admitted.len(),
            busy = dispatch.busy.len(),
            dropped = dispatch.dropped.len(),
            running = self.registry.running_count(),
            "Tick complete"
        );

        Ok(TickReport {
            volumes: vols.len(),
            candidates: candidate_count,
            dispatch,
        })
    }

    /// Keeps the volumes whose archive state accepts background work.
    async fn archived_volumes(&self, vols: Vec<String>) -> Vec<String> {
        let mut archived = Vec::with_capacity(vols.len());
        for vol in vols {
            match self.controller.get_state(&self.a0, &vol).await {
                Ok(state) if state == ARCHIVED_STATE => archived.push(vol),
                Ok(state) => debug!(vol = %vol, state = %state, "Volume not archived, skipping"),
                Err(e) => warn!(vol = %vol, error = %e, "Failed to get volume state, skipping"),
            }
        }
        archived
    }

    /// Runs ticks until shutdown is signalled.
    ///
    /// In-flight tasks are left running on shutdown; they finish on their own
    /// and release their slots.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            archive = %self.a0,
            max_concurrent_tasks = self.registry.capacity(),
            repl_targets = self.repl_targets.len(),
            tick_interval_secs = self.tick_interval.as_secs(),
            "Worker starting"
        );

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!(
                        running = self.registry.running_count(),
                        "Worker shutting down"
                    );
                    break;
                }

                _ = interval.tick() => {
                    if let Err(e) = self.tick(SystemTime::now()).await {
                        warn!(archive = %self.a0, error = %e, "Failed to list volumes, skipping tick");
                    }
                }
            }
        }
    }
}

impl<C: Controller> std::fmt::Debug for Worker<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("a0", &self.a0)
            .field("repl_targets", &self.repl_targets.len())
            .field("registry", &self.registry)
            .field("tick_interval", &self.tick_interval)
            .finish_non_exhaustive()
    }
}
