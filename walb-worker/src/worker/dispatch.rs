//! Task dispatching.
//!
//! Admits selected tasks into the registry in priority order and spawns one
//! tokio task per admitted task. Candidates that do not fit are dropped, not
//! queued.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::core::Worker;
use super::error::DispatchError;
use super::registry::{AdmitRefusal, RunningTask};
use crate::controller::Controller;
use crate::task::Task;

/// What happened to the candidates of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Started this tick
    pub admitted: Vec<Task>,
    /// Skipped because their volume already has a running task
    pub busy: Vec<Task>,
    /// Skipped because every slot was taken
    pub dropped: Vec<Task>,
}

impl<C: Controller> Worker<C> {
    /// Starts as many `candidates` as free slots allow.
    ///
    /// `candidates` must already be in priority order.
    pub(crate) fn dispatch(&self, candidates: Vec<Task>) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut candidates = candidates.into_iter();

        while let Some(task) = candidates.next() {
            match self.registry.try_admit(&task) {
                Ok(slot) => {
                    self.spawn_task(task.clone(), slot);
                    report.admitted.push(task);
                }
                Err(AdmitRefusal::VolumeBusy) => {
                    debug!(task = %task, "Volume busy, skipping");
                    report.busy.push(task);
                }
                Err(AdmitRefusal::Full) => {
                    report.dropped.push(task);
                    report.dropped.extend(candidates.by_ref());
                    debug!(
                        dropped = report.dropped.len(),
                        capacity = self.registry.capacity(),
                        "Concurrency cap reached, dropping remaining candidates"
                    );
                }
            }
        }

        report
    }

    /// Spawns the execution of `task`, holding `slot` until it finishes.
    fn spawn_task(&self, task: Task, slot: RunningTask) {
        let controller = Arc::clone(&self.controller);

        info!(task = %task, "Task started");

        tokio::spawn(async move {
            let start = Instant::now();
            let result = controller.execute(&task).await;
            drop(slot);

            match result {
                Ok(()) => info!(
                    task = %task,
                    duration_ms = elapsed_ms(start),
                    "Task completed"
                ),
                Err(source) => {
                    let err = DispatchError { task, source };
                    warn!(
                        error = %err,
                        duration_ms = elapsed_ms(start),
                        "Task failed"
                    );
                }
            }
        });
    }
}

/// Milliseconds since `start`, saturating at `u64::MAX`.
fn elapsed_ms(start: Instant) -> u64 {
    millis_saturating(start.elapsed())
}

fn millis_saturating(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_saturating() {
        assert_eq!(millis_saturating(Duration::from_millis(1500)), 1500);
        assert_eq!(millis_saturating(Duration::ZERO), 0);
        assert_eq!(millis_saturating(Duration::MAX), u64::MAX);
    }
}
