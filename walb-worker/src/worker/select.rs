//! Task selection.
//!
//! Selection reads live state through the controller and turns it into
//! candidate tasks. The decisions themselves are the pure functions at the
//! top of this module: given the same remote state, config and `now` they
//! always propose the same tasks, which is what lets a restarted worker pick
//! up exactly where the previous one left off.
//!
//! Per tick the candidate list is ordered by kind (apply, merge, replicate,
//! cleanup) and, within a kind, by volume list order. Each volume yields at
//! most one task per kind.

use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use super::core::{ReplTarget, Worker};
use super::error::SelectionError;
use crate::config::{ApplySettings, MergeSettings};
use crate::controller::{Controller, RestorableScope};
use crate::meta::{Diff, Gid, GidInfo, GidRange, MetaError, MetaState, GID_MAX};
use crate::task::{Task, TaskKind};

// =============================================================================
// Decision functions
// =============================================================================

/// Gid at which a stalled apply must be re-issued, if any.
///
/// Only a meta state with an applying component needs resuming; the apply is
/// addressed at the base snapshot's lower gid.
pub fn apply_resume_gid(state: &MetaState) -> Option<Gid> {
    state.is_applying().then(|| state.base().gid_b())
}

/// Returns `now - period`, or `None` if that precedes the epoch.
fn horizon(now: SystemTime, period: Duration) -> Option<SystemTime> {
    now.checked_sub(period)
}

/// Greatest restorable gid at or before `horizon` that satisfies `accept`.
pub fn latest_restorable_before(
    restorable: &[GidInfo],
    horizon: SystemTime,
    accept: impl Fn(Gid) -> bool,
) -> Option<Gid> {
    restorable
        .iter()
        .filter(|info| info.timestamp <= horizon && accept(info.gid))
        .map(|info| info.gid)
        .max()
}

/// Target gid for a fresh apply: the newest restore point older than the
/// keep period that lies beyond the base snapshot.
pub fn fresh_apply_target(
    state: &MetaState,
    restorable: &[GidInfo],
    policy: &ApplySettings,
    now: SystemTime,
) -> Option<Gid> {
    let horizon = horizon(now, policy.keep_period)?;
    let base_e = state.base().gid_e();
    latest_restorable_before(restorable, horizon, |gid| gid > base_e)
}

/// Returns true if the pending diffs justify a fresh apply.
pub fn fresh_apply_due(num_diff: u64, total_size: u64, policy: &ApplySettings) -> bool {
    policy.threshold_nr.is_some_and(|t| num_diff >= t)
        || policy.threshold_size.is_some_and(|t| total_size >= t)
}

/// Returns true if a volume's diff count or size calls for a merge.
pub fn merge_due(num_diff: u64, total_size: u64, policy: &MergeSettings) -> bool {
    num_diff > policy.threshold_nr || total_size > policy.max_size
}

/// Chooses the gid range of the next merge.
///
/// Walks `diffs` (oldest first) and returns the first contiguous run of at
/// least two mergeable diffs. A run ends before a diff that is not mergeable, does not
/// start where the previous one ends, is younger than `policy.interval`, or
/// would push the run past `policy.max_nr` diffs or `policy.max_size` bytes.
/// A diff landing exactly on the size bound is still taken.
pub fn merge_scope(
    diffs: &[Diff],
    policy: &MergeSettings,
    now: SystemTime,
) -> Result<Option<GidRange>, MetaError> {
    let Some(settled_before) = horizon(now, policy.interval) else {
        return Ok(None);
    };
    let settled = |d: &Diff| d.timestamp <= settled_before;

    let mut start = 0;
    while start < diffs.len() {
        let first = &diffs[start];
        if !settled(first) {
            break;
        }
        if !first.is_mergeable {
            start += 1;
            continue;
        }

        let mut end = start + 1;
        let mut size = first.data_size;
        while end < diffs.len() && ((end - start) as u64) < policy.max_nr {
            let next = &diffs[end];
            let fits = size.saturating_add(next.data_size) <= policy.max_size;
            if !next.is_mergeable || !diffs[end - 1].is_followed_by(next) || !settled(next) || !fits
            {
                break;
            }
            size += next.data_size;
            end += 1;
        }

        if end - start >= 2 {
            let last = &diffs[end - 1];
            return GidRange::new(first.snap_b.gid_b(), last.snap_e.gid_b()).map(Some);
        }
        start = end;
    }

    Ok(None)
}

/// Newest restore point of a listing, by gid.
pub fn latest_restore_point(restorable: &[GidInfo]) -> Option<GidInfo> {
    restorable.iter().copied().max_by_key(|info| info.gid)
}

/// Returns true if a replication to a target is due.
///
/// `primary` and `replica` are the newest restore points of the volume at the
/// primary archive and at the target. Nothing is due while the target already
/// holds the primary's newest gid, however old it is. Otherwise a target that
/// never received the volume is due at once, and one that did is due once
/// `interval` has passed since the restore point it holds.
pub fn replication_due(
    primary: Option<GidInfo>,
    replica: Option<GidInfo>,
    interval: Duration,
    now: SystemTime,
) -> bool {
    let Some(primary) = primary else {
        return false;
    };
    match replica {
        None => true,
        Some(replica) if replica.gid >= primary.gid => false,
        Some(replica) => now
            .duration_since(replica.timestamp)
            .map(|elapsed| elapsed >= interval)
            .unwrap_or(false),
    }
}

/// Target gid for cleanup: the newest restore point that is both folded into
/// the base and older than the keep period.
pub fn cleanup_target(
    state: &MetaState,
    restorable: &[GidInfo],
    keep_period: Duration,
    now: SystemTime,
) -> Option<Gid> {
    let horizon = horizon(now, keep_period)?;
    let base_b = state.base().gid_b();
    latest_restorable_before(restorable, horizon, |gid| gid <= base_b)
}

// =============================================================================
// Selection against live state
// =============================================================================

impl<C: Controller> Worker<C> {
    /// Proposes the tasks for `vols` at time `now`, in priority order.
    ///
    /// A volume whose state cannot be read or does not make sense is logged
    /// and skipped; the others are still evaluated.
    pub async fn select_tasks(&self, vols: &[String], now: SystemTime) -> Vec<Task> {
        let mut apply = Vec::new();
        let mut merge = Vec::new();
        let mut replicate = Vec::new();
        let mut cleanup = Vec::new();

        for vol in vols {
            let tasks = match self.select_for_volume(vol, now).await {
                Ok(tasks) => tasks,
                Err(e) => {
                    warn!(vol = %e.vol(), error = %e, "Selection failed, skipping volume");
                    continue;
                }
            };
            for task in tasks {
                match task.kind() {
                    TaskKind::Apply => apply.push(task),
                    TaskKind::Merge => merge.push(task),
                    TaskKind::Replicate => replicate.push(task),
                    TaskKind::Cleanup | TaskKind::Backup => cleanup.push(task),
                }
            }
        }

        let mut candidates = apply;
        candidates.append(&mut merge);
        candidates.append(&mut replicate);
        candidates.append(&mut cleanup);
        candidates
    }

    /// Runs every selector for one volume against one read of its base.
    async fn select_for_volume(
        &self,
        vol: &str,
        now: SystemTime,
    ) -> Result<Vec<Task>, SelectionError> {
        let state = self
            .controller
            .get_base(&self.a0, vol)
            .await
            .map_err(|e| SelectionError::query(vol, e))?;

        let mut tasks = Vec::new();

        if let Some(task) = self.apply_resume_task(vol, &state) {
            debug!(vol = %vol, state = %state, "Resuming interrupted apply");
            tasks.push(task);
            // The diffs of an interrupted apply must stay untouched until it
            // completes, so only replication may run alongside it.
            tasks.extend(self.select_replicate_task(vol, now).await);
            return Ok(tasks);
        }

        tasks.extend(self.select_fresh_apply_task(vol, &state, now).await?);
        tasks.extend(self.select_merge_task(vol, now).await?);
        tasks.extend(self.select_replicate_task(vol, now).await);
        tasks.extend(self.select_cleanup_task(vol, &state, now).await?);
        Ok(tasks)
    }

    fn apply_resume_task(&self, vol: &str, state: &MetaState) -> Option<Task> {
        apply_resume_gid(state).map(|gid| Task::apply(vol, self.a0.clone(), gid))
    }

    /// Fresh-apply selection; disabled unless an apply threshold is set.
    async fn select_fresh_apply_task(
        &self,
        vol: &str,
        state: &MetaState,
        now: SystemTime,
    ) -> Result<Option<Task>, SelectionError> {
        let policy = &self.config.apply;
        if !policy.fresh_apply_enabled() {
            return Ok(None);
        }

        let restorable = self
            .controller
            .get_restorable(&self.a0, vol, RestorableScope::All)
            .await
            .map_err(|e| SelectionError::query(vol, e))?;
        let Some(target) = fresh_apply_target(state, &restorable, policy, now) else {
            return Ok(None);
        };

        let range = GidRange::new(state.base().gid_b(), target)
            .map_err(|e| SelectionError::inconsistent(vol, e))?;
        let num_diff = self.query_num_diff(vol, range).await?;
        let total_size = self.query_total_diff_size(vol, range).await?;

        if !fresh_apply_due(num_diff, total_size, policy) {
            return Ok(None);
        }
        Ok(Some(Task::apply(vol, self.a0.clone(), target)))
    }

    /// Merge selection for one volume.
    pub async fn select_merge_task(
        &self,
        vol: &str,
        now: SystemTime,
    ) -> Result<Option<Task>, SelectionError> {
        let policy = &self.config.merge;

        let num_diff = self.query_num_diff(vol, GidRange::default()).await?;
        let total_size = self.query_total_diff_size(vol, GidRange::default()).await?;
        if !merge_due(num_diff, total_size, policy) {
            return Ok(None);
        }

        let diffs = self
            .controller
            .get_applicable_diff_list(&self.a0, vol, GID_MAX)
            .await
            .map_err(|e| SelectionError::query(vol, e))?;
        let scope =
            merge_scope(&diffs, policy, now).map_err(|e| SelectionError::inconsistent(vol, e))?;

        Ok(scope.map(|range| {
            Task::merge(
                vol,
                self.a0.clone(),
                range.begin(),
                range.end(),
                policy.max_size,
            )
        }))
    }

    /// Replicate selection for one volume.
    ///
    /// Proposes the most overdue target. A target that cannot be queried is
    /// logged and left out without affecting the volume's other tasks.
    pub async fn select_replicate_task(&self, vol: &str, now: SystemTime) -> Option<Task> {
        if self.repl_targets.is_empty() {
            return None;
        }

        let primary = match self
            .controller
            .get_restorable(&self.a0, vol, RestorableScope::Narrow)
            .await
        {
            Ok(restorable) => latest_restore_point(&restorable),
            Err(e) => {
                warn!(vol = %vol, error = %e, "Failed to query restore points, skipping replication");
                return None;
            }
        };
        if primary.is_none() {
            return None;
        }

        let mut best: Option<(&ReplTarget, Option<SystemTime>)> = None;

        for target in &self.repl_targets {
            let restorable = match self
                .controller
                .get_restorable(&target.server, vol, RestorableScope::Narrow)
                .await
            {
                Ok(restorable) => restorable,
                Err(e) => {
                    warn!(vol = %vol, target = %target.name, error = %e, "Failed to query replication target");
                    continue;
                }
            };

            let replica = latest_restore_point(&restorable);
            if !replication_due(primary, replica, target.settings.interval, now) {
                continue;
            }
            let last = replica.map(|info| info.timestamp);
            // None (never replicated) sorts before any time.
            if best.as_ref().map_or(true, |(_, best_last)| last < *best_last) {
                best = Some((target, last));
            }
        }

        best.map(|(target, _)| {
            let settings = &target.settings;
            Task::replicate(
                vol,
                self.a0.clone(),
                target.name.clone(),
                target.server.clone(),
                settings.compress,
                settings.bulk_size,
                settings.max_merge_size,
            )
        })
    }

    /// Cleanup selection for one volume.
    async fn select_cleanup_task(
        &self,
        vol: &str,
        state: &MetaState,
        now: SystemTime,
    ) -> Result<Option<Task>, SelectionError> {
        let restorable = self
            .controller
            .get_restorable(&self.a0, vol, RestorableScope::All)
            .await
            .map_err(|e| SelectionError::query(vol, e))?;
        let Some(target) = cleanup_target(state, &restorable, self.config.apply.keep_period, now)
        else {
            return Ok(None);
        };

        let num_diff = self.query_num_diff(vol, GidRange::until(target)).await?;
        if num_diff == 0 {
            return Ok(None);
        }
        Ok(Some(Task::cleanup(vol, self.a0.clone(), target)))
    }

    async fn query_num_diff(&self, vol: &str, range: GidRange) -> Result<u64, SelectionError> {
        self.controller
            .get_num_diff(&self.a0, vol, range)
            .await
            .map_err(|e| SelectionError::query(vol, e))
    }

    async fn query_total_diff_size(&self, vol: &str, range: GidRange) -> Result<u64, SelectionError> {
        self.controller
            .get_total_diff_size(&self.a0, vol, range)
            .await
            .map_err(|e| SelectionError::query(vol, e))
    }
}
