//! Contract of the remote command layer.
//!
//! The worker never talks to servers directly. Every query and command goes
//! through a [`Controller`], which production code backs with the controller
//! binary and tests back with an in-memory double.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   queries    ┌──────────────┐   remote calls   ┌─────────┐
//! │    Worker    │ ───────────▶ │  Controller  │ ───────────────▶ │ servers │
//! │ (selection)  │ ◀─────────── │   (trait)    │ ◀─────────────── │         │
//! └──────────────┘  MetaState,  └──────────────┘                  └─────────┘
//!        │          Diff, ...          ▲
//!        └──────── execute(Task) ──────┘
//! ```

use std::future::Future;
use thiserror::Error;

use crate::meta::{Diff, Gid, GidInfo, GidRange, MetaState};
use crate::server::ServerParams;
use crate::task::Task;

/// State string of an archive volume that accepts apply/merge/replicate.
pub const ARCHIVED_STATE: &str = "Archived";

/// Errors reported by the command layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ControllerError {
    /// The server answered with an error.
    #[error("{op} failed on {server}: {message}")]
    Remote {
        op: String,
        server: String,
        message: String,
    },

    /// The server could not be reached.
    #[error("server {0} unavailable")]
    Unavailable(String),
}

impl ControllerError {
    pub fn remote(op: impl Into<String>, server: &ServerParams, message: impl Into<String>) -> Self {
        Self::Remote {
            op: op.into(),
            server: server.name.clone(),
            message: message.into(),
        }
    }
}

/// Which restorable points `get_restorable` reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RestorableScope {
    /// Only explicitly marked restore points.
    #[default]
    Narrow,
    /// Every restorable gid, including implicit ones.
    All,
}

/// Operations the worker consumes from the remote command layer.
///
/// Queries must not have side effects: the worker calls them every tick and
/// expects the same answers for unchanged remote state.
pub trait Controller: Send + Sync + 'static {
    /// Lists the volumes known to `server`.
    fn get_vol_list(
        &self,
        server: &ServerParams,
    ) -> impl Future<Output = Result<Vec<String>, ControllerError>> + Send;

    /// Returns the state string of `vol` on `server`.
    fn get_state(
        &self,
        server: &ServerParams,
        vol: &str,
    ) -> impl Future<Output = Result<String, ControllerError>> + Send;

    /// Returns the apply progress of `vol` at `archive`.
    fn get_base(
        &self,
        archive: &ServerParams,
        vol: &str,
    ) -> impl Future<Output = Result<MetaState, ControllerError>> + Send;

    /// Counts the diffs of `vol` inside `range`.
    fn get_num_diff(
        &self,
        archive: &ServerParams,
        vol: &str,
        range: GidRange,
    ) -> impl Future<Output = Result<u64, ControllerError>> + Send;

    /// Sums the stored size in bytes of the diffs of `vol` inside `range`.
    fn get_total_diff_size(
        &self,
        archive: &ServerParams,
        vol: &str,
        range: GidRange,
    ) -> impl Future<Output = Result<u64, ControllerError>> + Send;

    /// Lists, oldest first, the diffs that can be applied up to `gid`.
    ///
    /// Pass [`GID_MAX`](crate::meta::GID_MAX) for "through the latest".
    fn get_applicable_diff_list(
        &self,
        archive: &ServerParams,
        vol: &str,
        gid: Gid,
    ) -> impl Future<Output = Result<Vec<Diff>, ControllerError>> + Send;

    /// Lists the restorable gids of `vol` at `archive`, oldest first.
    fn get_restorable(
        &self,
        archive: &ServerParams,
        vol: &str,
        scope: RestorableScope,
    ) -> impl Future<Output = Result<Vec<GidInfo>, ControllerError>> + Send;

    /// Runs `task` to completion.
    ///
    /// Timeouts and cancellation are the implementation's concern; the
    /// worker awaits the returned future without a deadline.
    fn execute(&self, task: &Task) -> impl Future<Output = Result<(), ControllerError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_error_display() {
        let a0 = ServerParams::archive("a0", "localhost", 10200);
        let err = ControllerError::remote("get_base", &a0, "no such volume");
        assert_eq!(err.to_string(), "get_base failed on a0: no such volume");
        assert_eq!(
            ControllerError::Unavailable("a1".into()).to_string(),
            "server a1 unavailable"
        );
    }

    #[test]
    fn test_restorable_scope_default_is_narrow() {
        assert_eq!(RestorableScope::default(), RestorableScope::Narrow);
    }
}
