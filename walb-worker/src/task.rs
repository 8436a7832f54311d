//! Schedulable task values.
//!
//! A [`Task`] is a pure intent: which action to run, for which volume, on
//! which server. It carries no execution state and is discarded once its
//! execution finishes, successfully or not.

use std::fmt;

use crate::config::CompressOpt;
use crate::meta::Gid;
use crate::server::ServerParams;

/// Task kinds in scheduling priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    Apply,
    Merge,
    Replicate,
    Cleanup,
    Backup,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Apply => "apply",
            TaskKind::Merge => "merge",
            TaskKind::Replicate => "replicate",
            TaskKind::Cleanup => "cleanup",
            TaskKind::Backup => "backup",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific arguments of a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Apply diffs up to `gid` into the base image.
    Apply { gid: Gid },
    /// Merge the diffs covering `[gid_b, gid_e)`.
    Merge { gid_b: Gid, gid_e: Gid, max_size: u64 },
    /// Ship the diff chain to the replication target `target`.
    Replicate {
        target: String,
        dst: ServerParams,
        compress: CompressOpt,
        bulk_size: u64,
        max_merge_size: u64,
    },
    /// Delete diffs ending at or before `gid`.
    Cleanup { gid: Gid },
    /// Take a full or incremental backup at a storage server.
    Backup { full: bool },
}

/// An immutable command describing one schedulable action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Task {
    vol: String,
    server: ServerParams,
    action: Action,
}

impl Task {
    pub fn new(vol: impl Into<String>, server: ServerParams, action: Action) -> Self {
        Self {
            vol: vol.into(),
            server,
            action,
        }
    }

    pub fn apply(vol: impl Into<String>, archive: ServerParams, gid: Gid) -> Self {
        Self::new(vol, archive, Action::Apply { gid })
    }

    pub fn merge(
        vol: impl Into<String>,
        archive: ServerParams,
        gid_b: Gid,
        gid_e: Gid,
        max_size: u64,
    ) -> Self {
        Self::new(
            vol,
            archive,
            Action::Merge {
                gid_b,
                gid_e,
                max_size,
            },
        )
    }

    pub fn replicate(
        vol: impl Into<String>,
        archive: ServerParams,
        target: impl Into<String>,
        dst: ServerParams,
        compress: CompressOpt,
        bulk_size: u64,
        max_merge_size: u64,
    ) -> Self {
        Self::new(
            vol,
            archive,
            Action::Replicate {
                target: target.into(),
                dst,
                compress,
                bulk_size,
                max_merge_size,
            },
        )
    }

    pub fn cleanup(vol: impl Into<String>, archive: ServerParams, gid: Gid) -> Self {
        Self::new(vol, archive, Action::Cleanup { gid })
    }

    pub fn backup(vol: impl Into<String>, storage: ServerParams, full: bool) -> Self {
        Self::new(vol, storage, Action::Backup { full })
    }

    pub fn kind(&self) -> TaskKind {
        match self.action {
            Action::Apply { .. } => TaskKind::Apply,
            Action::Merge { .. } => TaskKind::Merge,
            Action::Replicate { .. } => TaskKind::Replicate,
            Action::Cleanup { .. } => TaskKind::Cleanup,
            Action::Backup { .. } => TaskKind::Backup,
        }
    }

    pub fn vol(&self) -> &str {
        &self.vol
    }

    /// The server the command is addressed to.
    pub fn server(&self) -> &ServerParams {
        &self.server
    }

    pub fn action(&self) -> &Action {
        &self.action
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}@{}", self.kind(), self.vol, self.server.name)?;
        match &self.action {
            Action::Apply { gid } | Action::Cleanup { gid } => write!(f, " gid={}", gid),
            Action::Merge {
                gid_b,
                gid_e,
                max_size,
            } => write!(f, " [{}, {}) max_size={}", gid_b, gid_e, max_size),
            Action::Replicate {
                target, compress, ..
            } => write!(f, " -> {} compress={}", target, compress),
            Action::Backup { full } => write!(f, " {}", if *full { "full" } else { "hash" }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Codec;

    fn a0() -> ServerParams {
        ServerParams::archive("a0", "localhost", 10200)
    }

    #[test]
    fn test_task_equality_by_content() {
        assert_eq!(Task::apply("vol0", a0(), 2), Task::apply("vol0", a0(), 2));
        assert_ne!(Task::apply("vol0", a0(), 2), Task::apply("vol0", a0(), 3));
        assert_ne!(Task::apply("vol0", a0(), 2), Task::apply("vol1", a0(), 2));
        assert_ne!(Task::apply("vol0", a0(), 2), Task::cleanup("vol0", a0(), 2));
        assert_ne!(
            Task::apply("vol0", a0(), 2),
            Task::apply("vol0", ServerParams::archive("a1", "localhost", 10201), 2)
        );
    }

    #[test]
    fn test_task_kind() {
        let a1 = ServerParams::archive("repl0", "10.0.0.2", 10001);
        let compress = CompressOpt::new(Codec::Snappy, 3, 4);

        assert_eq!(Task::apply("v", a0(), 1).kind(), TaskKind::Apply);
        assert_eq!(Task::merge("v", a0(), 1, 5, 1024).kind(), TaskKind::Merge);
        assert_eq!(
            Task::replicate("v", a0(), "repl0", a1, compress, 40, 5120).kind(),
            TaskKind::Replicate
        );
        assert_eq!(Task::cleanup("v", a0(), 1).kind(), TaskKind::Cleanup);
        assert_eq!(
            Task::backup("v", ServerParams::new("s0", "localhost", 10000, crate::server::ServerRole::Storage), true)
                .kind(),
            TaskKind::Backup
        );
    }

    #[test]
    fn test_task_kind_priority_order() {
        assert!(TaskKind::Apply < TaskKind::Merge);
        assert!(TaskKind::Merge < TaskKind::Replicate);
        assert!(TaskKind::Replicate < TaskKind::Cleanup);
    }

    #[test]
    fn test_task_display() {
        assert_eq!(Task::apply("vol0", a0(), 2).to_string(), "apply vol0@a0 gid=2");
        assert_eq!(
            Task::merge("vol0", a0(), 2, 9, 1024).to_string(),
            "merge vol0@a0 [2, 9) max_size=1024"
        );
    }

    #[test]
    fn test_task_accessors() {
        let task = Task::cleanup("vol0", a0(), 4);
        assert_eq!(task.vol(), "vol0");
        assert_eq!(task.server(), &a0());
        assert_eq!(task.action(), &Action::Cleanup { gid: 4 });
    }
}
