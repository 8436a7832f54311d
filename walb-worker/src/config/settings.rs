//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file. They are
//! pure data types; parsing lives in [`super::parser`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use super::units::CompressOpt;

/// Complete, validated worker configuration.
///
/// A `Config` only exists once every field has been parsed and validated, so
/// the worker never observes a partially loaded policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Server identity and concurrency settings
    pub general: GeneralSettings,
    /// Apply policy
    pub apply: ApplySettings,
    /// Merge policy
    pub merge: MergeSettings,
    /// Replication targets keyed by their operator-chosen name
    pub repl_servers: BTreeMap<String, ReplServerSettings>,
}

/// `[general]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralSettings {
    /// Address of the archive server this worker manages
    pub addr: String,
    /// Port of the archive server this worker manages
    pub port: u16,
    /// Path to the controller binary used by the command layer
    pub walbc_path: PathBuf,
    /// Upper bound on tasks executing at the same time, across all volumes
    pub max_concurrent_tasks: usize,
}

/// `[apply]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplySettings {
    /// Restore points younger than this are kept as diffs.
    pub keep_period: Duration,
    /// Start a fresh apply once this many diffs are pending.
    ///
    /// Unset by default; when both thresholds are unset only stalled
    /// applies are resumed.
    pub threshold_nr: Option<u64>,
    /// Start a fresh apply once pending diffs reach this many bytes.
    pub threshold_size: Option<u64>,
}

impl ApplySettings {
    /// Returns true if fresh applies may be started by the worker.
    pub fn fresh_apply_enabled(&self) -> bool {
        self.threshold_nr.is_some() || self.threshold_size.is_some()
    }
}

/// `[merge]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSettings {
    /// Diffs younger than this are not merged yet.
    pub interval: Duration,
    /// Maximum number of diffs folded into one merge.
    pub max_nr: u64,
    /// Maximum total bytes folded into one merge.
    pub max_size: u64,
    /// A merge is wanted once a volume has more diffs than this.
    pub threshold_nr: u64,
}

/// `[repl_servers.<name>]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplServerSettings {
    /// Address of the secondary archive
    pub addr: String,
    /// Port of the secondary archive
    pub port: u16,
    /// Minimum time between two replications of a volume
    pub interval: Duration,
    /// Compression used on the wire
    pub compress: CompressOpt,
    /// Diffs are merged up to this size before being sent
    pub max_merge_size: u64,
    /// Transfer bulk size in bytes
    pub bulk_size: u64,
}
