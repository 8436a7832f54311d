//! Default values for optional configuration settings.
//!
//! Server identities (`addr`, `port`) have no defaults and must be present in
//! the config file.

use std::path::PathBuf;
use std::time::Duration;

use super::settings::{ApplySettings, MergeSettings};
use super::units::CompressOpt;

// =============================================================================
// [general]
// =============================================================================

/// Default controller binary, resolved through `PATH`.
pub const DEFAULT_WALBC_PATH: &str = "walbc";

/// Default cap on concurrently executing tasks.
pub const DEFAULT_MAX_CONCURRENT_TASKS: usize = 2;

// =============================================================================
// [apply]
// =============================================================================

/// Default retention for restore points kept as diffs (1 day).
pub const DEFAULT_KEEP_PERIOD_SECS: u64 = 86400;

// =============================================================================
// [merge]
// =============================================================================

/// Default minimum diff age before merging (10 minutes).
pub const DEFAULT_MERGE_INTERVAL_SECS: u64 = 600;

/// Default maximum number of diffs per merge.
pub const DEFAULT_MERGE_MAX_NR: u64 = 10;

/// Default maximum bytes per merge (1 GiB).
pub const DEFAULT_MERGE_MAX_SIZE: u64 = 1024 * 1024 * 1024;

/// Default diff count above which a merge is wanted.
pub const DEFAULT_MERGE_THRESHOLD_NR: u64 = 20;

// =============================================================================
// [repl_servers.<name>]
// =============================================================================

/// Default interval between replications (1 day).
pub const DEFAULT_REPL_INTERVAL_SECS: u64 = 86400;

/// Default merge size before sending (1 GiB).
pub const DEFAULT_REPL_MAX_MERGE_SIZE: u64 = 1024 * 1024 * 1024;

/// Default transfer bulk size (64 KiB).
pub const DEFAULT_REPL_BULK_SIZE: u64 = 64 * 1024;

/// Default compression for replication.
pub fn default_repl_compress() -> CompressOpt {
    CompressOpt::default()
}

/// Default controller binary path.
pub fn default_walbc_path() -> PathBuf {
    PathBuf::from(DEFAULT_WALBC_PATH)
}

impl Default for ApplySettings {
    fn default() -> Self {
        Self {
            keep_period: Duration::from_secs(DEFAULT_KEEP_PERIOD_SECS),
            threshold_nr: None,
            threshold_size: None,
        }
    }
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_MERGE_INTERVAL_SECS),
            max_nr: DEFAULT_MERGE_MAX_NR,
            max_size: DEFAULT_MERGE_MAX_SIZE,
            threshold_nr: DEFAULT_MERGE_THRESHOLD_NR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_defaults_disable_fresh_apply() {
        let apply = ApplySettings::default();
        assert_eq!(apply.keep_period, Duration::from_secs(86400));
        assert!(!apply.fresh_apply_enabled());
    }

    #[test]
    fn test_merge_defaults() {
        let merge = MergeSettings::default();
        assert_eq!(merge.max_nr, DEFAULT_MERGE_MAX_NR);
        assert_eq!(merge.max_size, DEFAULT_MERGE_MAX_SIZE);
        assert_eq!(merge.threshold_nr, DEFAULT_MERGE_THRESHOLD_NR);
    }
}
