//! Diff listings and gid markers reported by archive servers.

use std::fmt;
use std::time::SystemTime;

use super::snapshot::{Gid, MetaError, Snapshot, GID_MAX};
use crate::config::Codec;

/// A wdiff descriptor.
///
/// Diffs are created and owned by the archive; the worker only reads them
/// from listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    /// Snapshot the diff applies to
    pub snap_b: Snapshot,
    /// Snapshot the diff produces
    pub snap_e: Snapshot,
    /// Creation time of the diff
    pub timestamp: SystemTime,
    /// Whether the diff may be merged with its predecessor
    pub is_mergeable: bool,
    /// Whether the diff was produced by compaction
    pub is_comp_diff: bool,
    /// Compression of the stored diff
    pub codec: Codec,
    /// Stored size in bytes
    pub data_size: u64,
}

impl Diff {
    /// Returns true if `next` starts exactly where this diff ends.
    pub fn is_followed_by(&self, next: &Diff) -> bool {
        self.snap_e.gid_b() == next.snap_b.gid_b()
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-->{} {}{} {} {}",
            self.snap_b,
            self.snap_e,
            if self.is_mergeable { 'M' } else { '-' },
            if self.is_comp_diff { 'C' } else { '-' },
            self.codec,
            self.data_size
        )
    }
}

/// A restorable point in a volume's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GidInfo {
    pub gid: Gid,
    pub timestamp: SystemTime,
}

impl GidInfo {
    pub fn new(gid: Gid, timestamp: SystemTime) -> Self {
        Self { gid, timestamp }
    }
}

/// A half-open gid range `[begin, end)`.
///
/// The default range covers the whole history: `[0, GID_MAX)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GidRange {
    begin: Gid,
    end: Gid,
}

impl GidRange {
    pub fn new(begin: Gid, end: Gid) -> Result<Self, MetaError> {
        if begin > end {
            return Err(MetaError::InvertedRange {
                gid_b: begin,
                gid_e: end,
            });
        }
        Ok(Self { begin, end })
    }

    /// `[0, end)`.
    pub fn until(end: Gid) -> Self {
        Self { begin: 0, end }
    }

    /// `[begin, GID_MAX)`.
    pub fn starting_at(begin: Gid) -> Self {
        Self {
            begin,
            end: GID_MAX,
        }
    }

    pub fn begin(&self) -> Gid {
        self.begin
    }

    pub fn end(&self) -> Gid {
        self.end
    }
}

impl Default for GidRange {
    fn default() -> Self {
        Self {
            begin: 0,
            end: GID_MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(b: Gid, e: Gid) -> Diff {
        Diff {
            snap_b: Snapshot::at(b),
            snap_e: Snapshot::at(e),
            timestamp: SystemTime::UNIX_EPOCH,
            is_mergeable: true,
            is_comp_diff: false,
            codec: Codec::Snappy,
            data_size: 100,
        }
    }

    #[test]
    fn test_gid_range_default_is_whole_history() {
        let range = GidRange::default();
        assert_eq!(range.begin(), 0);
        assert_eq!(range.end(), GID_MAX);
    }

    #[test]
    fn test_gid_range_constructors() {
        assert_eq!(GidRange::until(7), GidRange::new(0, 7).unwrap());
        assert_eq!(GidRange::starting_at(7), GidRange::new(7, GID_MAX).unwrap());
        assert!(GidRange::new(8, 7).is_err());
    }

    #[test]
    fn test_diff_contiguity() {
        assert!(diff(2, 3).is_followed_by(&diff(3, 5)));
        assert!(!diff(2, 3).is_followed_by(&diff(4, 5)));
    }

    #[test]
    fn test_diff_display() {
        assert_eq!(diff(2, 3).to_string(), "|2|-->|3| M- snappy 100");
    }
}
