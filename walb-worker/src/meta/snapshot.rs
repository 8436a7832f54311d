//! Snapshot and meta state value types.

use std::fmt;
use thiserror::Error;

/// Generation id.
pub type Gid = u64;

/// The "unbounded / latest" gid sentinel.
pub const GID_MAX: Gid = u64::MAX;

/// Errors constructing meta-state values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetaError {
    /// gid_b is greater than gid_e.
    #[error("inverted gid range: {gid_b} > {gid_e}")]
    InvertedRange { gid_b: Gid, gid_e: Gid },

    /// The applying snapshot starts before the base snapshot.
    #[error("applying snapshot {applying} starts before base {base}")]
    ApplyingBeforeBase { base: Snapshot, applying: Snapshot },

    /// The applying snapshot is the base itself.
    #[error("applying snapshot equals base {0}")]
    ApplyingIsBase(Snapshot),
}

/// A `(gid_b, gid_e)` boundary in a volume's history.
///
/// `gid_b <= gid_e` always holds. A snapshot with `gid_b == gid_e` is clean;
/// otherwise it is dirty and can only be restored once the range is applied.
/// The default value `(0, 0)` means "no progress".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Snapshot {
    gid_b: Gid,
    gid_e: Gid,
}

impl Snapshot {
    /// Creates a snapshot, rejecting `gid_b > gid_e`.
    pub fn new(gid_b: Gid, gid_e: Gid) -> Result<Self, MetaError> {
        if gid_b > gid_e {
            return Err(MetaError::InvertedRange { gid_b, gid_e });
        }
        Ok(Self { gid_b, gid_e })
    }

    /// Creates the clean snapshot `(gid, gid)`.
    pub fn at(gid: Gid) -> Self {
        Self {
            gid_b: gid,
            gid_e: gid,
        }
    }

    pub fn gid_b(&self) -> Gid {
        self.gid_b
    }

    pub fn gid_e(&self) -> Gid {
        self.gid_e
    }

    pub fn is_clean(&self) -> bool {
        self.gid_b == self.gid_e
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            write!(f, "|{}|", self.gid_b)
        } else {
            write!(f, "|{},{}|", self.gid_b, self.gid_e)
        }
    }
}

/// Apply progress of a volume at an archive.
///
/// `applying` is only present while an apply transaction is in flight, or
/// after a crash interrupted one. Equality covers both components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MetaState {
    base: Snapshot,
    applying: Option<Snapshot>,
}

impl MetaState {
    /// A meta state with a committed base and no apply in flight.
    pub fn new(base: Snapshot) -> Self {
        Self {
            base,
            applying: None,
        }
    }

    /// A meta state with an apply in flight from `base` toward `applying`.
    ///
    /// `applying` must differ from `base` and must not start before it.
    pub fn applying(base: Snapshot, applying: Snapshot) -> Result<Self, MetaError> {
        if applying.gid_b < base.gid_b {
            return Err(MetaError::ApplyingBeforeBase { base, applying });
        }
        if applying == base {
            return Err(MetaError::ApplyingIsBase(base));
        }
        Ok(Self {
            base,
            applying: Some(applying),
        })
    }

    pub fn base(&self) -> Snapshot {
        self.base
    }

    pub fn applying_snapshot(&self) -> Option<Snapshot> {
        self.applying
    }

    pub fn is_applying(&self) -> bool {
        self.applying.is_some()
    }
}

impl fmt::Display for MetaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.applying {
            Some(applying) => write!(f, "<{}-->{}>", self.base, applying),
            None => write!(f, "<{}>", self.base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(b: Gid, e: Gid) -> Snapshot {
        Snapshot::new(b, e).unwrap()
    }

    #[test]
    fn test_snapshot_equality() {
        assert_eq!(snap(2, 3), snap(2, 3));
        assert_ne!(snap(2, 3), snap(3, 3));
        assert_ne!(snap(2, 3), snap(2, 4));
        assert_ne!(snap(2, 3), snap(1, 3));
    }

    #[test]
    fn test_snapshot_rejects_inverted_range() {
        assert_eq!(
            Snapshot::new(5, 4),
            Err(MetaError::InvertedRange { gid_b: 5, gid_e: 4 })
        );
        assert!(Snapshot::new(4, 4).is_ok());
    }

    #[test]
    fn test_snapshot_default_is_no_progress() {
        let s = Snapshot::default();
        assert_eq!(s, snap(0, 0));
        assert!(s.is_clean());
    }

    #[test]
    fn test_snapshot_display() {
        assert_eq!(Snapshot::at(7).to_string(), "|7|");
        assert_eq!(snap(2, 5).to_string(), "|2,5|");
    }

    #[test]
    fn test_meta_state_equality() {
        let applying = |b, a| MetaState::applying(b, a).unwrap();

        assert_eq!(MetaState::new(snap(2, 3)), MetaState::new(snap(2, 3)));
        assert_ne!(applying(snap(2, 3), snap(4, 5)), MetaState::new(snap(2, 3)));
        assert_ne!(MetaState::new(snap(2, 3)), applying(snap(2, 3), snap(4, 5)));
        assert_ne!(MetaState::new(snap(2, 3)), MetaState::new(snap(2, 4)));
        assert_ne!(applying(snap(2, 3), snap(3, 4)), applying(snap(2, 3), snap(3, 5)));
        assert_eq!(applying(snap(2, 3), snap(4, 5)), applying(snap(2, 3), snap(4, 5)));
    }

    #[test]
    fn test_meta_state_is_applying() {
        assert!(!MetaState::default().is_applying());
        assert!(!MetaState::new(snap(2, 4)).is_applying());

        let ms = MetaState::applying(snap(2, 3), snap(4, 5)).unwrap();
        assert!(ms.is_applying());
        assert_eq!(ms.base(), snap(2, 3));
        assert_eq!(ms.applying_snapshot(), Some(snap(4, 5)));
    }

    #[test]
    fn test_meta_state_rejects_applying_before_base() {
        assert!(MetaState::applying(snap(4, 5), snap(2, 3)).is_err());
    }

    #[test]
    fn test_meta_state_rejects_applying_equal_to_base() {
        assert_eq!(
            MetaState::applying(snap(2, 3), snap(2, 3)),
            Err(MetaError::ApplyingIsBase(snap(2, 3)))
        );
        assert_eq!(
            MetaState::applying(Snapshot::at(4), Snapshot::at(4)),
            Err(MetaError::ApplyingIsBase(Snapshot::at(4)))
        );
        // Same start, later end is a genuine apply.
        assert!(MetaState::applying(snap(2, 3), snap(2, 5)).is_ok());
    }

    #[test]
    fn test_meta_state_display() {
        assert_eq!(MetaState::new(Snapshot::at(3)).to_string(), "<|3|>");
        let ms = MetaState::applying(snap(2, 3), Snapshot::at(5)).unwrap();
        assert_eq!(ms.to_string(), "<|2,3|-->|5|>");
    }
}
