//! Meta-state data model.
//!
//! Value types describing a volume's diff-chain progress at an archive:
//! [`Snapshot`] boundaries, the [`MetaState`] apply progress, [`Diff`]
//! listings and restorable [`GidInfo`] markers. All of them are immutable and
//! compare structurally; invalid orderings are rejected by their
//! constructors.

mod diff;
mod snapshot;

pub use diff::{Diff, GidInfo, GidRange};
pub use snapshot::{Gid, MetaError, MetaState, Snapshot, GID_MAX};
