//! Worker error types.

use thiserror::Error;

use crate::controller::ControllerError;
use crate::meta::MetaError;
use crate::task::Task;

/// A volume could not be evaluated this tick.
///
/// The worker logs it and moves on to the next volume.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// A query for the volume failed.
    #[error("query for volume {vol} failed: {source}")]
    Query {
        vol: String,
        #[source]
        source: ControllerError,
    },

    /// The archive reported gids in an order that cannot be right.
    #[error("inconsistent meta state for volume {vol}: {source}")]
    Inconsistent {
        vol: String,
        #[source]
        source: MetaError,
    },
}

impl SelectionError {
    pub(crate) fn query(vol: &str, source: ControllerError) -> Self {
        Self::Query {
            vol: vol.to_string(),
            source,
        }
    }

    pub(crate) fn inconsistent(vol: &str, source: MetaError) -> Self {
        Self::Inconsistent {
            vol: vol.to_string(),
            source,
        }
    }

    pub fn vol(&self) -> &str {
        match self {
            Self::Query { vol, .. } | Self::Inconsistent { vol, .. } => vol,
        }
    }
}

/// A dispatched task failed remotely.
#[derive(Debug, Error)]
#[error("task {task} failed: {source}")]
pub struct DispatchError {
    pub task: Task,
    #[source]
    pub source: ControllerError,
}
