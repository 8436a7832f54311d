//! The reconciliation engine.
//!
//! A [`Worker`] periodically inspects every archived volume of its archive
//! server and starts the background tasks the volume needs:
//!
//! ```text
//!   tick(now)
//!     │
//!     ├─ get_vol_list / get_state ──► archived volumes
//!     │
//!     ├─ select_tasks ──► [apply…][merge…][replicate…][cleanup…]
//!     │
//!     └─ dispatch ──► TaskRegistry (≤ max_concurrent_tasks, 1 per volume)
//!                          │
//!                          └─ tokio::spawn(controller.execute(task))
//! ```
//!
//! Selection is stateless across ticks. The only shared state is the
//! [`TaskRegistry`], whose slots are released by RAII guards when execution
//! ends.

mod core;
mod dispatch;
mod error;
mod registry;
mod select;

pub use self::core::{
    ReplTarget, TickReport, Worker, DEFAULT_TICK_INTERVAL_SECS, PRIMARY_ARCHIVE_NAME,
};
pub use dispatch::DispatchReport;
pub use error::{DispatchError, SelectionError};
pub use registry::{AdmitRefusal, RunningTask, TaskRegistry};
pub use select::{
    apply_resume_gid, cleanup_target, fresh_apply_due, fresh_apply_target,
    latest_restorable_before, latest_restore_point, merge_due, merge_scope, replication_due,
};
