//! walb-worker - background task scheduler for walb archive servers
//!
//! The worker keeps the volumes of one archive server healthy without
//! operator involvement. Each tick it reads the volumes' apply progress,
//! diff listings and restore points, and starts the tasks they need:
//!
//! - **apply** - resume an interrupted apply, or fold old diffs into the base
//! - **merge** - combine runs of small diffs
//! - **replicate** - push a volume to a configured replication target
//! - **cleanup** - delete diffs already applied and past the keep period
//!
//! The command layer that talks to the servers is abstracted behind the
//! [`controller::Controller`] trait.
//!
//! ```ignore
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use walb_worker::config::Config;
//! use walb_worker::worker::Worker;
//!
//! let config = Config::load()?;
//! let worker = Worker::new(config, Arc::new(my_controller));
//!
//! let shutdown = CancellationToken::new();
//! worker.run(shutdown.clone()).await;
//! ```

pub mod config;
pub mod controller;
pub mod logging;
pub mod meta;
pub mod server;
pub mod task;
pub mod worker;

/// Version of the walb-worker library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
