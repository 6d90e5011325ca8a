//! Parallel execution engine
//!
//! ```text
//! input ──▶ reader thread ──▶ bounded queue ──▶ N workers ──▶ child processes
//!                                                   │
//!                                                   ▼
//!                                        stdout / stderr SyncWriters
//! ```
//!
//! Workers pull records themselves, so there is no scheduler: whichever
//! worker is free takes the next record. A worker waits on the queue and the
//! [`CancelSignal`] at the same time, which keeps cancellation prompt without
//! polling. Cancellation is cooperative; children that are already running
//! are allowed to finish.
//!
//! # Example
//!
//! ```rust,no_run
//! use parex::command::CommandSpec;
//! use parex::parallel::{PoolOptions, WorkerPool};
//! use parex::shared::SyncWriter;
//! use std::sync::Arc;
//!
//! let command = CommandSpec::direct("echo", ["item:"])?;
//! let pool = WorkerPool::new(
//!     PoolOptions::new(4),
//!     command,
//!     std::io::stdin(),
//!     Arc::new(SyncWriter::new(std::io::stdout())),
//!     Arc::new(SyncWriter::new(std::io::stderr())),
//! )?;
//! let summary = pool.run()?;
//! println!("{} records, {} failed", summary.dispatched, summary.failed);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cancel;
pub mod pool;
pub mod queue;

pub use cancel::{CancelSignal, CancelState};
pub use pool::{PoolOptions, RunSummary, WorkerPool, default_concurrency};
pub use queue::{Producer, RecordQueue};
