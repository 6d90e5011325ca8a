//! # parex - run a command for every record of input, in parallel
//!
//! parex reads records (lines, or NUL-separated tokens) from stdin or a file
//! and runs one external command per record, keeping up to N commands in
//! flight. Each command's output is written as one uninterrupted block, and
//! Ctrl-C stops taking new work while letting running commands finish.
//!
//! ## Quick Start
//!
//! ```bash
//! # Compress every log file, four at a time
//! find . -name '*.log' | parex -j 4 gzip
//!
//! # NUL-separated input, record appended as the last argument
//! find . -print0 | parex -0 ls -ld
//!
//! # Build the whole command line from a template
//! ls *.jpg | parex -t 'convert {{ Input }} {{ noExt(Input) }}.png'
//! ```
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use parex::command::CommandSpec;
//! use parex::parallel::{PoolOptions, WorkerPool};
//! use parex::shared::SyncWriter;
//! use std::sync::Arc;
//!
//! let command = CommandSpec::templated("echo {{ Input | toUpper }}", None)?;
//! let pool = WorkerPool::new(
//!     PoolOptions::new(2),
//!     command,
//!     "a\nb\nc\n".as_bytes(),
//!     Arc::new(SyncWriter::new(std::io::stdout())),
//!     Arc::new(SyncWriter::new(std::io::stderr())),
//! )?;
//! let summary = pool.run()?;
//! assert_eq!(summary.dispatched, 3);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cli;
pub mod command;
pub mod config;
pub mod input;
pub mod parallel;
pub mod shared;

pub use cli::{Cli, Output};
pub use config::ParexConfig;

/// Result type alias for parex operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
