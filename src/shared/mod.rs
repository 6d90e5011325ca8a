//! Shared utilities used across modules

pub mod writer;

pub use writer::SyncWriter;
