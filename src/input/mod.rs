//! Input handling
//!
//! Turns a raw byte stream into [`Record`]s. The stream itself (stdin or an
//! argument file) is chosen by the CLI; this module only knows about bytes
//! and a delimiter.

pub mod record;
pub mod tokenizer;

pub use record::Record;
pub use tokenizer::Tokenizer;

/// Default record delimiter
pub const NEWLINE: u8 = b'\n';

/// Delimiter used with `--null`, safe for records that embed newlines
pub const NUL: u8 = b'\0';
