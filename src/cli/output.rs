//! Status messages for the CLI
//!
//! stdout belongs to the commands being run, so every message here goes to
//! stderr. Styling follows the terminal's color support via `console`.

use console::style;

/// Output handler for consistent CLI formatting
#[derive(Debug, Clone, Copy)]
pub struct Output {
    verbose: bool,
    quiet: bool,
}

impl Output {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        // Errors are always shown, even in quiet mode
        eprintln!("{} {}", style("✖").red(), message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if !self.quiet {
            eprintln!("{} {}", style("⚠").yellow(), message);
        }
    }

    /// Print a verbose summary with styling
    pub fn verbose_summary(&self, icon: &str, message: &str, count: usize) {
        if self.verbose && !self.quiet {
            eprintln!(
                "{} {} {}",
                style(icon).cyan(),
                style(message).dim(),
                style(format!("({count})")).yellow().bold()
            );
        }
    }
}
