//! Child process execution
//!
//! Children get `/dev/null` as stdin and have both output streams captured,
//! so a record's output can be written out as one contiguous block. On Unix
//! each child is started in its own process group: an interrupt typed at the
//! terminal reaches only `parex`, which then lets running children finish.

use std::io;
use std::process::{Command, Output, Stdio};

use super::Invocation;

/// Spawn the invocation, wait for it and collect its output
pub fn run(invocation: &Invocation) -> io::Result<Output> {
    let mut command = Command::new(invocation.program());
    command
        .args(invocation.args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    detach_process_group(&mut command);
    command.output()
}

#[cfg(unix)]
fn detach_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn detach_process_group(_command: &mut Command) {}
