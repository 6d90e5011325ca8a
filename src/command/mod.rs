//! Command construction
//!
//! A [`CommandSpec`] is chosen once per run and turns every record into an
//! [`Invocation`]:
//!
//! - **Direct**: a fixed program and arguments, with the record appended as
//!   the final argument.
//! - **Templated**: a template rendered per record and split into words
//!   with shell quoting rules; the first word is the program.

pub mod exec;
pub mod shell_words;
pub mod template;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Local};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::input::Record;
pub use template::{CommandTemplate, InvocationContext};

/// How each record becomes a command line
#[derive(Debug)]
pub enum CommandSpec {
    Direct {
        program: PathBuf,
        args: Vec<OsString>,
    },
    Templated {
        template: CommandTemplate,
        /// Optional program exposed to the template as `Command`
        program: Option<PathBuf>,
    },
}

impl CommandSpec {
    /// Resolve `program` on `PATH` and append each record to `args`
    pub fn direct<I, S>(program: &str, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Ok(CommandSpec::Direct {
            program: resolve_program(program)?,
            args: args.into_iter().map(Into::into).collect(),
        })
    }

    /// Parse `source` as a command template
    pub fn templated(source: &str, program: Option<&str>) -> Result<Self> {
        let template = CommandTemplate::parse(source)?;
        let program = program.map(resolve_program).transpose()?;
        Ok(CommandSpec::Templated { template, program })
    }

    /// Build the command line for one record
    pub fn build(&self, record: &Record, start: DateTime<Local>) -> Result<Invocation> {
        match self {
            CommandSpec::Direct { program, args } => {
                let mut args = args.clone();
                args.push(record.to_os_string());
                Ok(Invocation::new(program.into(), args))
            }
            CommandSpec::Templated { template, program } => {
                let ctx = InvocationContext {
                    command: program
                        .as_deref()
                        .map(|p| p.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    input: record.to_text().into_owned(),
                    start,
                    time: Local::now(),
                };
                let rendered = template.render(&ctx).with_context(|| {
                    format!("Failed to render template `{}` for input `{}`", template.source(), record)
                })?;

                let mut words = shell_words::split(&rendered).into_iter();
                let program = words
                    .next()
                    .ok_or_else(|| anyhow!("Template rendered an empty command for input `{record}`"))?;
                Ok(Invocation::new(program.into(), words.map(Into::into).collect()))
            }
        }
    }
}

fn resolve_program(program: &str) -> Result<PathBuf> {
    which::which(program).with_context(|| format!("Could not find program `{program}`"))
}

/// A fully built command line for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
}

impl Invocation {
    pub fn new(program: OsString, args: Vec<OsString>) -> Self {
        Self { program, args }
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Program followed by arguments
    pub fn argv(&self) -> Vec<&OsStr> {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Path::new(&self.program).display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}
