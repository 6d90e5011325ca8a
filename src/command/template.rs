//! Command templates
//!
//! A template is parsed once and rendered for every record against an
//! [`InvocationContext`]. Templates use Jinja syntax:
//!
//! ```text
//! convert {{ Input }} {{ noExt(Input) }}.png
//! mv {{ Input }} {{ Input | toLower }}
//! ```
//!
//! Unknown variables are errors at render time, and nothing is HTML-escaped.
//!
//! # Helpers
//!
//! Each helper is registered both as a function and as a filter:
//!
//! | Name           | Effect                                             |
//! |----------------|----------------------------------------------------|
//! | `toUpper`      | uppercase                                          |
//! | `toLower`      | lowercase                                          |
//! | `absolutePath` | absolute path relative to the current directory    |
//! | `basename`     | last path element                                  |
//! | `dirname`      | everything but the last path element               |
//! | `ext`          | extension of the last element, including the dot   |
//! | `noExt`        | the input with that extension removed              |

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use minijinja::{Environment, Error, ErrorKind, UndefinedBehavior};
use serde::Serialize;
use std::path::{self, MAIN_SEPARATOR};

const TEMPLATE_NAME: &str = "command";

/// Values available to a template for one record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvocationContext {
    /// Resolved program path, empty when the template names its own program
    pub command: String,
    /// The record text
    pub input: String,
    /// When the pool was created
    pub start: DateTime<Local>,
    /// When this invocation was rendered
    pub time: DateTime<Local>,
}

/// A parsed command template
pub struct CommandTemplate {
    env: Environment<'static>,
    source: String,
}

impl CommandTemplate {
    /// Parse `source`, failing on syntax errors
    pub fn parse(source: &str) -> Result<Self> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        register_helpers(&mut env);
        env.add_template_owned(TEMPLATE_NAME, source.to_owned())
            .with_context(|| format!("Invalid command template: {source}"))?;

        Ok(Self {
            env,
            source: source.to_owned(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn render(&self, ctx: &InvocationContext) -> Result<String, Error> {
        self.env.get_template(TEMPLATE_NAME)?.render(ctx)
    }
}

impl std::fmt::Debug for CommandTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTemplate")
            .field("source", &self.source)
            .finish()
    }
}

fn register_helpers(env: &mut Environment<'static>) {
    env.add_function("toUpper", to_upper);
    env.add_filter("toUpper", to_upper);
    env.add_function("toLower", to_lower);
    env.add_filter("toLower", to_lower);
    env.add_function("absolutePath", absolute_path);
    env.add_filter("absolutePath", absolute_path);
    env.add_function("basename", basename);
    env.add_filter("basename", basename);
    env.add_function("dirname", dirname);
    env.add_filter("dirname", dirname);
    env.add_function("ext", ext);
    env.add_filter("ext", ext);
    env.add_function("noExt", no_ext);
    env.add_filter("noExt", no_ext);
}

pub fn to_upper(value: String) -> String {
    value.to_uppercase()
}

pub fn to_lower(value: String) -> String {
    value.to_lowercase()
}

pub fn absolute_path(value: String) -> Result<String, Error> {
    // An empty path names the working directory
    let resolved = if value.is_empty() {
        std::env::current_dir()
    } else {
        path::absolute(&value)
    }
    .map_err(|e| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("cannot resolve absolute path of {value:?}: {e}"),
        )
    })?;
    Ok(resolved.to_string_lossy().into_owned())
}

fn is_separator(c: char) -> bool {
    c == '/' || c == MAIN_SEPARATOR
}

pub fn basename(value: String) -> String {
    if value.is_empty() {
        return ".".to_string();
    }
    let trimmed = value.trim_end_matches(is_separator);
    if trimmed.is_empty() {
        return MAIN_SEPARATOR.to_string();
    }
    match trimmed.rfind(is_separator) {
        Some(idx) => trimmed[idx + 1..].to_string(),
        None => trimmed.to_string(),
    }
}

pub fn dirname(value: String) -> String {
    let trimmed = value.trim_end_matches(is_separator);
    if trimmed.is_empty() {
        return if value.is_empty() {
            ".".to_string()
        } else {
            MAIN_SEPARATOR.to_string()
        };
    }
    match trimmed.rfind(is_separator) {
        Some(idx) => {
            let parent = trimmed[..idx].trim_end_matches(is_separator);
            if parent.is_empty() {
                MAIN_SEPARATOR.to_string()
            } else {
                parent.to_string()
            }
        }
        None => ".".to_string(),
    }
}

/// Extension of the final element, starting at its last dot
pub fn ext(value: String) -> String {
    let last = value.rfind(is_separator).map_or(0, |idx| idx + 1);
    match value[last..].rfind('.') {
        Some(dot) => value[last + dot..].to_string(),
        None => String::new(),
    }
}

pub fn no_ext(value: String) -> String {
    let suffix = ext(value.clone());
    value[..value.len() - suffix.len()].to_string()
}
