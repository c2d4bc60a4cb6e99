//! Error types for Guardfile resolution, evaluation, and validation.

use std::{
    cmp::{max, min},
    fmt::Write as _,
    path::{Path, PathBuf},
    result,
};

use thiserror::Error;

use crate::Identity;

/// Convenient result type for the guardfile crate.
pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, Error, Clone)]
/// Errors produced while loading, evaluating, or validating a Guardfile.
pub enum Error {
    /// No Guardfile at the explicit path, or none in any default location.
    #[error("{}", not_found_message(.path.as_deref()))]
    NotFound {
        /// The explicit path that was requested, if any.
        path: Option<PathBuf>,
    },

    /// The Guardfile (or the user override file) exists but could not be read.
    #[error("Error reading file {}", .path.display())]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error message.
        message: String,
    },

    /// Syntax or evaluation fault while interpreting the Guardfile.
    #[error("Invalid Guardfile, original error is: {message}")]
    Invalid {
        /// Optional path of the evaluated source.
        path: Option<PathBuf>,
        /// Optional 1-based line number.
        line: Option<usize>,
        /// Optional 1-based column number.
        col: Option<usize>,
        /// The underlying error message.
        message: String,
        /// Optional excerpt including a caret at the error location.
        excerpt: Option<String>,
    },

    /// Evaluation succeeded but registered no plugins, overall or in a group.
    #[error("{}", no_plugins_message(.group.as_ref()))]
    NoPlugins {
        /// The empty group, or `None` when the whole Guardfile is empty.
        group: Option<Identity>,
    },

    /// A `logger` option was rejected; downgraded to a warning.
    #[error("{0}")]
    InvalidLoggerOption(String),

    /// A `scope` dimension was already set, usually from the command line; downgraded to a warning.
    #[error("Guardfile scope for {dimension} ignored, a {dimension} scope is already set.")]
    ScopeConflict {
        /// The scope dimension (`plugin` or `group`).
        dimension: &'static str,
    },

    /// A watcher action or inline callback failed when called after load.
    #[error("{message}")]
    Script {
        /// Rendered script error, with location and excerpt when available.
        message: String,
    },

    /// A plugin identity that is not in the registry.
    #[error("Unknown Guard plugin {0}")]
    UnknownPlugin(String),
}

/// Render the not-found message for an explicit or a searched path.
fn not_found_message(path: Option<&Path>) -> String {
    match path {
        Some(p) => format!("No Guardfile exists at {}.", p.display()),
        None => "No Guardfile found, please create one.".to_string(),
    }
}

/// Render the empty-registry message for the whole file or one group.
fn no_plugins_message(group: Option<&Identity>) -> String {
    match group {
        Some(g) => format!(
            "No Guard plugins found in the group '{}', please add at least one.",
            g.name()
        ),
        None => "No Guard plugins found in Guardfile, please add at least one.".to_string(),
    }
}

impl Error {
    /// Render a human-friendly error message including location and an excerpt when available.
    pub fn pretty(&self) -> String {
        match self {
            Self::Read { path, message } => {
                format!("Error reading file {}: {}", path.display(), message)
            }
            Self::Invalid {
                path,
                line,
                col,
                message,
                excerpt,
            } => {
                let loc = match (line, col) {
                    (Some(l), Some(c)) => format!("{}:{}", l, c),
                    (Some(l), None) => format!("{}", l),
                    _ => String::new(),
                };
                let head = match path {
                    Some(p) if !loc.is_empty() => {
                        format!("Invalid Guardfile at {}:{}", p.display(), loc)
                    }
                    Some(p) => format!("Invalid Guardfile at {}", p.display()),
                    None if !loc.is_empty() => format!("Invalid Guardfile at line {}", loc),
                    None => "Invalid Guardfile".to_string(),
                };
                match excerpt {
                    Some(ex) => format!("{}, original error is:\n{}\n{}", head, message, ex),
                    None => format!("{}, original error is:\n{}", head, message),
                }
            }
            other => other.to_string(),
        }
    }

    /// Access the optional path attached to this error.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound { path } | Self::Invalid { path, .. } => path.as_deref(),
            Self::Read { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Whether this error aborts a load attempt rather than being reported as a diagnostic.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Read { .. } | Self::Invalid { .. }
        )
    }
}

/// Build a small 2–3 line excerpt with a caret at `(line_no, col_no)`.
pub fn excerpt_at(source: &str, line_no: usize, col_no: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let total = lines.len();
    let start = max(1usize, line_no.saturating_sub(2));
    let end = min(total, line_no + 1);

    let mut out = String::new();
    for n in start..=end {
        let text = lines.get(n - 1).copied().unwrap_or("");
        let _ignored = writeln!(out, " {:>4} | {}", n, text);
        if n == line_no {
            let prefix = format!(" {:>4} | ", n);
            let _ignored = writeln!(
                out,
                "{}{}^",
                " ".repeat(prefix.len()),
                " ".repeat(col_no.saturating_sub(1))
            );
        }
    }
    out
}
