//! Shared option normalizers and validators used by the interpreter and the registry.

use regex::{Regex, RegexBuilder};

use crate::{Error, Identity, LogLevel, ScopeSettings};

/// Validate a `logger` level given as a string or symbol name.
pub fn parse_log_level(value: &str) -> Result<LogLevel, Error> {
    value.parse().map_err(|()| {
        Error::InvalidLoggerOption(format!(
            "Invalid log level `{}` ignored. Please use either debug, info, warn or error.",
            value
        ))
    })
}

/// Compile `only`/`except` name fragments into one case-insensitive alternation.
///
/// Fragments are joined as regex source, so `"rspec|jasmine"` or `"^rs"` keep their regex
/// meaning. An empty list yields `None`.
pub fn compile_name_filter(fragments: &[String]) -> Result<Option<Regex>, Error> {
    if fragments.is_empty() {
        return Ok(None);
    }
    let alternation = fragments.join("|");
    RegexBuilder::new(&alternation)
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|_| {
            Error::InvalidLoggerOption(format!("Invalid logger filter `{alternation}` ignored."))
        })
}

/// A `scope` directive request; `None` leaves a dimension unspecified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeRequest {
    /// Requested plugins (`plugins:` wins over `plugin:`).
    pub plugins: Option<Vec<Identity>>,
    /// Requested groups (`groups:` wins over `group:`).
    pub groups: Option<Vec<Identity>>,
}

/// Apply a Guardfile scope request under command-line precedence.
///
/// Each dimension is handled independently: a dimension already selected on the command line is
/// left untouched and reported back as a conflict.
pub fn merge_scope(current: &mut ScopeSettings, request: ScopeRequest) -> Vec<&'static str> {
    let mut conflicts = Vec::new();
    if let Some(plugins) = request.plugins {
        if current.plugins.is_empty() {
            current.plugins = plugins;
        } else {
            conflicts.push("plugin");
        }
    }
    if let Some(groups) = request.groups {
        if current.groups.is_empty() {
            current.groups = groups;
        } else {
            conflicts.push("group");
        }
    }
    conflicts
}

/// Quick scan for a `guard` invocation of `name` without evaluating the source.
///
/// Recognises double-quoted, single-quoted, backtick, bare-symbol, and parenthesized-symbol forms:
/// `guard "x"`, `guard 'x'`, `` guard(`x`) ``, `guard :x`, `guard(:x)`, and `guard(sym("x"))`.
pub fn guardfile_includes(source: &str, name: &str) -> bool {
    let n = regex::escape(name);
    let pattern = format!(
        r#"(?m)\bguard\s*\(?\s*(?:"{n}"|'{n}'|`{n}`|:{n}\b|sym\(\s*"{n}"\s*\))"#
    );
    match Regex::new(&pattern) {
        Ok(re) => re.is_match(source),
        Err(_) => false,
    }
}
