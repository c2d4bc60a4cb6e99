//! Logger, interactor, and scope settings held by the registry.

use std::{fmt, str::FromStr};

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::{Identity, Options};

/// Diagnostic severity accepted by the `logger` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything, including debug chatter.
    Debug,
    /// Informational messages and above.
    #[default]
    Info,
    /// Warnings and errors.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// Lowercase level name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    /// Exact, case-sensitive match against the four level names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(()),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logger configuration from the `logger` directive.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoggerSettings {
    /// Minimum level shown.
    pub level: LogLevel,
    /// Message template, if overridden.
    pub template: Option<String>,
    /// Timestamp format, if overridden.
    pub time_format: Option<String>,
    /// Only show messages from plugins matching this pattern.
    #[serde(serialize_with = "serialize_regex")]
    pub only: Option<Regex>,
    /// Hide messages from plugins matching this pattern.
    #[serde(serialize_with = "serialize_regex")]
    pub except: Option<Regex>,
}

impl LoggerSettings {
    /// Whether a message at `level`, optionally attributed to `plugin`, should be shown.
    pub fn allows(&self, level: LogLevel, plugin: Option<&str>) -> bool {
        if level < self.level {
            return false;
        }
        let Some(plugin) = plugin else {
            return true;
        };
        if let Some(only) = &self.only {
            return only.is_match(plugin);
        }
        if let Some(except) = &self.except {
            return !except.is_match(plugin);
        }
        true
    }
}

/// Serialize an optional regex as its source string.
fn serialize_regex<S: Serializer>(re: &Option<Regex>, serializer: S) -> Result<S::Ok, S::Error> {
    match re {
        Some(re) => serializer.serialize_some(re.as_str()),
        None => serializer.serialize_none(),
    }
}

/// Interactive console settings from the `interactor` directive.
#[derive(Debug, Clone, Serialize)]
pub struct InteractorSettings {
    /// Whether the interactor runs at all.
    pub enabled: bool,
    /// Free-form interactor options.
    pub options: Options,
}

impl Default for InteractorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            options: Options::new(),
        }
    }
}

/// The active subset of plugins and groups a run targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScopeSettings {
    /// Selected plugin identities.
    pub plugins: Vec<Identity>,
    /// Selected group identities.
    pub groups: Vec<Identity>,
}

impl ScopeSettings {
    /// Whether neither dimension selects anything.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty() && self.groups.is_empty()
    }
}
