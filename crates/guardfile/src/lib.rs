//! Guardfile evaluation: locate the configuration source, evaluate its directives into a plugin
//! registry, and drive initial load and reload against external collaborators.
//!
//! The engine only talks to the outside world through the [`Ui`], [`Notifier`], [`Runner`], and
//! [`FileListener`] traits. Watching files and running plugins is the caller's job.

mod deps;
mod describe;
mod dsl;
mod error;
mod interpreter;
mod lifecycle;
mod normalize;
mod registry;
mod runtime;
mod settings;
mod source;
pub mod test_support;
mod types;

#[cfg(test)]
mod test_dsl;
#[cfg(test)]
mod test_normalize;
#[cfg(test)]
mod test_registry;

pub use deps::{
    FileListener, LogNotifier, Notifier, NotifyImage, NotifyOptions, PatternListener, RunTask,
    Runner, TracingUi, Ui,
};
pub use describe::{GroupSummary, PluginSummary, Summary, describe, summary};
pub use error::{Error, Result, excerpt_at};
pub use interpreter::Interpreter;
pub use lifecycle::{Lifecycle, LoadState, ReloadPhase};
pub use normalize::{
    ScopeRequest, compile_name_filter, guardfile_includes, merge_scope, parse_log_level,
};
pub use registry::Registry;
pub use runtime::ScriptRuntime;
pub use settings::{InteractorSettings, LogLevel, LoggerSettings, ScopeSettings};
pub use source::{
    GUARDFILE, GuardfileContents, HOME_GUARDFILE, LoadOptions, Provenance, SearchPaths, Source,
    USER_CONFIG, resolve,
};
pub use types::{
    CallbackEntry, CallbackListener, Events, GroupEntry, Identity, Listener, NotificationConfig,
    Options, Pattern, PluginEntry, ScriptFn, WatcherEntry,
};
