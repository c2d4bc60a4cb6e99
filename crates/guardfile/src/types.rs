//! Core registry data types: identities, patterns, watchers, callbacks, plugins, and groups.

use std::{fmt, sync::Arc};

use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Free-form keyword options attached to plugins, groups, notifiers, and the interactor.
pub type Options = serde_json::Map<String, Value>;

/// A declared name that remembers whether it was written as a string or a symbol.
///
/// `guard("rspec")` and `guard(sym("rspec"))` produce distinct identities; equality and
/// hashing include the token kind. Use [`Identity::name`] to compare by bare name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identity {
    /// Declared with a string literal.
    Str(String),
    /// Declared with a symbol token.
    Sym(String),
}

impl Identity {
    /// Construct a string-kind identity.
    pub fn str(name: impl Into<String>) -> Self {
        Self::Str(name.into())
    }

    /// Construct a symbol-kind identity.
    pub fn sym(name: impl Into<String>) -> Self {
        Self::Sym(name.into())
    }

    /// The implicit group every plugin lands in outside a `group` block.
    pub fn default_group() -> Self {
        Self::sym("default")
    }

    /// The bare declared name.
    pub fn name(&self) -> &str {
        match self {
            Self::Str(s) | Self::Sym(s) => s,
        }
    }

    /// Whether this identity was declared as a symbol.
    pub fn is_symbol(&self) -> bool {
        matches!(self, Self::Sym(_))
    }

    /// Render the identity as it was declared (`"name"` or `:name`).
    pub fn token(&self) -> String {
        match self {
            Self::Str(s) => format!("{:?}", s),
            Self::Sym(s) => format!(":{}", s),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.token())
    }
}

/// A file pattern: exact string or regular expression.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Matches a path equal to the string.
    Literal(String),
    /// Matches any path the expression finds a match in.
    Regex(Regex),
}

impl Pattern {
    /// Match `path`, returning the whole match followed by any capture groups.
    pub fn matches(&self, path: &str) -> Option<Vec<String>> {
        match self {
            Self::Literal(s) => (s == path).then(|| vec![path.to_string()]),
            Self::Regex(re) => re.captures(path).map(|caps| {
                caps.iter()
                    .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect()
            }),
        }
    }

    /// The pattern source text.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(s) => s,
            Self::Regex(re) => re.as_str(),
        }
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Regex(a), Self::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "{:?}", s),
            Self::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Handle to a closure compiled into the script runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ScriptFn(pub(crate) u64);

/// A pattern-to-action binding scoped to one plugin.
#[derive(Debug, Clone, Serialize)]
pub struct WatcherEntry {
    /// Pattern matched against changed paths.
    pub pattern: Pattern,
    /// Optional action producing the paths handed to the plugin.
    pub action: Option<ScriptFn>,
}

/// One or several lifecycle event names a callback listens for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Events {
    /// A single event identifier.
    One(String),
    /// An ordered list of event identifiers.
    Many(Vec<String>),
}

impl Events {
    /// Whether `event` is one of the listened events.
    pub fn contains(&self, event: &str) -> bool {
        match self {
            Self::One(e) => e == event,
            Self::Many(list) => list.iter().any(|e| e == event),
        }
    }
}

/// An externally provided callback target.
pub trait CallbackListener: Send + Sync {
    /// Invoked with the plugin identity, the event name, and event arguments.
    fn call(&self, plugin: &Identity, event: &str, args: &[Value]);
}

/// The receiver of a callback: a script closure or an external object.
#[derive(Clone)]
pub enum Listener {
    /// A closure declared in the Guardfile.
    Inline(ScriptFn),
    /// A host-registered listener referenced by name.
    External {
        /// Name the listener was registered under.
        name: String,
        /// The listener capability.
        target: Arc<dyn CallbackListener>,
    },
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(id) => f.debug_tuple("Inline").field(id).finish(),
            Self::External { name, .. } => f
                .debug_struct("External")
                .field("name", name)
                .finish_non_exhaustive(),
        }
    }
}

impl Serialize for Listener {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Inline(_) => serializer.serialize_str("<closure>"),
            Self::External { name, .. } => serializer.serialize_str(name),
        }
    }
}

/// An event-to-listener binding scoped to one plugin.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackEntry {
    /// Events that trigger the listener.
    pub events: Events,
    /// The callback target.
    pub listener: Listener,
}

/// A registered plugin with its resolved options.
#[derive(Debug, Clone, Serialize)]
pub struct PluginEntry {
    /// Declared plugin identity.
    pub identity: Identity,
    /// Group the plugin was declared in.
    pub group: Identity,
    /// Watchers in declaration order.
    pub watchers: Vec<WatcherEntry>,
    /// Callbacks in declaration order.
    pub callbacks: Vec<CallbackEntry>,
    /// Author-supplied keyword options.
    pub options: Options,
}

impl PluginEntry {
    /// A plugin with no watchers, callbacks, or options in the default group.
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            group: Identity::default_group(),
            watchers: Vec::new(),
            callbacks: Vec::new(),
            options: Options::new(),
        }
    }

    /// Boolean option lookup; absent or non-boolean values read as `false`.
    pub fn flag(&self, key: &str) -> bool {
        self.options.get(key).and_then(Value::as_bool).unwrap_or(false)
    }
}

/// A named collection of plugins.
#[derive(Debug, Clone, Serialize)]
pub struct GroupEntry {
    /// Group identity.
    pub identity: Identity,
    /// Group options such as `halt_on_fail`.
    pub options: Options,
    /// Member plugin identities in registration order.
    pub plugins: Vec<Identity>,
}

impl GroupEntry {
    /// An empty group.
    pub fn new(identity: Identity, options: Options) -> Self {
        Self {
            identity,
            options,
            plugins: Vec::new(),
        }
    }
}

/// A notifier declared by the `notification` directive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationConfig {
    /// Notifier backend name.
    pub name: Identity,
    /// Backend options.
    pub options: Options,
    /// Whether the notifier was added on its own rather than from the Guardfile.
    pub standalone: bool,
}
