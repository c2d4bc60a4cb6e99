//! The registry: plugins, groups, and settings produced by evaluating a Guardfile.

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    Error, FileListener, GroupEntry, Identity, InteractorSettings, Listener, LoggerSettings,
    Options, PatternListener, PluginEntry, ScopeSettings, normalize::guardfile_includes,
    runtime::{ScriptRuntime, action_paths},
};

/// Aggregate root holding everything a Guardfile declares.
///
/// Created once per process and mutated in place by each evaluation; the lifecycle controller
/// resets plugins and groups before a reload.
pub struct Registry {
    /// Plugins keyed by declared identity, in registration order.
    plugins: IndexMap<Identity, PluginEntry>,
    /// Groups keyed by identity, in declaration order.
    groups: IndexMap<Identity, GroupEntry>,
    /// Logger settings.
    logger: LoggerSettings,
    /// Interactor settings.
    interactor: InteractorSettings,
    /// Effective scope: command-line scope merged with the Guardfile's `scope` directive.
    scope: ScopeSettings,
    /// Scope selected on the command line.
    cli_scope: ScopeSettings,
    /// Filesystem listener pattern configuration.
    listener: Option<Box<dyn FileListener>>,
    /// Runtime for watcher actions and inline callbacks.
    runtime: Option<ScriptRuntime>,
    /// Composed text of the last evaluated Guardfile.
    source: String,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("plugins", &self.plugins.keys().collect::<Vec<_>>())
            .field("groups", &self.groups.keys().collect::<Vec<_>>())
            .field("logger", &self.logger)
            .field("interactor", &self.interactor)
            .field("scope", &self.scope)
            .field("runtime", &self.runtime)
            .finish_non_exhaustive()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// An empty registry holding only the implicit `:default` group.
    pub fn new() -> Self {
        let mut registry = Self {
            plugins: IndexMap::new(),
            groups: IndexMap::new(),
            logger: LoggerSettings::default(),
            interactor: InteractorSettings::default(),
            scope: ScopeSettings::default(),
            cli_scope: ScopeSettings::default(),
            listener: Some(Box::new(PatternListener::new())),
            runtime: None,
            source: String::new(),
        };
        registry.reset_groups();
        registry
    }

    /// An empty registry with a command-line scope.
    pub fn with_scope(scope: ScopeSettings) -> Self {
        let mut registry = Self::new();
        registry.cli_scope = scope.clone();
        registry.scope = scope;
        registry
    }

    /// Replace the filesystem listener.
    pub fn with_listener(mut self, listener: Box<dyn FileListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Register a plugin under its group, replacing an earlier entry with the same identity.
    pub fn add_plugin(&mut self, plugin: PluginEntry) {
        if let Some(previous) = self.plugins.get(&plugin.identity)
            && previous.group != plugin.group
            && let Some(group) = self.groups.get_mut(&previous.group)
        {
            group.plugins.retain(|p| p != &plugin.identity);
        }

        let group = self
            .groups
            .entry(plugin.group.clone())
            .or_insert_with(|| GroupEntry::new(plugin.group.clone(), Options::new()));
        if !group.plugins.contains(&plugin.identity) {
            group.plugins.push(plugin.identity.clone());
        }

        trace!(plugin = %plugin.identity.token(), group = %plugin.group, "plugin registered");
        self.plugins.insert(plugin.identity.clone(), plugin);
    }

    /// Declare a group, merging options into an existing entry.
    pub fn add_group(&mut self, identity: Identity, options: Options) {
        match self.groups.get_mut(&identity) {
            Some(group) => group.options.extend(options),
            None => {
                self.groups
                    .insert(identity.clone(), GroupEntry::new(identity, options));
            }
        }
    }

    /// Clear plugins and groups, and drop the script runtime.
    pub fn reset_plugins(&mut self) {
        debug!(plugins = self.plugins.len(), "plugins reset");
        self.plugins.clear();
        self.groups.clear();
        self.runtime = None;
    }

    /// Clear groups, recreating the implicit `:default` group.
    pub fn reset_groups(&mut self) {
        self.groups.clear();
        let default = Identity::default_group();
        self.groups
            .insert(default.clone(), GroupEntry::new(default, Options::new()));
    }

    /// Restore the effective scope to the command-line scope.
    pub fn restore_scope(&mut self) {
        self.scope = self.cli_scope.clone();
    }

    /// Number of registered plugins.
    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Look up a plugin by declared identity.
    pub fn plugin(&self, identity: &Identity) -> Option<&PluginEntry> {
        self.plugins.get(identity)
    }

    /// First plugin whose bare name is `name`, regardless of token kind.
    pub fn plugin_named(&self, name: &str) -> Option<&PluginEntry> {
        self.plugins.values().find(|p| p.identity.name() == name)
    }

    /// Plugins in registration order.
    pub fn plugins(&self) -> impl Iterator<Item = &PluginEntry> {
        self.plugins.values()
    }

    /// Look up a group by identity.
    pub fn group(&self, identity: &Identity) -> Option<&GroupEntry> {
        self.groups.get(identity)
    }

    /// Groups in declaration order.
    pub fn groups(&self) -> impl Iterator<Item = &GroupEntry> {
        self.groups.values()
    }

    /// Quick check whether the last evaluated source invokes `guard` for `name`.
    pub fn contains_plugin(&self, name: &str) -> bool {
        guardfile_includes(&self.source, name)
    }

    /// Composed text of the last evaluated Guardfile.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Record the composed text of the evaluated Guardfile.
    pub(crate) fn set_source(&mut self, source: String) {
        self.source = source;
    }

    /// Logger settings.
    pub fn logger(&self) -> &LoggerSettings {
        &self.logger
    }

    /// Replace the logger settings.
    pub fn set_logger(&mut self, logger: LoggerSettings) {
        self.logger = logger;
    }

    /// Interactor settings.
    pub fn interactor(&self) -> &InteractorSettings {
        &self.interactor
    }

    /// Replace the interactor settings.
    pub fn set_interactor(&mut self, interactor: InteractorSettings) {
        self.interactor = interactor;
    }

    /// Effective scope.
    pub fn scope(&self) -> &ScopeSettings {
        &self.scope
    }

    /// Replace the effective scope.
    pub fn set_scope(&mut self, scope: ScopeSettings) {
        self.scope = scope;
    }

    /// Scope selected on the command line.
    pub fn cli_scope(&self) -> &ScopeSettings {
        &self.cli_scope
    }

    /// Filesystem listener.
    pub fn listener(&self) -> Option<&dyn FileListener> {
        self.listener.as_deref()
    }

    /// Apply `f` to the listener and store the listener it returns.
    pub fn update_listener(
        &mut self,
        f: impl FnOnce(Box<dyn FileListener>) -> Box<dyn FileListener>,
    ) {
        if let Some(listener) = self.listener.take() {
            self.listener = Some(f(listener));
        }
    }

    /// Runtime for the evaluated Guardfile's closures, if any were declared.
    pub fn runtime(&self) -> Option<&ScriptRuntime> {
        self.runtime.as_ref()
    }

    /// Replace the script runtime.
    pub(crate) fn set_runtime(&mut self, runtime: Option<ScriptRuntime>) {
        self.runtime = runtime;
    }

    /// Plugins the runner targets.
    ///
    /// The plugin scope wins when set, matched by name; otherwise plugins in the scoped groups;
    /// otherwise every plugin.
    pub fn scoped_plugins(&self) -> Vec<&PluginEntry> {
        if !self.scope.plugins.is_empty() {
            return self
                .plugins
                .values()
                .filter(|p| self.scope.plugins.iter().any(|s| s.name() == p.identity.name()))
                .collect();
        }
        if !self.scope.groups.is_empty() {
            return self
                .plugins
                .values()
                .filter(|p| self.scope.groups.iter().any(|s| s.name() == p.group.name()))
                .collect();
        }
        self.plugins.values().collect()
    }

    /// Paths from `files` that the watchers of `plugin` select, after running their actions.
    ///
    /// Results are de-duplicated in first-seen order.
    pub fn match_files<S: AsRef<str>>(
        &self,
        plugin: &Identity,
        files: &[S],
    ) -> Result<Vec<String>, Error> {
        let entry = self
            .plugins
            .get(plugin)
            .ok_or_else(|| Error::UnknownPlugin(plugin.token()))?;
        let any_return = entry.flag("any_return");

        let mut out: Vec<String> = Vec::new();
        for watcher in &entry.watchers {
            for file in files {
                let file = file.as_ref();
                let Some(matches) = watcher.pattern.matches(file) else {
                    continue;
                };
                let paths = match watcher.action {
                    None => vec![file.to_string()],
                    Some(action) => {
                        let runtime = self.runtime.as_ref().ok_or_else(|| Error::Script {
                            message: "no script runtime for watcher action".to_string(),
                        })?;
                        action_paths(runtime.call_action(action, &matches)?, any_return)
                    }
                };
                for path in paths {
                    if !out.contains(&path) {
                        out.push(path);
                    }
                }
            }
        }
        trace!(plugin = %plugin.token(), matched = out.len(), "files matched");
        Ok(out)
    }

    /// Invoke every callback of `plugin` listening for `event`, in declaration order.
    pub fn run_callbacks(
        &self,
        plugin: &Identity,
        event: &str,
        args: &[Value],
    ) -> Result<(), Error> {
        let entry = self
            .plugins
            .get(plugin)
            .ok_or_else(|| Error::UnknownPlugin(plugin.token()))?;
        for callback in entry.callbacks.iter().filter(|c| c.events.contains(event)) {
            match &callback.listener {
                Listener::Inline(f) => {
                    let runtime = self.runtime.as_ref().ok_or_else(|| Error::Script {
                        message: "no script runtime for inline callback".to_string(),
                    })?;
                    runtime.call_callback(*f, plugin, event, args)?;
                }
                Listener::External { target, .. } => target.call(plugin, event, args),
            }
        }
        Ok(())
    }
}
