//! Human-readable and serializable views of a registry.

use std::fmt::Write as _;

use serde::Serialize;

use crate::{
    Identity, InteractorSettings, LoggerSettings, Options, Pattern, PluginEntry, Registry,
    ScopeSettings,
};

/// Snapshot of one plugin.
#[derive(Debug, Clone, Serialize)]
pub struct PluginSummary {
    /// Declared identity token.
    pub identity: Identity,
    /// Owning group.
    pub group: Identity,
    /// Watcher patterns in declaration order.
    pub watchers: Vec<String>,
    /// Number of callbacks.
    pub callbacks: usize,
    /// Free-form options.
    pub options: Options,
}

/// Snapshot of one group and its members.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    /// Group identity.
    pub identity: Identity,
    /// Group options.
    pub options: Options,
    /// Member plugins.
    pub plugins: Vec<PluginSummary>,
}

/// Serializable snapshot of a registry.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    /// Groups in declaration order.
    pub groups: Vec<GroupSummary>,
    /// Logger settings.
    pub logger: LoggerSettings,
    /// Interactor settings.
    pub interactor: InteractorSettings,
    /// Effective scope.
    pub scope: ScopeSettings,
    /// Listener ignore patterns.
    pub ignore: Vec<String>,
    /// Listener filter patterns.
    pub filter: Vec<String>,
}

/// Build a serializable snapshot of `registry`.
pub fn summary(registry: &Registry) -> Summary {
    let groups = registry
        .groups()
        .map(|g| GroupSummary {
            identity: g.identity.clone(),
            options: g.options.clone(),
            plugins: g
                .plugins
                .iter()
                .filter_map(|id| registry.plugin(id))
                .map(plugin_summary)
                .collect(),
        })
        .collect();
    let (ignore, filter) = registry
        .listener()
        .map(|l| (pattern_strings(l.ignored()), pattern_strings(l.filtered())))
        .unwrap_or_default();
    Summary {
        groups,
        logger: registry.logger().clone(),
        interactor: registry.interactor().clone(),
        scope: registry.scope().clone(),
        ignore,
        filter,
    }
}

/// Render patterns as they are displayed.
fn pattern_strings(patterns: &[Pattern]) -> Vec<String> {
    patterns.iter().map(ToString::to_string).collect()
}

/// Snapshot of one plugin.
fn plugin_summary(p: &PluginEntry) -> PluginSummary {
    PluginSummary {
        identity: p.identity.clone(),
        group: p.group.clone(),
        watchers: p.watchers.iter().map(|w| w.pattern.to_string()).collect(),
        callbacks: p.callbacks.len(),
        options: p.options.clone(),
    }
}

/// Render groups, plugins, and plugin options as an indented listing.
///
/// ```text
/// Group default:
///   rspec
///     cmd: "bundle exec rspec"
///     watchers: 2
/// ```
pub fn describe(registry: &Registry) -> String {
    let mut out = String::new();
    for group in registry.groups() {
        if group.plugins.is_empty() {
            continue;
        }
        let _ignored = writeln!(out, "Group {}:", group.identity);
        for id in &group.plugins {
            let Some(plugin) = registry.plugin(id) else {
                continue;
            };
            let _ignored = writeln!(out, "  {}", plugin.identity);
            for (key, value) in &plugin.options {
                let _ignored = writeln!(out, "    {}: {}", key, value);
            }
            if !plugin.watchers.is_empty() {
                let _ignored = writeln!(out, "    watchers: {}", plugin.watchers.len());
            }
            if !plugin.callbacks.is_empty() {
                let _ignored = writeln!(out, "    callbacks: {}", plugin.callbacks.len());
            }
        }
    }
    if out.is_empty() {
        out.push_str("No plugins registered.\n");
    }
    out
}
