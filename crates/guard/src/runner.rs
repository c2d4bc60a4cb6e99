//! Runner that reports plugin start and stop through the log.

use guardfile::{Registry, RunTask, Runner};
use tracing::info;

/// Logs the plugins a task would start or stop; running them is left to plugin hosts.
#[derive(Debug, Default)]
pub struct LogRunner;

impl Runner for LogRunner {
    fn run(&mut self, task: RunTask, registry: &Registry) {
        for plugin in registry.scoped_plugins() {
            info!(
                task = ?task,
                plugin = %plugin.identity,
                group = %plugin.group,
                watchers = plugin.watchers.len(),
                "plugin"
            );
        }
    }
}
