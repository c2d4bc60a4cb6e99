//! Collaborator seams: diagnostics, notifier, runner, and file listener.
//!
//! The engine only calls into these traits; concrete watchers, notifier backends, and the
//! interactive console live elsewhere. [`TracingUi`], [`LogNotifier`], and [`PatternListener`]
//! are the in-crate defaults.

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::{Identity, LogLevel, LoggerSettings, NotificationConfig, Options, Pattern, Registry};

// ---- Diagnostics ----

/// User-facing diagnostics channel. Fire-and-forget.
pub trait Ui: Send + Sync {
    /// Report an error.
    fn error(&self, message: &str);
    /// Report a warning.
    fn warning(&self, message: &str);
    /// Report an informational message.
    fn info(&self, message: &str);
    /// Report use of deprecated Guardfile syntax.
    fn deprecation(&self, message: &str);
    /// Adopt logger settings from a freshly evaluated Guardfile.
    fn apply_logger(&self, _settings: &LoggerSettings) {}
}

/// [`Ui`] that emits `tracing` events, filtered by the Guardfile's logger settings.
#[derive(Debug, Default)]
pub struct TracingUi {
    /// Settings from the last `apply_logger` call.
    settings: Mutex<LoggerSettings>,
}

impl TracingUi {
    /// A UI with default (`info`, unfiltered) settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the current settings let a message at `level` through.
    fn allows(&self, level: LogLevel) -> bool {
        self.settings.lock().allows(level, None)
    }
}

impl Ui for TracingUi {
    fn error(&self, message: &str) {
        error!(target: "guardfile::ui", "{}", message);
    }

    fn warning(&self, message: &str) {
        if self.allows(LogLevel::Warn) {
            warn!(target: "guardfile::ui", "{}", message);
        }
    }

    fn info(&self, message: &str) {
        if self.allows(LogLevel::Info) {
            info!(target: "guardfile::ui", "{}", message);
        }
    }

    fn deprecation(&self, message: &str) {
        if self.allows(LogLevel::Warn) {
            warn!(target: "guardfile::ui", deprecation = true, "{}", message);
        }
    }

    fn apply_logger(&self, settings: &LoggerSettings) {
        debug!(level = %settings.level, "logger settings applied");
        *self.settings.lock() = settings.clone();
    }
}

// ---- Notifier ----

/// Visual style of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyImage {
    /// Neutral.
    #[default]
    Info,
    /// Success.
    Success,
    /// Failure.
    Failed,
    /// Pending.
    Pending,
}

/// Options for a single notification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotifyOptions {
    /// Notification title.
    pub title: Option<String>,
    /// Notification image/style.
    pub image: NotifyImage,
}

/// Notification subsystem.
pub trait Notifier {
    /// Dispatch a notification. Blocking.
    fn notify(&mut self, message: &str, opts: &NotifyOptions);
    /// Register a notifier backend.
    fn add_notification(&mut self, name: &Identity, opts: &Options, standalone: bool);
    /// Enable notifications.
    fn turn_on(&mut self);
    /// Disable notifications.
    fn turn_off(&mut self);
    /// Whether notifications are enabled.
    fn enabled(&self) -> bool;
    /// Registered notifier backends.
    fn notifications(&self) -> &[NotificationConfig];
    /// Forget all registered notifier backends.
    fn clear_notifications(&mut self);
}

/// [`Notifier`] that writes notifications to the `tracing` log.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    /// Whether notifications are dispatched.
    enabled: bool,
    /// Registered backends.
    notifications: Vec<NotificationConfig>,
}

impl LogNotifier {
    /// A notifier that starts enabled or disabled.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            notifications: Vec::new(),
        }
    }
}

impl Notifier for LogNotifier {
    fn notify(&mut self, message: &str, opts: &NotifyOptions) {
        if !self.enabled {
            return;
        }
        let backends: Vec<&str> = self.notifications.iter().map(|n| n.name.name()).collect();
        info!(
            image = ?opts.image,
            title = opts.title.as_deref().unwrap_or("Guard"),
            backends = ?backends,
            "{}",
            message
        );
    }

    fn add_notification(&mut self, name: &Identity, opts: &Options, standalone: bool) {
        debug!(notifier = %name, standalone, "notifier registered");
        self.notifications.push(NotificationConfig {
            name: name.clone(),
            options: opts.clone(),
            standalone,
        });
    }

    fn turn_on(&mut self) {
        self.enabled = true;
    }

    fn turn_off(&mut self) {
        self.enabled = false;
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn notifications(&self) -> &[NotificationConfig] {
        &self.notifications
    }

    fn clear_notifications(&mut self) {
        self.notifications.clear();
    }
}

// ---- Runner ----

/// A runner task the lifecycle asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTask {
    /// Start every plugin in scope.
    Start,
    /// Stop every running plugin.
    Stop,
}

/// Executes plugin lifecycle tasks. Calls block until the task completes.
pub trait Runner {
    /// Run `task` against the plugins in `registry`.
    fn run(&mut self, task: RunTask, registry: &Registry);
}

// ---- Listener ----

/// Filesystem listener pattern configuration.
///
/// Each operation consumes the listener and returns the updated one, which the caller writes
/// back into shared state.
pub trait FileListener {
    /// Add to the ignore list.
    fn ignore(self: Box<Self>, patterns: Vec<Pattern>) -> Box<dyn FileListener>;
    /// Replace the ignore list.
    fn ignore_replace(self: Box<Self>, patterns: Vec<Pattern>) -> Box<dyn FileListener>;
    /// Add to the filter list.
    fn filter(self: Box<Self>, patterns: Vec<Pattern>) -> Box<dyn FileListener>;
    /// Replace the filter list.
    fn filter_replace(self: Box<Self>, patterns: Vec<Pattern>) -> Box<dyn FileListener>;
    /// Current ignore patterns.
    fn ignored(&self) -> &[Pattern];
    /// Current filter patterns.
    fn filtered(&self) -> &[Pattern];
}

/// Listener state that only tracks ignore and filter patterns.
#[derive(Debug, Clone, Default)]
pub struct PatternListener {
    /// Ignore patterns.
    ignore: Vec<Pattern>,
    /// Filter patterns.
    filter: Vec<Pattern>,
}

impl PatternListener {
    /// An empty listener.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileListener for PatternListener {
    fn ignore(mut self: Box<Self>, patterns: Vec<Pattern>) -> Box<dyn FileListener> {
        self.ignore.extend(patterns);
        self
    }

    fn ignore_replace(mut self: Box<Self>, patterns: Vec<Pattern>) -> Box<dyn FileListener> {
        self.ignore = patterns;
        self
    }

    fn filter(mut self: Box<Self>, patterns: Vec<Pattern>) -> Box<dyn FileListener> {
        self.filter.extend(patterns);
        self
    }

    fn filter_replace(mut self: Box<Self>, patterns: Vec<Pattern>) -> Box<dyn FileListener> {
        self.filter = patterns;
        self
    }

    fn ignored(&self) -> &[Pattern] {
        &self.ignore
    }

    fn filtered(&self) -> &[Pattern] {
        &self.filter
    }
}
