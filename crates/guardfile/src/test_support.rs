//! Recording collaborators for tests.
//!
//! Each recorder shares its log through an `Arc<Mutex<..>>`, so a test can keep a handle after
//! boxing the recorder into a [`Lifecycle`](crate::Lifecycle).

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::{
    CallbackListener, FileListener, Identity, NotificationConfig, Notifier, NotifyOptions,
    Options, Pattern, Registry, RunTask, Runner, Ui,
};

/// Severity of a recorded diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiKind {
    /// `error`
    Error,
    /// `warning`
    Warning,
    /// `info`
    Info,
    /// `deprecation`
    Deprecation,
}

/// [`Ui`] that records every message.
#[derive(Debug, Clone, Default)]
pub struct RecordingUi {
    /// Messages in emission order.
    pub messages: Arc<Mutex<Vec<(UiKind, String)>>>,
}

impl RecordingUi {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages of one kind.
    pub fn of(&self, kind: UiKind) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Recorded errors.
    pub fn errors(&self) -> Vec<String> {
        self.of(UiKind::Error)
    }

    /// Recorded warnings.
    pub fn warnings(&self) -> Vec<String> {
        self.of(UiKind::Warning)
    }

    /// Recorded deprecations.
    pub fn deprecations(&self) -> Vec<String> {
        self.of(UiKind::Deprecation)
    }

    /// Recorded info messages.
    pub fn infos(&self) -> Vec<String> {
        self.of(UiKind::Info)
    }

    /// Record one message.
    fn push(&self, kind: UiKind, message: &str) {
        self.messages.lock().push((kind, message.to_string()));
    }
}

impl Ui for RecordingUi {
    fn error(&self, message: &str) {
        self.push(UiKind::Error, message);
    }

    fn warning(&self, message: &str) {
        self.push(UiKind::Warning, message);
    }

    fn info(&self, message: &str) {
        self.push(UiKind::Info, message);
    }

    fn deprecation(&self, message: &str) {
        self.push(UiKind::Deprecation, message);
    }
}

/// Observable notifier state.
#[derive(Debug, Clone, Default)]
pub struct NotifierLog {
    /// Whether notifications are enabled.
    pub enabled: bool,
    /// Registered backends.
    pub notifications: Vec<NotificationConfig>,
    /// Dispatched notifications.
    pub sent: Vec<(String, NotifyOptions)>,
    /// `turn_on`/`turn_off` calls in order (`true` for on).
    pub toggles: Vec<bool>,
}

/// [`Notifier`] that records calls.
///
/// `notifications()` reads a snapshot kept in the recorder itself, mirrored into the shared log
/// on every change.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    /// Shared log.
    pub log: Arc<Mutex<NotifierLog>>,
    /// Local copy of registered backends.
    notifications: Vec<NotificationConfig>,
}

impl RecordingNotifier {
    /// A recorder starting enabled or disabled.
    pub fn new(enabled: bool) -> Self {
        let notifier = Self::default();
        notifier.log.lock().enabled = enabled;
        notifier
    }

    /// Copy the local backend list into the shared log.
    fn sync(&self) {
        self.log.lock().notifications = self.notifications.clone();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, message: &str, opts: &NotifyOptions) {
        self.log.lock().sent.push((message.to_string(), opts.clone()));
    }

    fn add_notification(&mut self, name: &Identity, opts: &Options, standalone: bool) {
        self.notifications.push(NotificationConfig {
            name: name.clone(),
            options: opts.clone(),
            standalone,
        });
        self.sync();
    }

    fn turn_on(&mut self) {
        let mut log = self.log.lock();
        log.enabled = true;
        log.toggles.push(true);
    }

    fn turn_off(&mut self) {
        let mut log = self.log.lock();
        log.enabled = false;
        log.toggles.push(false);
    }

    fn enabled(&self) -> bool {
        self.log.lock().enabled
    }

    fn notifications(&self) -> &[NotificationConfig] {
        &self.notifications
    }

    fn clear_notifications(&mut self) {
        self.notifications.clear();
        self.sync();
    }
}

/// One recorded runner call with the plugin count it saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunCall {
    /// Requested task.
    pub task: RunTask,
    /// Plugins in the registry at call time.
    pub plugins: usize,
}

/// [`Runner`] that records calls.
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    /// Calls in order.
    pub calls: Arc<Mutex<Vec<RunCall>>>,
}

impl RecordingRunner {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requested tasks in order.
    pub fn tasks(&self) -> Vec<RunTask> {
        self.calls.lock().iter().map(|c| c.task).collect()
    }
}

impl Runner for RecordingRunner {
    fn run(&mut self, task: RunTask, registry: &Registry) {
        self.calls.lock().push(RunCall {
            task,
            plugins: registry.plugin_count(),
        });
    }
}

/// A listener operation as seen by [`RecordingListener`].
#[derive(Debug, Clone, PartialEq)]
pub enum ListenerCall {
    /// `ignore`
    Ignore(Vec<Pattern>),
    /// `ignore_replace`
    IgnoreReplace(Vec<Pattern>),
    /// `filter`
    Filter(Vec<Pattern>),
    /// `filter_replace`
    FilterReplace(Vec<Pattern>),
}

/// [`FileListener`] that records operations and keeps the resulting patterns.
#[derive(Debug, Default)]
pub struct RecordingListener {
    /// Operations in order.
    pub calls: Arc<Mutex<Vec<ListenerCall>>>,
    /// Ignore patterns.
    ignore: Vec<Pattern>,
    /// Filter patterns.
    filter: Vec<Pattern>,
}

impl RecordingListener {
    /// A recorder and a handle to its call log.
    pub fn new() -> (Self, Arc<Mutex<Vec<ListenerCall>>>) {
        let listener = Self::default();
        let calls = listener.calls.clone();
        (listener, calls)
    }
}

impl FileListener for RecordingListener {
    fn ignore(mut self: Box<Self>, patterns: Vec<Pattern>) -> Box<dyn FileListener> {
        self.calls.lock().push(ListenerCall::Ignore(patterns.clone()));
        self.ignore.extend(patterns);
        self
    }

    fn ignore_replace(mut self: Box<Self>, patterns: Vec<Pattern>) -> Box<dyn FileListener> {
        self.calls
            .lock()
            .push(ListenerCall::IgnoreReplace(patterns.clone()));
        self.ignore = patterns;
        self
    }

    fn filter(mut self: Box<Self>, patterns: Vec<Pattern>) -> Box<dyn FileListener> {
        self.calls.lock().push(ListenerCall::Filter(patterns.clone()));
        self.filter.extend(patterns);
        self
    }

    fn filter_replace(mut self: Box<Self>, patterns: Vec<Pattern>) -> Box<dyn FileListener> {
        self.calls
            .lock()
            .push(ListenerCall::FilterReplace(patterns.clone()));
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

/// [`CallbackListener`] that records invocations.
#[derive(Debug, Clone, Default)]
pub struct RecordingCallback {
    /// `(plugin, event, args)` in order.
    pub calls: Arc<Mutex<Vec<(Identity, String, Vec<Value>)>>>,
}

impl CallbackListener for RecordingCallback {
    fn call(&self, plugin: &Identity, event: &str, args: &[Value]) {
        self.calls
            .lock()
            .push((plugin.clone(), event.to_string(), args.to_vec()));
    }
}
