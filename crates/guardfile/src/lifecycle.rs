//! Initial load and reload of a Guardfile against the collaborators.

use std::sync::Arc;

use tracing::debug;

use crate::{
    Error, Interpreter, LoadOptions, Notifier, NotifyImage, NotifyOptions, Registry, RunTask,
    Runner, Ui, resolve,
};

/// Notification after a reload that produced plugins.
const REEVALUATED: &str = "Guardfile has been re-evaluated.";
/// Notification after a reload that produced none.
const NO_GUARDS: &str = "No guards found in Guardfile, please add at least one.";
/// Title of reload notifications.
const REEVALUATE_TITLE: &str = "Guard re-evaluate";

/// Progress of the most recent load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Nothing loaded yet.
    #[default]
    Idle,
    /// Locating and composing the source.
    Resolving,
    /// Evaluating directives.
    Interpreting,
    /// Evaluation finished with at least one plugin, or was skipped.
    Loaded,
    /// Resolution or evaluation failed, or no plugins were declared.
    Failed,
}

/// Step of the most recent reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadPhase {
    /// Asking the runner to stop plugins.
    Stopping,
    /// Clearing plugins.
    ResettingRegistry,
    /// Recreating the default group and restoring the command-line scope.
    ResettingGroups,
    /// Clearing notifiers and pausing notifications.
    ClearingNotifications,
    /// Evaluating the Guardfile again.
    Reinterpreting,
    /// Asking the runner to start plugins.
    Restarting,
    /// Reload produced at least one plugin.
    Succeeded,
    /// Reload produced no plugins or failed to load.
    Failed,
}

/// Owns the registry and drives load and reload against the collaborators.
pub struct Lifecycle {
    /// Registry mutated by each evaluation.
    registry: Registry,
    /// Directive interpreter.
    interpreter: Interpreter,
    /// Diagnostics channel.
    ui: Arc<dyn Ui>,
    /// Notification subsystem.
    notifier: Box<dyn Notifier>,
    /// Plugin runner.
    runner: Box<dyn Runner>,
    /// Load inputs; inline contents are dropped on reload.
    options: LoadOptions,
    /// State of the last load.
    state: LoadState,
    /// Last reload phase reached, if a reload ran.
    phase: Option<ReloadPhase>,
}

impl Lifecycle {
    /// A controller with an empty registry.
    pub fn new(
        registry: Registry,
        ui: Arc<dyn Ui>,
        notifier: Box<dyn Notifier>,
        runner: Box<dyn Runner>,
        options: LoadOptions,
    ) -> Self {
        Self {
            registry,
            interpreter: Interpreter::new(ui.clone()),
            ui,
            notifier,
            runner,
            options,
            state: LoadState::Idle,
            phase: None,
        }
    }

    /// Replace the interpreter, e.g. one with external callback listeners registered.
    pub fn with_interpreter(mut self, interpreter: Interpreter) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Resolve and evaluate the Guardfile.
    ///
    /// Resolution and evaluation faults are reported once through the diagnostics channel and
    /// returned. A Guardfile with no plugins is reported but returns `Ok(0)`.
    pub fn load(&mut self) -> Result<usize, Error> {
        self.set_state(LoadState::Resolving);
        let source = match resolve(&self.options) {
            Ok(Some(source)) => source,
            Ok(None) => {
                self.set_state(LoadState::Loaded);
                return Ok(0);
            }
            Err(e) => return Err(self.fail(e)),
        };
        self.ui.info(&source.provenance.describe());

        self.set_state(LoadState::Interpreting);
        match self
            .interpreter
            .evaluate(&source, &mut self.registry, self.notifier.as_mut())
        {
            Ok(0) => {
                self.set_state(LoadState::Failed);
                Ok(0)
            }
            Ok(count) => {
                self.set_state(LoadState::Loaded);
                Ok(count)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Stop plugins, reset the registry, evaluate the Guardfile again, and restart.
    ///
    /// Returns the new plugin count. The runner is asked to stop exactly once and, when the new
    /// Guardfile declares plugins, to start exactly once.
    pub fn reload(&mut self) -> Result<usize, Error> {
        self.set_phase(ReloadPhase::Stopping);
        self.runner.run(RunTask::Stop, &self.registry);

        self.set_phase(ReloadPhase::ResettingRegistry);
        self.registry.reset_plugins();

        self.set_phase(ReloadPhase::ResettingGroups);
        self.registry.reset_groups();
        self.registry.restore_scope();

        self.set_phase(ReloadPhase::ClearingNotifications);
        self.notifier.clear_notifications();
        let was_enabled = self.notifier.enabled();
        if was_enabled {
            self.notifier.turn_off();
        }

        self.set_phase(ReloadPhase::Reinterpreting);
        self.options.contents = None;
        let loaded = self.load();
        if was_enabled {
            self.notifier.turn_on();
        }

        self.set_phase(ReloadPhase::Restarting);
        let count = match loaded {
            Ok(count) => count,
            Err(e) => {
                self.report_no_guards();
                return Err(e);
            }
        };
        if count == 0 {
            self.report_no_guards();
            return Ok(0);
        }

        self.runner.run(RunTask::Start, &self.registry);
        self.ui.info(REEVALUATED);
        self.notifier.notify(
            REEVALUATED,
            &NotifyOptions {
                title: Some(REEVALUATE_TITLE.to_string()),
                image: NotifyImage::Success,
            },
        );
        self.set_phase(ReloadPhase::Succeeded);
        Ok(count)
    }

    /// Ask the runner to start the loaded plugins.
    pub fn start(&mut self) {
        self.runner.run(RunTask::Start, &self.registry);
    }

    /// Ask the runner to stop every plugin.
    pub fn stop(&mut self) {
        self.runner.run(RunTask::Stop, &self.registry);
    }

    /// The registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The notifier.
    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// Load inputs.
    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// State of the last load.
    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Last reload phase reached.
    pub fn phase(&self) -> Option<ReloadPhase> {
        self.phase
    }

    /// Report a load fault and mark the load failed.
    fn fail(&mut self, e: Error) -> Error {
        self.ui.error(&e.pretty());
        self.set_state(LoadState::Failed);
        e
    }

    /// Notify that the reload produced no plugins.
    fn report_no_guards(&mut self) {
        self.notifier.notify(
            NO_GUARDS,
            &NotifyOptions {
                title: Some(REEVALUATE_TITLE.to_string()),
                image: NotifyImage::Failed,
            },
        );
        self.set_phase(ReloadPhase::Failed);
    }

    /// Record a load state transition.
    fn set_state(&mut self, state: LoadState) {
        debug!(from = ?self.state, to = ?state, "load state");
        self.state = state;
    }

    /// Record a reload phase transition.
    fn set_phase(&mut self, phase: ReloadPhase) {
        debug!(phase = ?phase, "reload");
        self.phase = Some(phase);
    }
}
