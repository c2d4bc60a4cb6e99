//! Evaluate composed Guardfile text and commit the result into a [`Registry`].

use std::{
    collections::BTreeMap,
    mem,
    path::Path,
    sync::{Arc, Mutex},
};

use rhai::{
    AST, Dynamic, Engine, EvalAltResult, Position, Scope, module_resolvers::DummyModuleResolver,
};
use tracing::{debug, info};

use crate::{
    CallbackListener, Error, Notifier, Registry, Source, Ui,
    dsl::{
        BuilderState, GroupDecl, ListenerOpKind, find_directive_error, lock_unpoisoned,
        register_dsl,
    },
    error::excerpt_at,
    runtime::ScriptRuntime,
};

/// Evaluates Guardfiles against the directive vocabulary.
pub struct Interpreter {
    /// Diagnostics channel handed to directives.
    ui: Arc<dyn Ui>,
    /// External callback listeners reachable through `listener("name")`.
    listeners: BTreeMap<String, Arc<dyn CallbackListener>>,
}

/// Everything a successful evaluation produced, before it is committed.
struct Evaluation {
    /// Builder state drained from the engine.
    state: BuilderState,
    /// Runtime for captured closures, when any were declared.
    runtime: Option<ScriptRuntime>,
}

impl Interpreter {
    /// An interpreter reporting through `ui`.
    pub fn new(ui: Arc<dyn Ui>) -> Self {
        Self {
            ui,
            listeners: BTreeMap::new(),
        }
    }

    /// Make an external callback listener available to `callback(listener(name), ..)`.
    pub fn register_listener(
        &mut self,
        name: impl Into<String>,
        listener: Arc<dyn CallbackListener>,
    ) {
        self.listeners.insert(name.into(), listener);
    }

    /// Evaluate `source`, commit plugins and settings into `registry`, and register notifiers.
    ///
    /// Returns the resulting plugin count. An empty registry, or an empty declared group, is
    /// reported through the diagnostics channel rather than returned as an error. On error nothing
    /// is committed.
    pub fn evaluate(
        &self,
        source: &Source,
        registry: &mut Registry,
        notifier: &mut dyn Notifier,
    ) -> Result<usize, Error> {
        let evaluation = self.run(&source.text, source.path(), registry)?;
        let declared = evaluation.state.groups.clone();
        commit(evaluation, registry, notifier);
        registry.set_source(source.text.clone());

        self.report_empty(registry, &declared);
        self.ui.apply_logger(registry.logger());

        let count = registry.plugin_count();
        info!(plugins = count, groups = registry.groups().count(), "guardfile evaluated");
        Ok(count)
    }

    /// Compile and evaluate `text`, draining the builder state.
    #[allow(
        clippy::arc_with_non_send_sync,
        reason = "rhai is built without `sync`; the state never leaves this thread"
    )]
    fn run(
        &self,
        text: &str,
        path: Option<&Path>,
        registry: &Registry,
    ) -> Result<Evaluation, Error> {
        let state = Arc::new(Mutex::new(BuilderState::new(
            registry.logger().clone(),
            registry.interactor().clone(),
            registry.scope().clone(),
        )));

        let mut engine = Engine::new();
        configure_engine(&mut engine);
        register_dsl(
            &mut engine,
            state.clone(),
            self.ui.clone(),
            self.listeners.clone(),
        );

        let mut scope = Scope::new();
        let ast = compile(&engine, text, path)?;
        eval(&engine, &mut scope, &ast, text, path)?;

        let mut state = mem::take(&mut *lock_unpoisoned(&state));
        let fns = mem::take(&mut state.script_fns);
        let runtime = if fns.is_empty() {
            None
        } else {
            Some(ScriptRuntime::new(engine, ast, fns, text.to_string(), path))
        };
        Ok(Evaluation { state, runtime })
    }

    /// Report declared groups without plugins, then an empty registry.
    fn report_empty(&self, registry: &Registry, declared: &[GroupDecl]) {
        for decl in declared {
            let empty = registry
                .group(&decl.identity)
                .is_none_or(|g| g.plugins.is_empty());
            if empty {
                self.ui.error(
                    &Error::NoPlugins {
                        group: Some(decl.identity.clone()),
                    }
                    .to_string(),
                );
            }
        }
        if registry.plugin_count() == 0 {
            self.ui.error(&Error::NoPlugins { group: None }.to_string());
        }
    }
}

/// Move an evaluation's results into the registry and notifier.
fn commit(evaluation: Evaluation, registry: &mut Registry, notifier: &mut dyn Notifier) {
    let Evaluation { state, runtime } = evaluation;

    for group in state.groups {
        registry.add_group(group.identity, group.options);
    }
    for plugin in state.plugins {
        registry.add_plugin(plugin);
    }
    for n in &state.notifications {
        notifier.add_notification(&n.name, &n.options, n.standalone);
    }

    registry.set_logger(state.logger);
    registry.set_interactor(state.interactor);
    registry.set_scope(state.scope);

    for op in state.listener_ops {
        debug!(op = ?op.kind, patterns = op.patterns.len(), "listener patterns updated");
        registry.update_listener(|listener| match op.kind {
            ListenerOpKind::Ignore => listener.ignore(op.patterns),
            ListenerOpKind::IgnoreReplace => listener.ignore_replace(op.patterns),
            ListenerOpKind::Filter => listener.filter(op.patterns),
            ListenerOpKind::FilterReplace => listener.filter_replace(op.patterns),
        });
    }

    registry.set_runtime(runtime);
}

/// Configure an engine for evaluating Guardfiles and calling their closures.
fn configure_engine(engine: &mut Engine) {
    engine.on_print(|s| info!(target: "guardfile::script", "{}", s));
    engine.on_debug(|s, src, pos| {
        debug!(target: "guardfile::script", "{} @ {:?}:{:?}", s, src, pos);
    });

    // The vocabulary is closed: no imports, no eval.
    engine.set_module_resolver(DummyModuleResolver::new());
    engine.disable_symbol("eval");

    engine.set_max_operations(200_000);
    engine.set_max_call_levels(64);
    engine.set_max_expr_depths(128, 64);
}

/// Compile `source` into an AST, converting errors into [`Error::Invalid`].
fn compile(engine: &Engine, source: &str, path: Option<&Path>) -> Result<AST, Error> {
    engine.compile(source).map_err(|err| {
        let err: EvalAltResult = err.into();
        error_from_rhai(source, &err, path)
    })
}

/// Evaluate a compiled AST in `scope`, converting errors into [`Error::Invalid`].
fn eval(
    engine: &Engine,
    scope: &mut Scope,
    ast: &AST,
    source: &str,
    path: Option<&Path>,
) -> Result<(), Error> {
    engine
        .eval_ast_with_scope::<Dynamic>(scope, ast)
        .map(|_| ())
        .map_err(|err| error_from_rhai(source, &err, path))
}

/// Convert a Rhai parse or evaluation error into [`Error::Invalid`] with an excerpt.
fn error_from_rhai(source: &str, err: &EvalAltResult, path: Option<&Path>) -> Error {
    let (pos, message) = match find_directive_error(err) {
        Some((pos, message)) => (pos, message),
        None => (err.position(), err.to_string()),
    };
    let (line, col, excerpt) = match pos_to_line_col(pos) {
        Some((line, col)) => (Some(line), Some(col), Some(excerpt_at(source, line, col))),
        None => (None, None, None),
    };
    Error::Invalid {
        path: path.map(Path::to_path_buf),
        line,
        col,
        message,
        excerpt,
    }
}

/// Extract a best-effort (line, col) from a Rhai error.
pub fn err_position(err: &EvalAltResult) -> Option<(usize, usize)> {
    pos_to_line_col(err.position())
}

/// Convert a Rhai `Position` into a 1-based (line, col) pair.
fn pos_to_line_col(pos: Position) -> Option<(usize, usize)> {
    let line = pos.line()?;
    let col = pos.position().unwrap_or(1);
    Some((line.max(1), col.max(1)))
}
