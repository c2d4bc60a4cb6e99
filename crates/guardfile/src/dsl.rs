//! Guardfile directive vocabulary registered into the Rhai engine.
//!
//! Directives record into a shared [`BuilderState`]. Nesting is tracked explicitly: the state holds
//! the active group and the plugin currently being built, and block closures are invoked while
//! that context is set.

use std::{
    collections::BTreeMap,
    error::Error as StdError,
    fmt, mem,
    sync::{Arc, Mutex, MutexGuard},
};

use regex::Regex;
use rhai::{
    Array, Dynamic, Engine, EvalAltResult, FnPtr, Map, Module, NativeCallContext, Position,
};
use serde_json::{Number, Value};
use tracing::debug;

use crate::{
    CallbackEntry, CallbackListener, Events, Identity, InteractorSettings, Listener,
    LoggerSettings, NotificationConfig, Options, Pattern, PluginEntry, ScopeSettings, ScriptFn, Ui,
    WatcherEntry,
    normalize::{ScopeRequest, compile_name_filter, merge_scope, parse_log_level},
};

/// A symbol token produced by `sym("name")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol(pub String);

/// A host-registered callback listener resolved by `listener("name")`.
#[derive(Clone)]
struct ListenerRef {
    /// Registration name.
    name: String,
    /// The listener capability.
    target: Arc<dyn CallbackListener>,
}

/// Which listener pattern list an operation targets, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerOpKind {
    /// Add to the ignore list.
    Ignore,
    /// Replace the ignore list.
    IgnoreReplace,
    /// Add to the filter list.
    Filter,
    /// Replace the filter list.
    FilterReplace,
}

/// A recorded `ignore`/`filter` directive, applied to the listener on commit.
#[derive(Debug, Clone)]
pub struct ListenerOp {
    /// Operation kind.
    pub kind: ListenerOpKind,
    /// Patterns passed to the directive.
    pub patterns: Vec<Pattern>,
}

/// A group declared by the `group` directive.
#[derive(Debug, Clone)]
pub struct GroupDecl {
    /// Group identity.
    pub identity: Identity,
    /// Merged group options.
    pub options: Options,
}

/// Mutable state populated while evaluating a Guardfile.
#[derive(Debug)]
pub struct BuilderState {
    /// Completed plugins in declaration order.
    pub plugins: Vec<PluginEntry>,
    /// Groups declared by `group`, in declaration order.
    pub groups: Vec<GroupDecl>,
    /// Group new plugins are assigned to.
    current_group: Identity,
    /// Plugin whose block is being evaluated.
    current_plugin: Option<PluginEntry>,
    /// Notifier backends from `notification`.
    pub notifications: Vec<NotificationConfig>,
    /// Logger settings, seeded from the registry.
    pub logger: LoggerSettings,
    /// Interactor settings, seeded from the registry.
    pub interactor: InteractorSettings,
    /// Effective scope, seeded from the registry.
    pub scope: ScopeSettings,
    /// Recorded listener operations in order.
    pub listener_ops: Vec<ListenerOp>,
    /// Next id to hand out for a stored closure.
    next_fn_id: u64,
    /// Closures referenced by watchers and callbacks.
    pub script_fns: BTreeMap<u64, FnPtr>,
}

impl BuilderState {
    /// Fresh state seeded with settings carried over from the registry.
    pub fn new(
        logger: LoggerSettings,
        interactor: InteractorSettings,
        scope: ScopeSettings,
    ) -> Self {
        Self {
            plugins: Vec::new(),
            groups: Vec::new(),
            current_group: Identity::default_group(),
            current_plugin: None,
            notifications: Vec::new(),
            logger,
            interactor,
            scope,
            listener_ops: Vec::new(),
            next_fn_id: 1,
            script_fns: BTreeMap::new(),
        }
    }

    /// Store a closure and return its handle.
    fn store_fn(&mut self, f: FnPtr, pos: Position) -> Result<ScriptFn, Box<EvalAltResult>> {
        let id = self.next_fn_id;
        self.next_fn_id = id
            .checked_add(1)
            .ok_or_else(|| directive_error("too many script closures".to_string(), pos))?;
        self.script_fns.insert(id, f);
        Ok(ScriptFn(id))
    }

    /// Record a completed plugin, replacing an earlier declaration with the same identity.
    fn finish_plugin(&mut self, plugin: PluginEntry) {
        debug!(
            plugin = %plugin.identity.token(),
            group = %plugin.group,
            watchers = plugin.watchers.len(),
            "guard declared"
        );
        match self
            .plugins
            .iter_mut()
            .find(|p| p.identity == plugin.identity)
        {
            Some(existing) => *existing = plugin,
            None => self.plugins.push(plugin),
        }
    }

    /// Record a group declaration, merging options into an earlier one.
    fn declare_group(&mut self, identity: Identity, options: Options) {
        match self.groups.iter_mut().find(|g| g.identity == identity) {
            Some(existing) => existing.options.extend(options),
            None => self.groups.push(GroupDecl { identity, options }),
        }
    }
}

impl Default for BuilderState {
    fn default() -> Self {
        Self::new(
            LoggerSettings::default(),
            InteractorSettings::default(),
            ScopeSettings::default(),
        )
    }
}

/// Error raised by a directive, carrying the call position.
#[derive(Debug, Clone)]
pub struct DirectiveError {
    /// Human-readable message.
    pub message: String,
}

impl fmt::Display for DirectiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for DirectiveError {}

/// Construct a Rhai runtime error tagged as a directive failure.
fn directive_error(message: String, pos: Position) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from(DirectiveError { message }),
        pos,
    ))
}

/// Find a directive failure inside a Rhai error tree.
pub fn find_directive_error(err: &EvalAltResult) -> Option<(Position, String)> {
    match err {
        EvalAltResult::ErrorRuntime(d, pos) if d.is::<DirectiveError>() => {
            let de: DirectiveError = d.clone_cast();
            Some((*pos, de.message))
        }
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _)
        | EvalAltResult::ErrorInModule(_, inner, _) => find_directive_error(inner),
        _ => None,
    }
}

/// Lock a mutex and recover the guard even if it is poisoned.
pub fn lock_unpoisoned<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Shared handles every directive closure needs.
#[derive(Clone)]
struct Dsl {
    /// Builder state.
    state: Arc<Mutex<BuilderState>>,
    /// Diagnostics channel for warnings and deprecations.
    ui: Arc<dyn Ui>,
}

/// Register the directive vocabulary, value helpers, and constants.
pub fn register_dsl(
    engine: &mut Engine,
    state: Arc<Mutex<BuilderState>>,
    ui: Arc<dyn Ui>,
    listeners: BTreeMap<String, Arc<dyn CallbackListener>>,
) {
    engine.register_type_with_name::<Symbol>("Symbol");
    engine.register_type_with_name::<Pattern>("Pattern");
    engine.register_type_with_name::<ListenerRef>("Listener");
    engine.register_fn("to_string", |s: &mut Symbol| format!(":{}", s.0));
    engine.register_fn("to_debug", |s: &mut Symbol| format!(":{}", s.0));
    engine.register_fn("to_string", |p: &mut Pattern| p.to_string());

    register_helpers(engine, listeners);

    let dsl = Dsl { state, ui };
    register_plugin_directives(engine, &dsl);
    register_block_directives(engine, &dsl);
    register_setting_directives(engine, &dsl);
    register_listener_directives(engine, &dsl);

    let mut module = Module::new();
    module.set_var("off", Symbol("off".to_string()));
    engine.register_global_module(module.into());
}

/// `sym`, `regex`, and `listener` value constructors.
fn register_helpers(engine: &mut Engine, listeners: BTreeMap<String, Arc<dyn CallbackListener>>) {
    engine.register_fn("sym", |name: &str| Symbol(name.to_string()));
    engine.register_fn(
        "regex",
        |ctx: NativeCallContext, src: &str| -> Result<Pattern, Box<EvalAltResult>> {
            Regex::new(src).map(Pattern::Regex).map_err(|e| {
                directive_error(
                    format!("invalid regex {:?}: {}", src, e),
                    ctx.call_position(),
                )
            })
        },
    );
    engine.register_fn(
        "listener",
        move |ctx: NativeCallContext, name: &str| -> Result<ListenerRef, Box<EvalAltResult>> {
            listeners
                .get(name)
                .map(|target| ListenerRef {
                    name: name.to_string(),
                    target: target.clone(),
                })
                .ok_or_else(|| {
                    directive_error(
                        format!("unknown callback listener: {}", name),
                        ctx.call_position(),
                    )
                })
        },
    );
}

/// `guard` and `group`, each with optional options and block.
fn register_plugin_directives(engine: &mut Engine, dsl: &Dsl) {
    {
        let d = dsl.clone();
        engine.register_fn("guard", move |ctx: NativeCallContext, name: Dynamic| {
            guard(&ctx, &d, name, &Map::new(), None)
        });
    }
    {
        let d = dsl.clone();
        engine.register_fn(
            "guard",
            move |ctx: NativeCallContext, name: Dynamic, opts: Map| {
                guard(&ctx, &d, name, &opts, None)
            },
        );
    }
    {
        let d = dsl.clone();
        engine.register_fn(
            "guard",
            move |ctx: NativeCallContext, name: Dynamic, block: FnPtr| {
                guard(&ctx, &d, name, &Map::new(), Some(&block))
            },
        );
    }
    {
        let d = dsl.clone();
        engine.register_fn(
            "guard",
            move |ctx: NativeCallContext, name: Dynamic, opts: Map, block: FnPtr| {
                guard(&ctx, &d, name, &opts, Some(&block))
            },
        );
    }

    {
        let d = dsl.clone();
        engine.register_fn("group", move |ctx: NativeCallContext, name: Dynamic| {
            group(&ctx, &d, name, &Map::new(), None)
        });
    }
    {
        let d = dsl.clone();
        engine.register_fn(
            "group",
            move |ctx: NativeCallContext, name: Dynamic, opts: Map| {
                group(&ctx, &d, name, &opts, None)
            },
        );
    }
    {
        let d = dsl.clone();
        engine.register_fn(
            "group",
            move |ctx: NativeCallContext, name: Dynamic, block: FnPtr| {
                group(&ctx, &d, name, &Map::new(), Some(&block))
            },
        );
    }
    {
        let d = dsl.clone();
        engine.register_fn(
            "group",
            move |ctx: NativeCallContext, name: Dynamic, opts: Map, block: FnPtr| {
                group(&ctx, &d, name, &opts, Some(&block))
            },
        );
    }
}

/// `watch`, `callback`, and `notification`.
fn register_block_directives(engine: &mut Engine, dsl: &Dsl) {
    {
        let d = dsl.clone();
        engine.register_fn("watch", move |ctx: NativeCallContext, pattern: Dynamic| {
            watch(&ctx, &d, pattern, None)
        });
    }
    {
        let d = dsl.clone();
        engine.register_fn(
            "watch",
            move |ctx: NativeCallContext, pattern: Dynamic, action: FnPtr| {
                watch(&ctx, &d, pattern, Some(action))
            },
        );
    }

    {
        let d = dsl.clone();
        engine.register_fn(
            "callback",
            move |ctx: NativeCallContext,
                  events: Dynamic,
                  f: FnPtr|
                  -> Result<(), Box<EvalAltResult>> {
                let events = events_from(&ctx, &events)?;
                let mut guard = lock_unpoisoned(&d.state);
                let id = guard.store_fn(f, ctx.call_position())?;
                push_callback(&ctx, &mut guard, events, Listener::Inline(id))
            },
        );
    }
    {
        let d = dsl.clone();
        engine.register_fn(
            "callback",
            move |ctx: NativeCallContext,
                  listener: ListenerRef,
                  events: Dynamic|
                  -> Result<(), Box<EvalAltResult>> {
                let events = events_from(&ctx, &events)?;
                let target = Listener::External {
                    name: listener.name,
                    target: listener.target,
                };
                push_callback(&ctx, &mut lock_unpoisoned(&d.state), events, target)
            },
        );
    }

    {
        let d = dsl.clone();
        engine.register_fn(
            "notification",
            move |ctx: NativeCallContext, name: Dynamic| {
                notification(&ctx, &d, name, &Map::new())
            },
        );
    }
    {
        let d = dsl.clone();
        engine.register_fn(
            "notification",
            move |ctx: NativeCallContext, name: Dynamic, opts: Map| {
                notification(&ctx, &d, name, &opts)
            },
        );
    }
}

/// `logger`, `interactor`, and `scope`.
fn register_setting_directives(engine: &mut Engine, dsl: &Dsl) {
    {
        let d = dsl.clone();
        engine.register_fn("logger", move |ctx: NativeCallContext, opts: Map| {
            logger(&ctx, &d, &opts)
        });
    }
    {
        let d = dsl.clone();
        engine.register_fn("interactor", move |ctx: NativeCallContext, arg: Dynamic| {
            interactor(&ctx, &d, &arg)
        });
    }
    {
        let d = dsl.clone();
        engine.register_fn("scope", move |ctx: NativeCallContext, opts: Map| {
            scope(&ctx, &d, &opts)
        });
    }
}

/// `ignore`, `ignore_replace`, `filter`, `filter_replace`, and the deprecated `ignore_paths`.
fn register_listener_directives(engine: &mut Engine, dsl: &Dsl) {
    let ops = [
        ("ignore", ListenerOpKind::Ignore),
        ("ignore_replace", ListenerOpKind::IgnoreReplace),
        ("filter", ListenerOpKind::Filter),
        ("filter_replace", ListenerOpKind::FilterReplace),
    ];
    for (name, kind) in ops {
        let d = dsl.clone();
        engine.register_fn(
            name,
            move |ctx: NativeCallContext, patterns: Dynamic| -> Result<(), Box<EvalAltResult>> {
                record_listener_op(&ctx, &d, kind, patterns)
            },
        );
    }

    let d = dsl.clone();
    engine.register_fn(
        "ignore_paths",
        move |ctx: NativeCallContext, paths: Dynamic| -> Result<(), Box<EvalAltResult>> {
            d.ui
                .deprecation("ignore_paths is deprecated, use ignore instead.");
            record_listener_op(&ctx, &d, ListenerOpKind::Ignore, paths)
        },
    );
}

/// Evaluate a block closure with no arguments.
fn call_block(ctx: &NativeCallContext, block: &FnPtr) -> Result<(), Box<EvalAltResult>> {
    let _ignored: Dynamic = block.call_within_context(ctx, ())?;
    Ok(())
}

/// The `guard` directive.
fn guard(
    ctx: &NativeCallContext,
    dsl: &Dsl,
    name: Dynamic,
    opts: &Map,
    block: Option<&FnPtr>,
) -> Result<(), Box<EvalAltResult>> {
    let identity = identity_from(ctx, name, "guard")?;
    let options = options_from(opts);
    {
        let mut state = lock_unpoisoned(&dsl.state);
        if let Some(outer) = &state.current_plugin {
            return Err(directive_error(
                format!(
                    "guard {} cannot be declared inside the block of guard {}",
                    identity.token(),
                    outer.identity.token()
                ),
                ctx.call_position(),
            ));
        }
        let mut plugin = PluginEntry::new(identity);
        plugin.group = state.current_group.clone();
        plugin.options = options;
        state.current_plugin = Some(plugin);
    }

    let result = block.map_or(Ok(()), |b| call_block(ctx, b));
    let plugin = lock_unpoisoned(&dsl.state).current_plugin.take();
    result?;
    if let Some(plugin) = plugin {
        lock_unpoisoned(&dsl.state).finish_plugin(plugin);
    }
    Ok(())
}

/// The `group` directive: set the active group for the block, then restore the previous one.
///
/// Group identities are always symbols, so `group("x")` and `group(sym("x"))` name one group.
fn group(
    ctx: &NativeCallContext,
    dsl: &Dsl,
    name: Dynamic,
    opts: &Map,
    block: Option<&FnPtr>,
) -> Result<(), Box<EvalAltResult>> {
    let identity = Identity::sym(identity_from(ctx, name, "group")?.name());
    let previous = {
        let mut state = lock_unpoisoned(&dsl.state);
        if state.current_plugin.is_some() {
            return Err(directive_error(
                format!(
                    "group {} cannot be declared inside a guard block",
                    identity.token()
                ),
                ctx.call_position(),
            ));
        }
        state.declare_group(identity.clone(), options_from(opts));
        mem::replace(&mut state.current_group, identity)
    };

    let result = block.map_or(Ok(()), |b| call_block(ctx, b));
    lock_unpoisoned(&dsl.state).current_group = previous;
    result
}

/// The `watch` directive.
fn watch(
    ctx: &NativeCallContext,
    dsl: &Dsl,
    pattern: Dynamic,
    action: Option<FnPtr>,
) -> Result<(), Box<EvalAltResult>> {
    let pattern = pattern_from(ctx, pattern)?;
    let mut state = lock_unpoisoned(&dsl.state);
    if state.current_plugin.is_none() {
        return Err(directive_error(
            "watch is only valid inside a guard block".to_string(),
            ctx.call_position(),
        ));
    }
    let action = action
        .map(|f| state.store_fn(f, ctx.call_position()))
        .transpose()?;
    if let Some(plugin) = state.current_plugin.as_mut() {
        plugin.watchers.push(WatcherEntry { pattern, action });
    }
    Ok(())
}

/// Append a callback to the plugin being built.
fn push_callback(
    ctx: &NativeCallContext,
    state: &mut BuilderState,
    events: Events,
    listener: Listener,
) -> Result<(), Box<EvalAltResult>> {
    let plugin = state.current_plugin.as_mut().ok_or_else(|| {
        directive_error(
            "callback is only valid inside a guard block".to_string(),
            ctx.call_position(),
        )
    })?;
    plugin.callbacks.push(CallbackEntry { events, listener });
    Ok(())
}

/// The `notification` directive; occurrences accumulate.
fn notification(
    ctx: &NativeCallContext,
    dsl: &Dsl,
    name: Dynamic,
    opts: &Map,
) -> Result<(), Box<EvalAltResult>> {
    let name = identity_from(ctx, name, "notification")?;
    lock_unpoisoned(&dsl.state)
        .notifications
        .push(NotificationConfig {
            name,
            options: options_from(opts),
            standalone: false,
        });
    Ok(())
}

/// The `logger` directive. Invalid values warn and leave the previous setting in place.
fn logger(ctx: &NativeCallContext, dsl: &Dsl, opts: &Map) -> Result<(), Box<EvalAltResult>> {
    let mut state = lock_unpoisoned(&dsl.state);
    for key in opts.keys() {
        if !matches!(
            key.as_str(),
            "level" | "template" | "time_format" | "only" | "except"
        ) {
            dsl.ui
                .warning(&format!("Unknown logger option `{}` ignored.", key));
        }
    }

    if let Some(level) = opts.get("level") {
        let raw = name_of(level).unwrap_or_else(|| level.to_string());
        match parse_log_level(&raw) {
            Ok(level) => state.logger.level = level,
            Err(e) => dsl.ui.warning(&e.to_string()),
        }
    }
    if let Some(template) = opts.get("template") {
        state.logger.template = Some(name_of(template).unwrap_or_else(|| template.to_string()));
    }
    if let Some(format) = opts.get("time_format") {
        state.logger.time_format = Some(name_of(format).unwrap_or_else(|| format.to_string()));
    }

    match (opts.get("only"), opts.get("except")) {
        (Some(_), Some(_)) => dsl.ui.warning(
            "You cannot specify the logger options only and except at the same time.",
        ),
        (Some(only), None) => {
            match compile_name_filter(&names_from(ctx, only, "logger only")?) {
                Ok(filter) => {
                    state.logger.only = filter;
                    state.logger.except = None;
                }
                Err(e) => dsl.ui.warning(&e.to_string()),
            }
        }
        (None, Some(except)) => {
            match compile_name_filter(&names_from(ctx, except, "logger except")?) {
                Ok(filter) => {
                    state.logger.except = filter;
                    state.logger.only = None;
                }
                Err(e) => dsl.ui.warning(&e.to_string()),
            }
        }
        (None, None) => {}
    }
    Ok(())
}

/// The `interactor` directive.
fn interactor(
    ctx: &NativeCallContext,
    dsl: &Dsl,
    arg: &Dynamic,
) -> Result<(), Box<EvalAltResult>> {
    if let Some(Symbol(name)) = arg.clone().try_cast::<Symbol>() {
        if name == "off" {
            lock_unpoisoned(&dsl.state).interactor.enabled = false;
        } else {
            dsl.ui.deprecation(&format!(
                "Selecting the interactor by name (:{}) is deprecated and ignored; use interactor(off) or an option map.",
                name
            ));
        }
        return Ok(());
    }
    if let Some(map) = arg.clone().try_cast::<Map>() {
        lock_unpoisoned(&dsl.state)
            .interactor
            .options
            .extend(options_from(&map));
        return Ok(());
    }
    Err(directive_error(
        format!(
            "interactor expects off, sym(..) or an option map, got {}",
            arg.type_name()
        ),
        ctx.call_position(),
    ))
}

/// The `scope` directive, applied under command-line precedence per dimension.
fn scope(ctx: &NativeCallContext, dsl: &Dsl, opts: &Map) -> Result<(), Box<EvalAltResult>> {
    let request = ScopeRequest {
        plugins: scope_dimension(ctx, opts, "plugins", "plugin")?,
        groups: scope_dimension(ctx, opts, "groups", "group")?,
    };
    let conflicts = merge_scope(&mut lock_unpoisoned(&dsl.state).scope, request);
    for dimension in conflicts {
        dsl.ui
            .warning(&crate::Error::ScopeConflict { dimension }.to_string());
    }
    Ok(())
}

/// Read one scope dimension; the plural key wins over the singular.
fn scope_dimension(
    ctx: &NativeCallContext,
    opts: &Map,
    plural: &str,
    singular: &str,
) -> Result<Option<Vec<Identity>>, Box<EvalAltResult>> {
    let Some(value) = opts.get(plural).or_else(|| opts.get(singular)) else {
        return Ok(None);
    };
    let items = match value.clone().try_cast::<Array>() {
        Some(arr) => arr,
        None => vec![value.clone()],
    };
    items
        .into_iter()
        .map(|item| identity_from(ctx, item, "scope"))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Record an `ignore`/`filter` operation for the listener.
fn record_listener_op(
    ctx: &NativeCallContext,
    dsl: &Dsl,
    kind: ListenerOpKind,
    patterns: Dynamic,
) -> Result<(), Box<EvalAltResult>> {
    let items = match patterns.clone().try_cast::<Array>() {
        Some(arr) => arr,
        None => vec![patterns],
    };
    let patterns = items
        .into_iter()
        .map(|p| pattern_from(ctx, p))
        .collect::<Result<Vec<_>, _>>()?;
    lock_unpoisoned(&dsl.state)
        .listener_ops
        .push(ListenerOp { kind, patterns });
    Ok(())
}

/// A string or symbol value's bare name.
fn name_of(value: &Dynamic) -> Option<String> {
    if let Some(Symbol(name)) = value.clone().try_cast::<Symbol>() {
        return Some(name);
    }
    value.clone().into_string().ok()
}

/// Convert a string or symbol into a declared identity.
fn identity_from(
    ctx: &NativeCallContext,
    value: Dynamic,
    directive: &str,
) -> Result<Identity, Box<EvalAltResult>> {
    if let Some(Symbol(name)) = value.clone().try_cast::<Symbol>() {
        return Ok(Identity::Sym(name));
    }
    let type_name = value.type_name();
    value.into_string().map(Identity::Str).map_err(|_| {
        directive_error(
            format!(
                "{}: expected a string or sym(..) name, got {}",
                directive, type_name
            ),
            ctx.call_position(),
        )
    })
}

/// Convert a string, symbol, or array of them into bare names.
fn names_from(
    ctx: &NativeCallContext,
    value: &Dynamic,
    directive: &str,
) -> Result<Vec<String>, Box<EvalAltResult>> {
    let items = match value.clone().try_cast::<Array>() {
        Some(arr) => arr,
        None => vec![value.clone()],
    };
    items
        .iter()
        .map(|item| {
            name_of(item).ok_or_else(|| {
                directive_error(
                    format!(
                        "{}: expected names, got {}",
                        directive,
                        item.type_name()
                    ),
                    ctx.call_position(),
                )
            })
        })
        .collect()
}

/// Convert a string or symbol, or an array of them, into callback events.
fn events_from(ctx: &NativeCallContext, value: &Dynamic) -> Result<Events, Box<EvalAltResult>> {
    if value.is_array() {
        return names_from(ctx, value, "callback").map(Events::Many);
    }
    name_of(value).map(Events::One).ok_or_else(|| {
        directive_error(
            format!(
                "callback: expected an event name or list of names, got {}",
                value.type_name()
            ),
            ctx.call_position(),
        )
    })
}

/// Convert a string or `regex(..)` value into a pattern.
fn pattern_from(ctx: &NativeCallContext, value: Dynamic) -> Result<Pattern, Box<EvalAltResult>> {
    if let Some(p) = value.clone().try_cast::<Pattern>() {
        return Ok(p);
    }
    let type_name = value.type_name();
    value.into_string().map(Pattern::Literal).map_err(|_| {
        directive_error(
            format!("expected a string or regex(..) pattern, got {}", type_name),
            ctx.call_position(),
        )
    })
}

/// Convert a Rhai option map into free-form JSON options.
pub fn options_from(map: &Map) -> Options {
    map.iter()
        .map(|(k, v)| (k.to_string(), to_json(v)))
        .collect()
}

/// Convert a script value into JSON; symbols and patterns render as strings.
pub fn to_json(value: &Dynamic) -> Value {
    if value.is_unit() {
        return Value::Null;
    }
    if let Ok(b) = value.as_bool() {
        return Value::Bool(b);
    }
    if let Ok(i) = value.as_int() {
        return Value::from(i);
    }
    if let Ok(f) = value.as_float() {
        return Number::from_f64(f).map_or(Value::Null, Value::Number);
    }
    if let Ok(c) = value.as_char() {
        return Value::String(c.to_string());
    }
    if let Some(Symbol(name)) = value.clone().try_cast::<Symbol>() {
        return Value::String(name);
    }
    if let Some(p) = value.clone().try_cast::<Pattern>() {
        return Value::String(p.to_string());
    }
    if let Some(arr) = value.clone().try_cast::<Array>() {
        return Value::Array(arr.iter().map(to_json).collect());
    }
    if let Some(map) = value.clone().try_cast::<Map>() {
        return Value::Object(options_from(&map));
    }
    match value.clone().into_string() {
        Ok(s) => Value::String(s),
        Err(_) => Value::String(value.to_string()),
    }
}
