//! Execution of Guardfile closures (watcher actions and inline callbacks) after load.

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use rhai::{AST, Array, Dynamic, Engine, EvalAltResult, FnPtr, FuncArgs, serde::to_dynamic};
use serde_json::Value;

use crate::{Error, Identity, ScriptFn, error::excerpt_at, interpreter::err_position};

/// A compiled Guardfile capable of calling the closures its directives captured.
pub struct ScriptRuntime {
    /// Engine configured with the directive vocabulary and limits.
    engine: Engine,
    /// Compiled Guardfile.
    ast: AST,
    /// Closures by handle id.
    fns: BTreeMap<u64, FnPtr>,
    /// Source used for error excerpts.
    source: String,
    /// Source path used in error messages.
    path: Option<PathBuf>,
}

impl fmt::Debug for ScriptRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptRuntime")
            .field("fns", &self.fns.len())
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ScriptRuntime {
    /// Wrap a compiled script and the closures captured while evaluating it.
    pub(crate) fn new(
        engine: Engine,
        ast: AST,
        fns: BTreeMap<u64, FnPtr>,
        source: String,
        path: Option<&Path>,
    ) -> Self {
        Self {
            engine,
            ast,
            fns,
            source,
            path: path.map(Path::to_path_buf),
        }
    }

    /// Call a watcher action with the match list (whole match first, then captures).
    ///
    /// Actions declared without parameters are called with none.
    pub fn call_action(&self, f: ScriptFn, matches: &[String]) -> Result<Dynamic, Error> {
        let m: Array = matches.iter().cloned().map(Dynamic::from).collect();
        self.call_with_fallback(f, (m,))
    }

    /// Call an inline callback with `(plugin_name, event, args)`.
    pub fn call_callback(
        &self,
        f: ScriptFn,
        plugin: &Identity,
        event: &str,
        args: &[Value],
    ) -> Result<(), Error> {
        let args: Array = args
            .iter()
            .map(|v| to_dynamic(v).unwrap_or(Dynamic::UNIT))
            .collect();
        self.call_with_fallback(f, (plugin.name().to_string(), event.to_string(), args))
            .map(|_| ())
    }

    /// Call `f` with `args`, retrying without arguments when the closure takes none.
    fn call_with_fallback(&self, f: ScriptFn, args: impl FuncArgs) -> Result<Dynamic, Error> {
        let func = self.fns.get(&f.0).ok_or_else(|| Error::Script {
            message: format!("unknown script closure id: {}", f.0),
        })?;

        match func.call::<Dynamic>(&self.engine, &self.ast, args) {
            Ok(v) => Ok(v),
            Err(err) => match err.as_ref() {
                EvalAltResult::ErrorFunctionNotFound(sig, _) if sig.starts_with(func.fn_name()) => {
                    func.call::<Dynamic>(&self.engine, &self.ast, ())
                        .map_err(|err| self.script_error(&err))
                }
                _ => Err(self.script_error(&err)),
            },
        }
    }

    /// Render a script error with location and excerpt when available.
    fn script_error(&self, err: &EvalAltResult) -> Error {
        let loc = err_position(err);
        let head = match (&self.path, loc) {
            (Some(path), Some((line, col))) => format!(
                "Guardfile closure error at {}:{}:{}\n{}",
                path.display(),
                line,
                col,
                err
            ),
            (Some(path), None) => format!("Guardfile closure error in {}\n{}", path.display(), err),
            (None, Some((line, col))) => format!(
                "Guardfile closure error at line {}, column {}\n{}",
                line, col, err
            ),
            (None, None) => format!("Guardfile closure error\n{}", err),
        };
        let message = match loc {
            Some((line, col)) => format!("{}\n{}", head, excerpt_at(&self.source, line, col)),
            None => head,
        };
        Error::Script { message }
    }
}

/// Flatten an action result into paths.
///
/// Non-empty strings and arrays contribute paths; anything else is dropped unless `any_return`,
/// in which case every non-unit value is kept.
pub fn action_paths(result: Dynamic, any_return: bool) -> Vec<String> {
    if result.is_unit() {
        return Vec::new();
    }
    if let Some(arr) = result.clone().try_cast::<Array>() {
        if arr.is_empty() && !any_return {
            return Vec::new();
        }
        return arr
            .into_iter()
            .flat_map(|item| action_paths(item, true))
            .collect();
    }
    if result.is_string() {
        let s = result.into_string().unwrap_or_default();
        if s.is_empty() && !any_return {
            return Vec::new();
        }
        return vec![s];
    }
    if any_return {
        return vec![result.to_string()];
    }
    Vec::new()
}
