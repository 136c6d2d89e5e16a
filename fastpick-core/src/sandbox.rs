//! Sandbox - One QuickJS Runtime per Candidate
//!
//! Each sandbox owns a fresh runtime and context with the standard
//! built-ins and an inert `console`. Nothing from the host is exposed.
//! Evaluation and every invocation run under a wall-clock budget enforced
//! by the runtime interrupt handler.

use crate::isolate::is_valid_identifier;
use rquickjs::convert::Coerced;
use rquickjs::{Context, Ctx, Function, Runtime, Value};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

const CONSOLE_SHIM: &str = "globalThis.console = { log() {}, info() {}, warn() {}, error() {}, debug() {}, trace() {} };";

// Binds entry and arguments once so each timed call is a bare invocation.
const INVOKER_FACTORY: &str =
    "(function (fn, args) { return function () { return fn.apply(undefined, args); }; })";

/// Which step of a candidate's life exceeded its budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Evaluating the candidate source
    Evaluation,
    /// Calling the entry point
    Invocation,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Evaluation => write!(f, "evaluation"),
            Phase::Invocation => write!(f, "invocation"),
        }
    }
}

/// Per-candidate execution failures. None of these are fatal to a run.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// Runtime or context could not be created
    #[error("failed to create sandbox: {0}")]
    Setup(String),

    /// Source threw or failed to parse while being evaluated
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// A budget ran out
    #[error("{phase} exceeded the {}ms budget", .budget.as_millis())]
    Timeout {
        /// Step that ran out of time
        phase: Phase,
        /// Budget that was exceeded
        budget: Duration,
    },

    /// Nothing is bound under the entry point name
    #[error("entry point '{0}' is not defined")]
    MissingEntry(String),

    /// The entry point binding holds something other than a function
    #[error("entry point '{name}' is not callable (found {found})")]
    NotCallable {
        /// Binding name
        name: String,
        /// JavaScript type of the bound value
        found: String,
    },

    /// Test data could not be materialized inside the runtime
    #[error("failed to materialize arguments: {0}")]
    Arguments(String),

    /// The entry point threw
    #[error("{0}")]
    Invocation(String),
}

/// Sandbox limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxConfig {
    /// Budget for evaluating the candidate source
    pub eval_timeout: Duration,
    /// Budget for each call of the entry point
    pub call_timeout: Duration,
    /// Heap limit in bytes
    pub memory_limit: Option<usize>,
    /// Stack limit in bytes
    pub max_stack_size: Option<usize>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            eval_timeout: Duration::from_secs(1),
            call_timeout: Duration::from_secs(1),
            memory_limit: None,
            max_stack_size: None,
        }
    }
}

/// Deadline shared with the interrupt handler, in nanoseconds since `origin`.
struct Budget {
    origin: Instant,
    deadline: AtomicU64,
    fired: AtomicBool,
}

impl Budget {
    const DISARMED: u64 = u64::MAX;

    fn new() -> Self {
        Self {
            origin: Instant::now(),
            deadline: AtomicU64::new(Self::DISARMED),
            fired: AtomicBool::new(false),
        }
    }

    fn arm(&self, limit: Duration) {
        let deadline = self.origin.elapsed().saturating_add(limit).as_nanos();
        self.fired.store(false, Ordering::Relaxed);
        self.deadline
            .store(deadline.min(u128::from(Self::DISARMED - 1)) as u64, Ordering::Relaxed);
    }

    fn disarm(&self) {
        self.deadline.store(Self::DISARMED, Ordering::Relaxed);
    }

    /// Called by the runtime; returning true interrupts execution.
    fn expired(&self) -> bool {
        let deadline = self.deadline.load(Ordering::Relaxed);
        if deadline == Self::DISARMED {
            return false;
        }
        if self.origin.elapsed().as_nanos() >= u128::from(deadline) {
            self.fired.store(true, Ordering::Relaxed);
            return true;
        }
        false
    }

    fn take_fired(&self) -> bool {
        self.fired.swap(false, Ordering::Relaxed)
    }
}

/// An isolated QuickJS instance for a single candidate.
pub struct Sandbox {
    context: Context,
    // Kept alive for as long as the context
    _runtime: Runtime,
    budget: Arc<Budget>,
    config: SandboxConfig,
}

impl Sandbox {
    /// Create a fresh runtime and context.
    pub fn new(config: &SandboxConfig) -> Result<Self, SandboxError> {
        let runtime = Runtime::new().map_err(|e| SandboxError::Setup(e.to_string()))?;
        if let Some(limit) = config.memory_limit {
            runtime.set_memory_limit(limit);
        }
        if let Some(limit) = config.max_stack_size {
            runtime.set_max_stack_size(limit);
        }

        let budget = Arc::new(Budget::new());
        let handler_budget = Arc::clone(&budget);
        runtime.set_interrupt_handler(Some(Box::new(move || handler_budget.expired())));

        let context = Context::full(&runtime).map_err(|e| SandboxError::Setup(e.to_string()))?;
        context
            .with(|ctx| ctx.eval::<Value, _>(CONSOLE_SHIM).map(|_| ()))
            .map_err(|e| SandboxError::Setup(e.to_string()))?;

        Ok(Self {
            context,
            _runtime: runtime,
            budget,
            config: config.clone(),
        })
    }

    /// Evaluate source in the global scope under the evaluation budget.
    pub fn evaluate(&self, source: &str) -> Result<(), SandboxError> {
        self.evaluate_to_string(source).map(|_| ())
    }

    /// Evaluate source and return its completion value as a string, or
    /// `None` when it is `undefined` or `null`.
    pub fn evaluate_to_string(&self, source: &str) -> Result<Option<String>, SandboxError> {
        self.context.with(|ctx| {
            self.budget.arm(self.config.eval_timeout);
            let outcome = ctx.eval::<Value, _>(source);
            self.budget.disarm();

            let value = outcome.map_err(|err| self.failure(&ctx, err, Phase::Evaluation))?;
            if value.is_undefined() || value.is_null() {
                return Ok(None);
            }
            value
                .get::<Coerced<String>>()
                .map(|s| Some(s.0))
                .map_err(|err| SandboxError::Evaluation(describe(&ctx, err)))
        })
    }

    /// Resolve `binding`, bind `args` to it, and hand `body` a closure that
    /// performs one budgeted call per invocation.
    ///
    /// The arguments are materialized once, inside this runtime, and shared
    /// by every call.
    pub fn with_entry<T, F>(
        &self,
        binding: &str,
        args: &[serde_json::Value],
        body: F,
    ) -> Result<T, SandboxError>
    where
        F: FnOnce(&mut dyn FnMut() -> Result<(), SandboxError>) -> Result<T, SandboxError>,
    {
        self.context.with(|ctx| {
            let entry = self.resolve(&ctx, binding)?;

            let args_json =
                serde_json::to_string(args).map_err(|e| SandboxError::Arguments(e.to_string()))?;
            let args_value: Value = ctx
                .json_parse(args_json)
                .map_err(|err| SandboxError::Arguments(describe(&ctx, err)))?;

            let factory: Function = ctx
                .eval(INVOKER_FACTORY)
                .map_err(|err| SandboxError::Setup(describe(&ctx, err)))?;
            let invoker: Function = factory
                .call((entry, args_value))
                .map_err(|err| SandboxError::Arguments(describe(&ctx, err)))?;

            let mut invoke = || {
                self.budget.arm(self.config.call_timeout);
                let outcome = invoker.call::<_, Value>(()).map(|_| ());
                self.budget.disarm();
                outcome.map_err(|err| self.failure(&ctx, err, Phase::Invocation))
            };
            body(&mut invoke)
        })
    }

    fn resolve<'js>(&self, ctx: &Ctx<'js>, binding: &str) -> Result<Function<'js>, SandboxError> {
        if !is_valid_identifier(binding) {
            return Err(SandboxError::MissingEntry(binding.to_string()));
        }

        // Global `const`/`let` bindings are not properties of globalThis.
        let lookup = format!("typeof {binding} === 'undefined' ? undefined : {binding}");
        self.budget.arm(self.config.eval_timeout);
        let outcome = ctx.eval::<Value, _>(lookup);
        self.budget.disarm();
        let value = outcome.map_err(|err| self.failure(ctx, err, Phase::Evaluation))?;

        if value.is_undefined() {
            return Err(SandboxError::MissingEntry(binding.to_string()));
        }
        let found = js_type_name(&value);
        value.into_function().ok_or_else(|| SandboxError::NotCallable {
            name: binding.to_string(),
            found: found.to_string(),
        })
    }

    fn failure(&self, ctx: &Ctx<'_>, err: rquickjs::Error, phase: Phase) -> SandboxError {
        let message = describe(ctx, err);
        if self.budget.take_fired() {
            let budget = match phase {
                Phase::Evaluation => self.config.eval_timeout,
                Phase::Invocation => self.config.call_timeout,
            };
            return SandboxError::Timeout { phase, budget };
        }
        match phase {
            Phase::Evaluation => SandboxError::Evaluation(message),
            Phase::Invocation => SandboxError::Invocation(message),
        }
    }
}

/// Message for an engine error, pulling the pending exception if any.
fn describe(ctx: &Ctx<'_>, err: rquickjs::Error) -> String {
    if !matches!(err, rquickjs::Error::Exception) {
        return err.to_string();
    }
    let thrown = ctx.catch();
    if let Some(exception) = thrown.as_exception() {
        if let Some(message) = exception.message().filter(|m| !m.is_empty()) {
            return message;
        }
    }
    match thrown.get::<Coerced<String>>() {
        Ok(text) => text.0,
        Err(_) => format!("uncaught {}", js_type_name(&thrown)),
    }
}

fn js_type_name(value: &Value<'_>) -> &'static str {
    if value.is_undefined() {
        "undefined"
    } else if value.is_null() {
        "null"
    } else if value.is_bool() {
        "boolean"
    } else if value.is_int() || value.is_float() {
        "number"
    } else if value.is_string() {
        "string"
    } else if value.is_function() {
        "function"
    } else if value.is_array() {
        "array"
    } else if value.is_object() {
        "object"
    } else {
        "value"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn quick() -> SandboxConfig {
        SandboxConfig {
            eval_timeout: Duration::from_millis(200),
            call_timeout: Duration::from_millis(200),
            ..SandboxConfig::default()
        }
    }

    fn call_once(sandbox: &Sandbox, binding: &str, args: &[serde_json::Value]) -> Result<(), SandboxError> {
        sandbox.with_entry(binding, args, |invoke| invoke())
    }

    #[test]
    fn test_invokes_with_arguments() {
        let sandbox = Sandbox::new(&quick()).unwrap();
        sandbox
            .evaluate("let seen = null; function Alt(a, b) { seen = a.x + b.length; }")
            .unwrap();

        call_once(&sandbox, "Alt", &[json!({"x": 2}), json!([1, 2, 3])]).unwrap();
        assert_eq!(sandbox.evaluate_to_string("seen").unwrap().as_deref(), Some("5"));
    }

    #[test]
    fn test_const_binding_resolves() {
        let sandbox = Sandbox::new(&quick()).unwrap();
        sandbox.evaluate("const Alt = (xs) => xs.map((x) => x * 2);").unwrap();
        call_once(&sandbox, "Alt", &[json!([1, 2])]).unwrap();
    }

    #[test]
    fn test_console_is_inert() {
        let sandbox = Sandbox::new(&quick()).unwrap();
        sandbox
            .evaluate("function Alt() { console.log('noise'); console.error('more'); return Math.max(1, 2); }")
            .unwrap();
        call_once(&sandbox, "Alt", &[]).unwrap();
    }

    #[test]
    fn test_missing_and_not_callable() {
        let sandbox = Sandbox::new(&quick()).unwrap();
        sandbox.evaluate("const NotFn = 42;").unwrap();

        assert!(matches!(
            call_once(&sandbox, "Nope", &[]),
            Err(SandboxError::MissingEntry(name)) if name == "Nope"
        ));
        assert!(matches!(
            call_once(&sandbox, "NotFn", &[]),
            Err(SandboxError::NotCallable { found, .. }) if found == "number"
        ));
    }

    #[test]
    fn test_throw_becomes_invocation_error() {
        let sandbox = Sandbox::new(&quick()).unwrap();
        sandbox
            .evaluate("function Alt() { throw new TypeError('bad input'); }")
            .unwrap();

        let err = call_once(&sandbox, "Alt", &[]).unwrap_err();
        assert!(matches!(&err, SandboxError::Invocation(msg) if msg.contains("bad input")));

        sandbox.evaluate("function Raw() { throw 'plain string'; }").unwrap();
        let err = call_once(&sandbox, "Raw", &[]).unwrap_err();
        assert_eq!(err.to_string(), "plain string");
    }

    #[test]
    fn test_syntax_error_is_evaluation_error() {
        let sandbox = Sandbox::new(&quick()).unwrap();
        let err = sandbox.evaluate("function (").unwrap_err();
        assert!(matches!(err, SandboxError::Evaluation(_)));
    }

    #[test]
    fn test_infinite_loop_times_out() {
        let sandbox = Sandbox::new(&quick()).unwrap();
        sandbox.evaluate("function Alt() { for (;;) {} }").unwrap();

        let err = call_once(&sandbox, "Alt", &[]).unwrap_err();
        assert!(matches!(
            err,
            SandboxError::Timeout { phase: Phase::Invocation, .. }
        ));

        let err = sandbox.evaluate("while (true) {}").unwrap_err();
        assert!(matches!(
            err,
            SandboxError::Timeout { phase: Phase::Evaluation, .. }
        ));
    }

    #[test]
    fn test_sandboxes_do_not_share_globals() {
        let first = Sandbox::new(&quick()).unwrap();
        first.evaluate("globalThis.leaked = 1; var alsoLeaked = 2;").unwrap();

        let second = Sandbox::new(&quick()).unwrap();
        assert_eq!(
            second
                .evaluate_to_string("typeof leaked + ',' + typeof alsoLeaked")
                .unwrap()
                .as_deref(),
            Some("undefined,undefined")
        );
    }

    #[test]
    fn test_no_host_io() {
        let sandbox = Sandbox::new(&quick()).unwrap();
        let exposed = sandbox
            .evaluate_to_string("[typeof require, typeof process, typeof fetch].join(',')")
            .unwrap();
        assert_eq!(exposed.as_deref(), Some("undefined,undefined,undefined"));
    }
}
