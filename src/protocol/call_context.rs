//! Pre and post hooks wrapped around every executed call step.
//!
//! A [`CallContext`] runs the pre hook when it is created and the post hook
//! when it is dropped, so the post hook runs once on every exit path of the
//! step, including a panic. Hook failures are logged and swallowed.

use std::backtrace::Backtrace;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread;

use tracing::error;

use crate::error::CrudError;

/// Generic pre hook, used when a step has no name.
pub const PRE_CALL: &str = "_pre_call";
/// Generic post hook, used when a step has no name.
pub const POST_CALL: &str = "_post_call";

/// Failure information handed to a post hook.
#[derive(Debug)]
pub struct ExceptionDetails {
    kind: String,
    value: String,
    trace: Backtrace,
}

impl ExceptionDetails {
    pub fn from_error(err: &CrudError) -> Self {
        Self {
            kind: err.kind().to_string(),
            value: err.message().to_string(),
            trace: Backtrace::capture(),
        }
    }

    fn from_panic() -> Self {
        Self {
            kind: "Panic".to_string(),
            value: "call step panicked".to_string(),
            trace: Backtrace::capture(),
        }
    }

    /// Error kind name, or `Panic`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Captured only when backtraces are enabled for the process.
    pub fn trace(&self) -> &Backtrace {
        &self.trace
    }
}

/// Receiver of `pre_<step>` / `post_<step>` hooks.
pub trait ContextManagerCallee: Send + Sync {
    fn has_hook(&self, name: &str) -> bool;

    /// `exception` is only ever set for post hooks of failed steps.
    fn call_hook(&self, name: &str, exception: Option<&ExceptionDetails>)
    -> Result<(), CrudError>;
}

type Hook = Arc<dyn Fn(Option<&ExceptionDetails>) -> Result<(), CrudError> + Send + Sync>;

/// Closure based [`ContextManagerCallee`].
///
/// ```rust
/// use crud_engine::protocol::Hooks;
///
/// let hooks = Hooks::new()
///     .on("pre_get", |_| Ok(()))
///     .on("post_get", |exception| {
///         if let Some(exception) = exception {
///             eprintln!("get failed: {}", exception.value());
///         }
///         Ok(())
///     });
/// ```
#[derive(Clone, Default)]
pub struct Hooks {
    hooks: HashMap<String, Hook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(Option<&ExceptionDetails>) -> Result<(), CrudError> + Send + Sync + 'static,
    {
        self.hooks.insert(name.into(), Arc::new(hook));
        self
    }
}

impl Debug for Hooks {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut names: Vec<_> = self.hooks.keys().collect();
        names.sort();
        f.debug_struct("Hooks").field("hooks", &names).finish()
    }
}

impl ContextManagerCallee for Hooks {
    fn has_hook(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    fn call_hook(
        &self,
        name: &str,
        exception: Option<&ExceptionDetails>,
    ) -> Result<(), CrudError> {
        match self.hooks.get(name) {
            Some(hook) => hook(exception),
            None => Ok(()),
        }
    }
}

/// Scope of one call step. Dropping it runs the post hook.
pub struct CallContext<'a> {
    callee: Option<&'a dyn ContextManagerCallee>,
    base_name: Option<&'a str>,
    failure: Option<ExceptionDetails>,
}

impl<'a> CallContext<'a> {
    /// Runs the pre hook and opens the scope.
    pub fn enter(callee: Option<&'a dyn ContextManagerCallee>, base_name: Option<&'a str>) -> Self {
        let context = Self {
            callee,
            base_name,
            failure: None,
        };
        context.call(&hook_name("pre", base_name), None);
        context
    }

    /// Runs `body` inside a fresh scope.
    pub fn run<T>(
        callee: Option<&'a dyn ContextManagerCallee>,
        base_name: Option<&'a str>,
        body: impl FnOnce() -> Result<T, CrudError>,
    ) -> Result<T, CrudError> {
        let mut context = Self::enter(callee, base_name);
        let result = body();
        if let Err(err) = &result {
            context.record_failure(err);
        }
        drop(context);
        result
    }

    /// Passes `err` to the post hook.
    pub fn record_failure(&mut self, err: &CrudError) {
        self.failure = Some(ExceptionDetails::from_error(err));
    }

    fn call(&self, name: &str, exception: Option<&ExceptionDetails>) {
        let Some(callee) = self.callee else {
            return;
        };
        if !callee.has_hook(name) {
            return;
        }
        trap(name, || callee.call_hook(name, exception));
    }
}

impl Drop for CallContext<'_> {
    fn drop(&mut self) {
        if self.callee.is_none() {
            return;
        }

        if self.failure.is_none() && thread::panicking() {
            self.failure = Some(ExceptionDetails::from_panic());
        }
        let name = hook_name("post", self.base_name);
        self.call(&name, self.failure.as_ref());
    }
}

fn hook_name(prefix: &str, base_name: Option<&str>) -> String {
    match base_name {
        Some(base_name) => format!("{prefix}_{base_name}"),
        None => format!("_{prefix}_call"),
    }
}

fn trap(name: &str, hook: impl FnOnce() -> Result<(), CrudError>) {
    match catch_unwind(AssertUnwindSafe(hook)) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            error!(event = "CallContext", phase = "HookFailed", hook = name, error = %err);
        }
        Err(_) => {
            error!(event = "CallContext", phase = "HookPanicked", hook = name);
        }
    }
}
