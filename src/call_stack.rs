//! Resolution of an operation plus path selectors into a sequence of calls.
//!
//! Selectors are consumed from the tail. Each iteration takes the last token
//! and checks whether `<operation>_<token>` exists on the instance. If it does,
//! the token named a sub-resource and the step carries no selector id. If not,
//! the token is an identifier: the token before it names the method
//! (`<operation>_<sanitized token>`), or, when nothing precedes it, the plain
//! operation method is used. Every iteration after the first resolves against
//! `select`, so for `get` on `[42, orders, 7]` the stack is
//! `select(42) -> get_orders(7)`.

use std::collections::VecDeque;
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use itertools::Itertools;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::args::CallArgs;
use crate::capabilities::CALL_STACK_OPTIMIZATION;
use crate::error::CrudError;
use crate::traits::{CrudInstance, Invocable};
use crate::types::replace_non_word_chars;

/// Operation used for every step but the one resolved first.
pub const SELECT: &str = "select";

/// One resolved method invocation.
#[derive(Clone, Serialize)]
pub struct CallStep {
    #[serde(skip)]
    method: Invocable,
    method_name: String,
    select_id: Option<String>,
}

impl CallStep {
    pub fn new(method: Invocable, method_name: impl Into<String>, select_id: Option<String>) -> Self {
        Self {
            method,
            method_name: method_name.into(),
            select_id,
        }
    }

    /// Binds `method_name` on `instance`.
    pub fn resolve(
        instance: &Arc<dyn CrudInstance>,
        method_name: String,
        select_id: Option<String>,
    ) -> Result<Self, CrudError> {
        let method = Arc::clone(instance).bind(&method_name).ok_or_else(|| {
            CrudError::OperationNotSupported(format!("Operation '{method_name}' is not supported"))
        })?;
        Ok(Self::new(method, method_name, select_id))
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn select_id(&self) -> Option<&str> {
        self.select_id.as_deref()
    }

    pub fn invoke(&self, args: CallArgs) -> Result<Value, CrudError> {
        (self.method)(args)
    }
}

impl Debug for CallStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CallStep")
            .field("method_name", &self.method_name)
            .field("select_id", &self.select_id)
            .finish_non_exhaustive()
    }
}

impl Display for CallStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.select_id {
            Some(id) => write!(f, "{}({id})", self.method_name),
            None => write!(f, "{}", self.method_name),
        }
    }
}

/// Steps for one requested operation, in execution order.
#[derive(Debug, Clone, Serialize)]
pub struct CallStack {
    operation: String,
    steps: Vec<CallStep>,
}

impl CallStack {
    /// Resolves `operation` against `instance` for the given selectors.
    pub fn build(
        operation: &str,
        instance: &Arc<dyn CrudInstance>,
        selectors: &[String],
    ) -> Result<Self, CrudError> {
        let requested = operation.to_lowercase();
        let mut steps = VecDeque::with_capacity(selectors.len().max(1));

        if selectors.is_empty() {
            steps.push_front(CallStep::resolve(instance, requested.clone(), None)?);
        } else {
            let mut remaining = selectors.to_vec();
            let mut operation = requested.clone();

            while let Some(candidate) = remaining.pop() {
                let mut method_name = format!("{operation}_{candidate}");

                let select_id = if instance.has_operation(&method_name) {
                    None
                } else if let Some(selector) = remaining.pop() {
                    method_name = format!("{operation}_{}", replace_non_word_chars(&selector));
                    if !instance.has_operation(&method_name) {
                        return Err(CrudError::OperationNotSupported(format!(
                            "Can't find match for operation call stack '{operation}'"
                        )));
                    }
                    Some(candidate)
                } else {
                    method_name = operation.clone();
                    Some(candidate)
                };

                steps.push_front(CallStep::resolve(instance, method_name, select_id)?);
                operation = SELECT.to_string();
            }
        }

        let stack = CallStack {
            operation: requested,
            steps: Vec::from(steps),
        };
        debug!(
            event = "CallStack",
            phase = "Resolved",
            operation = %stack.operation,
            steps = %stack.steps.iter().join(" -> ")
        );

        if !instance.is_supported(CALL_STACK_OPTIMIZATION) {
            return Ok(stack);
        }

        let optimized = instance.optimize_call_stack(stack)?;
        debug!(
            event = "CallStack",
            phase = "Optimized",
            operation = %optimized.operation,
            steps = %optimized.steps.iter().join(" -> ")
        );
        Ok(optimized)
    }

    /// Assembles a stack from existing steps, for call stack rewrites.
    pub fn from_steps(operation: impl Into<String>, steps: Vec<CallStep>) -> Self {
        Self {
            operation: operation.into(),
            steps,
        }
    }

    /// The requested operation, lower-cased.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn steps(&self) -> &[CallStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<CallStep> {
        self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
