//! Protocols route a CRUD URL to an entity instance.
//!
//! The scheme of a CRUD URL selects the protocol, which owns the entity
//! instance, builds call stacks for requested operations and runs them with
//! its context manager callee.

mod call_context;
mod in_process;

use std::sync::Arc;

use serde_json::Value;

use crate::access_control::AccessControlValidator;
use crate::args::Kwargs;
use crate::call_stack::CallStack;
use crate::error::CrudError;
use crate::traits::Supports;

pub use call_context::{
    CallContext, ContextManagerCallee, ExceptionDetails, Hooks, POST_CALL, PRE_CALL,
};
pub use in_process::InProcess;

pub trait Protocol: Supports + Send + Sync {
    /// Resolves `operation` into the steps to execute.
    fn call_stack(&self, operation: &str) -> Result<CallStack, CrudError>;

    /// Builds and executes the call stack for `operation`.
    fn call(&self, operation: &str, kwargs: &Kwargs) -> Result<Value, CrudError> {
        let stack = self.call_stack(operation)?;
        let callee = self.context_manager_callee();
        stack.execute(kwargs, callee.as_deref())
    }

    /// True if a call stack can be built for `operation`.
    fn has_operation(&self, operation: &str) -> bool {
        self.call_stack(operation).is_ok()
    }

    fn access_control_validator(&self) -> Option<Arc<dyn AccessControlValidator>> {
        None
    }

    fn set_access_control_validator(
        &self,
        _validator: Option<Arc<dyn AccessControlValidator>>,
    ) -> Result<(), CrudError> {
        Err(CrudError::OperationNotSupported(
            "Protocol does not support access control validators".to_string(),
        ))
    }

    fn context_manager_callee(&self) -> Option<Arc<dyn ContextManagerCallee>>;

    fn set_context_manager_callee(&self, callee: Option<Arc<dyn ContextManagerCallee>>);
}
