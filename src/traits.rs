use std::sync::Arc;

use serde_json::Value;

use crate::access_control::AccessControlValidator;
use crate::args::CallArgs;
use crate::call_stack::CallStack;
use crate::capabilities::Capabilities;
use crate::error::CrudError;

/// A bound entity method, ready to be called with a step's arguments.
pub type Invocable = Arc<dyn Fn(CallArgs) -> Result<Value, CrudError> + Send + Sync>;

/// Anything answering feature queries.
pub trait Supports {
    /// The declared features.
    fn supported_features(&self) -> &Capabilities;

    /// True if `feature` is declared and currently evaluates to true.
    fn is_supported(&self, feature: &str) -> bool {
        self.supported_features().is_supported(feature)
    }
}

/// An entity instance as seen by protocols and call stacks.
///
/// [`crate::Instance`] implements this for every [`crate::Entity`]; implement
/// it directly only for entities that cannot use a static operation table.
pub trait CrudInstance: Supports + Send + Sync {
    /// True if the instance exposes an operation method named `name`.
    fn has_operation(&self, name: &str) -> bool;

    /// Binds the operation method `name` to this instance.
    fn bind(self: Arc<Self>, name: &str) -> Option<Invocable>;

    /// Rewrites a freshly built call stack. Only consulted when the instance
    /// supports `call_stack_optimization`.
    fn optimize_call_stack(&self, stack: CallStack) -> Result<CallStack, CrudError> {
        Ok(stack)
    }

    fn access_control(&self) -> Option<Arc<dyn AccessControlValidator>>;

    fn set_access_control(&self, validator: Option<Arc<dyn AccessControlValidator>>);
}
