//! Entry point for CRUD calls against an address.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::access_control::AccessControlValidator;
use crate::args::Kwargs;
use crate::call_stack::CallStack;
use crate::capabilities::ACCESS_CONTROL_VALIDATOR;
use crate::error::CrudError;
use crate::protocol::{ContextManagerCallee, Protocol};
use crate::registry::{self, Registry};
use crate::types::{CrudUrl, Operation};

/// A CRUD URL bound to the protocol serving it.
///
/// ```rust
/// use crud_engine::{
///     CallArgs, CrudError, Entity, EntityId, Instance, Kwargs, OperationTable, Registry, Resource,
/// };
/// use once_cell::sync::Lazy;
/// use serde_json::{Value, json};
///
/// struct Widgets;
///
/// impl Widgets {
///     fn select(_this: &Instance<Self>, args: CallArgs) -> Result<Value, CrudError> {
///         Ok(json!({ "widget": args.require_select_id()? }))
///     }
///
///     fn get_orders(_this: &Instance<Self>, args: CallArgs) -> Result<Value, CrudError> {
///         let widget = args.require_selected_value()?["widget"].clone();
///         Ok(json!({ "order": args.select_id(), "widget": widget }))
///     }
/// }
///
/// impl Entity for Widgets {
///     fn operations() -> &'static OperationTable<Self> {
///         static OPERATIONS: Lazy<OperationTable<Widgets>> = Lazy::new(|| {
///             OperationTable::new()
///                 .with("select", Widgets::select)
///                 .with("get_orders", Widgets::get_orders)
///         });
///         &OPERATIONS
///     }
/// }
///
/// let registry = Registry::builder()
///     .entity(EntityId::new("shop", "Widgets"), || {
///         Ok(Instance::new(Widgets).into_shared())
///     })
///     .build();
///
/// let resource = Resource::with_registry("/shop/widgets/42/orders/7", &registry)?;
/// assert_eq!(
///     resource.get(&Kwargs::new())?,
///     json!({ "order": "7", "widget": "42" })
/// );
/// # Ok::<(), CrudError>(())
/// ```
pub struct Resource {
    url: CrudUrl,
    protocol: Arc<dyn Protocol>,
}

impl Debug for Resource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Resource")
            .field("url", &self.url.raw())
            .finish_non_exhaustive()
    }
}

impl Resource {
    /// Opens `address` against the process wide registry.
    pub fn new(address: &str) -> Result<Self, CrudError> {
        Self::with_registry(address, &registry::global())
    }

    pub fn with_registry(address: &str, registry: &Registry) -> Result<Self, CrudError> {
        let url = CrudUrl::parse(address)?;
        let protocol = registry.open(&url)?;
        debug!(event = "Resource", phase = "Open", url = %url, protocol = %url.protocol_name());
        Ok(Self { url, protocol })
    }

    pub fn url(&self) -> &CrudUrl {
        &self.url
    }

    pub fn protocol(&self) -> &Arc<dyn Protocol> {
        &self.protocol
    }

    /// Executes `operation`, matched case-insensitively against the supported set.
    pub fn call(&self, operation: &str, kwargs: &Kwargs) -> Result<Value, CrudError> {
        self.call_operation(Operation::parse(operation)?, kwargs)
    }

    pub fn call_operation(&self, operation: Operation, kwargs: &Kwargs) -> Result<Value, CrudError> {
        debug!(event = "Resource", phase = "Call", url = %self.url, operation = %operation);
        self.protocol.call(operation.as_ref(), kwargs)
    }

    /// The steps `operation` would execute.
    pub fn call_stack(&self, operation: &str) -> Result<CallStack, CrudError> {
        self.protocol.call_stack(Operation::parse(operation)?.as_ref())
    }

    pub fn create(&self, kwargs: &Kwargs) -> Result<Value, CrudError> {
        self.call_operation(Operation::Create, kwargs)
    }

    pub fn delete(&self, kwargs: &Kwargs) -> Result<Value, CrudError> {
        self.call_operation(Operation::Delete, kwargs)
    }

    pub fn execute(&self, kwargs: &Kwargs) -> Result<Value, CrudError> {
        self.call_operation(Operation::Execute, kwargs)
    }

    pub fn get(&self, kwargs: &Kwargs) -> Result<Value, CrudError> {
        self.call_operation(Operation::Get, kwargs)
    }

    pub fn is_valid(&self, kwargs: &Kwargs) -> Result<Value, CrudError> {
        self.call_operation(Operation::IsValid, kwargs)
    }

    pub fn update(&self, kwargs: &Kwargs) -> Result<Value, CrudError> {
        self.call_operation(Operation::Update, kwargs)
    }

    pub fn upsert(&self, kwargs: &Kwargs) -> Result<Value, CrudError> {
        self.call_operation(Operation::Upsert, kwargs)
    }

    /// True if `operation` is in the supported set and resolves for this address.
    pub fn is_operation_supported(&self, operation: &str) -> bool {
        match Operation::parse(operation) {
            Ok(operation) => self.protocol.has_operation(operation.as_ref()),
            Err(_) => false,
        }
    }

    pub fn is_supported(&self, feature: &str) -> bool {
        self.protocol.is_supported(feature)
    }

    pub fn access_control_validator(
        &self,
    ) -> Result<Option<Arc<dyn AccessControlValidator>>, CrudError> {
        self.require_validator_support()?;
        Ok(self.protocol.access_control_validator())
    }

    pub fn set_access_control_validator(
        &self,
        validator: Option<Arc<dyn AccessControlValidator>>,
    ) -> Result<(), CrudError> {
        self.require_validator_support()?;
        self.protocol.set_access_control_validator(validator)
    }

    pub fn with_access_control_validator(
        self,
        validator: Arc<dyn AccessControlValidator>,
    ) -> Result<Self, CrudError> {
        self.set_access_control_validator(Some(validator))?;
        Ok(self)
    }

    pub fn context_manager_callee(&self) -> Option<Arc<dyn ContextManagerCallee>> {
        self.protocol.context_manager_callee()
    }

    pub fn set_context_manager_callee(&self, callee: Option<Arc<dyn ContextManagerCallee>>) {
        self.protocol.set_context_manager_callee(callee);
    }

    pub fn with_context_manager_callee(self, callee: Arc<dyn ContextManagerCallee>) -> Self {
        self.set_context_manager_callee(Some(callee));
        self
    }

    fn require_validator_support(&self) -> Result<(), CrudError> {
        if self.protocol.is_supported(ACCESS_CONTROL_VALIDATOR) {
            Ok(())
        } else {
            Err(CrudError::OperationNotSupported(format!(
                "Protocol '{}' does not support access control validators",
                self.url.scheme()
            )))
        }
    }
}
