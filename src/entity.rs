//! Entity types and the instances wrapping them.
//!
//! An entity type lists its operation methods once, in a static
//! [`OperationTable`]. Method names follow the call stack conventions:
//! the plain operation (`get`), sub-resource methods (`get_orders`) and
//! `select` / `select_<name>` for intermediate path steps.
//!
//! ```rust
//! use crud_engine::{CallArgs, CrudError, Entity, Instance, OperationTable};
//! use once_cell::sync::Lazy;
//! use serde_json::{Value, json};
//!
//! struct Greeter;
//!
//! impl Greeter {
//!     fn get(_this: &Instance<Self>, args: CallArgs) -> Result<Value, CrudError> {
//!         Ok(json!({ "hello": args.select_id() }))
//!     }
//! }
//!
//! impl Entity for Greeter {
//!     fn operations() -> &'static OperationTable<Self> {
//!         static OPERATIONS: Lazy<OperationTable<Greeter>> =
//!             Lazy::new(|| OperationTable::new().with("get", Greeter::get));
//!         &OPERATIONS
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::warn;

use crate::access_control::AccessControlValidator;
use crate::args::{CallArgs, Kwargs};
use crate::call_stack::CallStack;
use crate::capabilities::{ACCESS_CONTROL_VALIDATION, Capabilities, Capability};
use crate::error::CrudError;
use crate::traits::{CrudInstance, Invocable, Supports};

/// An operation method of entity type `E`.
pub type Handler<E> = fn(&Instance<E>, CallArgs) -> Result<Value, CrudError>;

/// Method name to handler mapping, built once per entity type.
pub struct OperationTable<E> {
    handlers: HashMap<&'static str, Handler<E>>,
}

impl<E> Default for OperationTable<E> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<E> OperationTable<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, handler: Handler<E>) -> Self {
        self.handlers.insert(name, handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<Handler<E>> {
        self.handlers.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Sorted method names.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

/// A concrete entity type reachable through CRUD URLs.
pub trait Entity: Send + Sync + Sized + 'static {
    /// Argument keys dropped by [`Instance::filtered_kwargs`] in addition to the
    /// underscore-prefixed ones.
    const RESERVED_KEYS: &'static [&'static str] = &[];

    fn operations() -> &'static OperationTable<Self>;

    /// Declare features beyond `access_control_validation`.
    fn declare_features(&self, _features: &mut Capabilities) {}

    /// See [`CrudInstance::optimize_call_stack`].
    fn optimize_call_stack(&self, stack: CallStack) -> Result<CallStack, CrudError> {
        Ok(stack)
    }
}

type ValidatorSlot = Arc<RwLock<Option<Arc<dyn AccessControlValidator>>>>;

/// An entity value plus its capabilities and access control validator.
pub struct Instance<E> {
    entity: E,
    features: Capabilities,
    access_control: ValidatorSlot,
}

impl<E: Entity> Instance<E> {
    pub fn new(entity: E) -> Self {
        let access_control: ValidatorSlot = Arc::new(RwLock::new(None));

        let mut features = Capabilities::new();
        let slot = Arc::clone(&access_control);
        features.set(
            ACCESS_CONTROL_VALIDATION,
            Capability::probe(move || {
                slot.read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_some()
            }),
        );
        entity.declare_features(&mut features);

        Self {
            entity,
            features,
            access_control,
        }
    }

    pub fn entity(&self) -> &E {
        &self.entity
    }

    /// The call's keyword arguments without underscore-prefixed and reserved keys.
    pub fn filtered_kwargs(&self, args: &CallArgs) -> Kwargs {
        args.filtered(E::RESERVED_KEYS)
    }

    /// Runs `body` only if the attached validator allows `operation`.
    ///
    /// Fails with `AccessDenied` while no validator is attached.
    pub fn restricted<T>(
        &self,
        operation: &str,
        args: &CallArgs,
        body: impl FnOnce() -> Result<T, CrudError>,
    ) -> Result<T, CrudError> {
        if !self.is_supported(ACCESS_CONTROL_VALIDATION) {
            warn!(event = "AccessControl", phase = "Unavailable", operation = operation);
            return Err(CrudError::access_denied());
        }

        if let Some(validator) = self.access_control() {
            validator.validate(self, operation, args.kwargs())?;
        }
        body()
    }

    pub fn into_shared(self) -> Arc<dyn CrudInstance> {
        Arc::new(self)
    }
}

impl<E> Deref for Instance<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.entity
    }
}

impl<E: Entity> Supports for Instance<E> {
    fn supported_features(&self) -> &Capabilities {
        &self.features
    }
}

impl<E: Entity> CrudInstance for Instance<E> {
    fn has_operation(&self, name: &str) -> bool {
        E::operations().contains(name)
    }

    fn bind(self: Arc<Self>, name: &str) -> Option<Invocable> {
        let handler = E::operations().get(name)?;
        Some(Arc::new(move |args: CallArgs| handler(&self, args)))
    }

    fn optimize_call_stack(&self, stack: CallStack) -> Result<CallStack, CrudError> {
        self.entity.optimize_call_stack(stack)
    }

    fn access_control(&self) -> Option<Arc<dyn AccessControlValidator>> {
        self.access_control
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_access_control(&self, validator: Option<Arc<dyn AccessControlValidator>>) {
        *self
            .access_control
            .write()
            .unwrap_or_else(PoisonError::into_inner) = validator;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_control::PermissiveValidator;
    use crate::capabilities::CALL_STACK_OPTIMIZATION;
    use once_cell::sync::Lazy;
    use serde_json::json;

    struct Counter {
        start: i64,
    }

    impl Counter {
        fn get(this: &Instance<Self>, args: CallArgs) -> Result<Value, CrudError> {
            this.restricted("get", &args, || Ok(json!(this.start)))
        }

        fn is_valid(_this: &Instance<Self>, _args: CallArgs) -> Result<Value, CrudError> {
            Ok(json!(true))
        }
    }

    impl Entity for Counter {
        const RESERVED_KEYS: &'static [&'static str] = &["owner"];

        fn operations() -> &'static OperationTable<Self> {
            static OPERATIONS: Lazy<OperationTable<Counter>> = Lazy::new(|| {
                OperationTable::new()
                    .with("get", Counter::get)
                    .with("is_valid", Counter::is_valid)
            });
            &OPERATIONS
        }

        fn declare_features(&self, features: &mut Capabilities) {
            features.set_flag(CALL_STACK_OPTIMIZATION, false);
        }
    }

    #[test]
    fn test_operation_table() {
        assert!(Counter::operations().contains("get"));
        assert!(!Counter::operations().contains("delete"));
        assert_eq!(Counter::operations().names(), vec!["get", "is_valid"]);
    }

    #[test]
    fn test_access_control_validation_follows_validator() {
        let instance = Instance::new(Counter { start: 1 });
        assert!(!instance.is_supported(ACCESS_CONTROL_VALIDATION));

        instance.set_access_control(Some(Arc::new(PermissiveValidator::new())));
        assert!(instance.is_supported(ACCESS_CONTROL_VALIDATION));

        instance.set_access_control(None);
        assert!(!instance.is_supported(ACCESS_CONTROL_VALIDATION));
    }

    #[test]
    fn test_declared_features() {
        let instance = Instance::new(Counter { start: 1 });
        assert!(instance.supported_features().contains(CALL_STACK_OPTIMIZATION));
        assert!(!instance.is_supported(CALL_STACK_OPTIMIZATION));
    }

    #[test]
    fn test_restricted_without_validator_is_denied() {
        let instance = Arc::new(Instance::new(Counter { start: 5 }));
        let get = Arc::clone(&instance).bind("get").unwrap();
        assert!(matches!(
            get(CallArgs::default()),
            Err(CrudError::AccessDenied(_))
        ));
    }

    #[test]
    fn test_restricted_consults_validator() {
        let instance = Arc::new(Instance::new(Counter { start: 5 }));
        let validator = Arc::new(PermissiveValidator::new());
        instance.set_access_control(Some(validator.clone()));

        let get = Arc::clone(&instance).bind("get").unwrap();
        assert_eq!(get(CallArgs::default()).unwrap(), json!(5));

        validator.blacklist_operation("get");
        assert!(matches!(
            get(CallArgs::default()),
            Err(CrudError::AccessDenied(_))
        ));
    }

    #[test]
    fn test_unguarded_operation() {
        let instance = Arc::new(Instance::new(Counter { start: 5 }));
        let is_valid = Arc::clone(&instance).bind("is_valid").unwrap();
        assert_eq!(is_valid(CallArgs::default()).unwrap(), json!(true));
        assert!(Arc::clone(&instance).bind("delete").is_none());
    }

    #[test]
    fn test_filtered_kwargs_drops_reserved() {
        let instance = Instance::new(Counter { start: 5 });
        let kwargs = json!({"owner": "bob", "name": "x", "_hidden": 1})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(
            instance.filtered_kwargs(&CallArgs::new(kwargs)),
            json!({"name": "x"}).as_object().cloned().unwrap()
        );
    }
}
