use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use super::{ContextManagerCallee, Protocol};
use crate::access_control::AccessControlValidator;
use crate::call_stack::CallStack;
use crate::capabilities::{ACCESS_CONTROL_VALIDATOR, Capabilities};
use crate::error::CrudError;
use crate::registry::Registry;
use crate::traits::{CrudInstance, Supports};
use crate::types::{AddressPath, CrudUrl, EntityId};

/// Routes to entities registered in the current process.
///
/// The first two path segments name the entity, the remaining ones are the
/// selectors used to build call stacks.
pub struct InProcess {
    entity: EntityId,
    instance: Arc<dyn CrudInstance>,
    selectors: Vec<String>,
    features: Capabilities,
    callee: RwLock<Option<Arc<dyn ContextManagerCallee>>>,
}

impl InProcess {
    pub fn open(url: &CrudUrl, registry: &Registry) -> Result<Self, CrudError> {
        let address = AddressPath::parse(url.path())?;
        let instance = registry.instantiate(address.entity())?;
        debug!(
            event = "Protocol",
            phase = "Open",
            protocol = "x_in_process",
            entity = %address.entity(),
            selectors = address.selectors().len()
        );

        Ok(Self::new(address.entity().clone(), instance, address.selectors().to_vec()))
    }

    pub fn new(entity: EntityId, instance: Arc<dyn CrudInstance>, selectors: Vec<String>) -> Self {
        Self {
            entity,
            instance,
            selectors,
            features: Capabilities::new().with_flag(ACCESS_CONTROL_VALIDATOR, true),
            callee: RwLock::new(None),
        }
    }

    pub fn entity(&self) -> &EntityId {
        &self.entity
    }

    pub fn instance(&self) -> &Arc<dyn CrudInstance> {
        &self.instance
    }

    pub fn selectors(&self) -> &[String] {
        &self.selectors
    }
}

impl Supports for InProcess {
    fn supported_features(&self) -> &Capabilities {
        &self.features
    }

    /// Own features first, anything else is answered by the entity instance.
    fn is_supported(&self, feature: &str) -> bool {
        if self.features.contains(feature) {
            self.features.is_supported(feature)
        } else {
            self.instance.is_supported(feature)
        }
    }
}

impl Protocol for InProcess {
    fn call_stack(&self, operation: &str) -> Result<CallStack, CrudError> {
        CallStack::build(operation, &self.instance, &self.selectors)
    }

    fn access_control_validator(&self) -> Option<Arc<dyn AccessControlValidator>> {
        self.instance.access_control()
    }

    fn set_access_control_validator(
        &self,
        validator: Option<Arc<dyn AccessControlValidator>>,
    ) -> Result<(), CrudError> {
        self.instance.set_access_control(validator);
        Ok(())
    }

    fn context_manager_callee(&self) -> Option<Arc<dyn ContextManagerCallee>> {
        self.callee
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_context_manager_callee(&self, callee: Option<Arc<dyn ContextManagerCallee>>) {
        *self.callee.write().unwrap_or_else(PoisonError::into_inner) = callee;
    }
}
