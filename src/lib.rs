// src/lib.rs
pub use access_control::{AccessControlValidator, PermissiveValidator};
pub use args::{CallArgs, EXCLUSION_MARKER, Kwargs};
pub use call_stack::{CallStack, CallStep, SELECT};
pub use capabilities::{
    ACCESS_CONTROL_VALIDATION, ACCESS_CONTROL_VALIDATOR, BLACKLISTING, CALL_STACK_OPTIMIZATION,
    Capabilities, Capability,
};
pub use entity::{Entity, Handler, Instance, OperationTable};
pub use error::{BackendError, CrudError, ErrorKind};
pub use loader::{ValidatorConfig, load_permissive_validator};
pub use protocol::{ContextManagerCallee, ExceptionDetails, Hooks, InProcess, Protocol};
pub use registry::{Registry, RegistryBuilder, register_entity, register_protocol};
pub use resource::Resource;
pub use traits::{CrudInstance, Invocable, Supports};
pub use types::{CrudUrl, EntityId, Operation};

pub mod access_control;
mod args;
mod call_stack;
mod capabilities;
mod entity;
mod error;
mod executor;
pub mod filter;
mod loader;
pub mod protocol;
pub mod registry;
mod resource;
mod traits;
pub mod types;
