//! Validators consulted before guarded entity operations run.
//!
//! A validator is attached to an entity instance (usually through
//! [`crate::Resource::set_access_control_validator`]). Guarded operations
//! call [`crate::Instance::restricted`], which denies access outright while no
//! validator is attached and otherwise asks the validator. Returning `Ok(())`
//! allows the operation, any error denies it.

mod permissive;

use crate::args::Kwargs;
use crate::error::{BackendError, CrudError};
use crate::traits::{CrudInstance, Supports};

pub use permissive::PermissiveValidator;

pub trait AccessControlValidator: Supports + Send + Sync {
    /// Validate access to `operation` on `instance` with the call's arguments.
    fn validate(
        &self,
        _instance: &dyn CrudInstance,
        _operation: &str,
        _context: &Kwargs,
    ) -> Result<(), CrudError> {
        Err(BackendError::NotImplemented("access control validation".to_string()).into())
    }
}
