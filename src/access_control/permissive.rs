use std::sync::{PoisonError, RwLock};

use serde_json::Value;
use tracing::warn;

use super::AccessControlValidator;
use crate::args::Kwargs;
use crate::capabilities::{BLACKLISTING, Capabilities};
use crate::error::CrudError;
use crate::traits::{CrudInstance, Supports};

/// Allows every operation that is not on its deny list.
#[derive(Debug)]
pub struct PermissiveValidator {
    features: Capabilities,
    blacklisted_operations: RwLock<Vec<String>>,
}

impl Default for PermissiveValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn dedup_in_order(operations: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for operation in operations {
        if !unique.contains(&operation) {
            unique.push(operation);
        }
    }
    unique
}

impl PermissiveValidator {
    pub fn new() -> Self {
        Self {
            features: Capabilities::new().with_flag(BLACKLISTING, true),
            blacklisted_operations: RwLock::new(Vec::new()),
        }
    }

    pub fn with_blacklisted_operations<I, S>(self, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self
            .blacklisted_operations
            .write()
            .unwrap_or_else(PoisonError::into_inner) =
            dedup_in_order(operations.into_iter().map(Into::into));
        self
    }

    pub fn blacklisted_operations(&self) -> Vec<String> {
        self.blacklisted_operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the deny list with `operations`, which must be an array of
    /// strings. On failure the current list is kept.
    pub fn set_blacklisted_operations(&self, operations: &Value) -> Result<(), CrudError> {
        let invalid =
            || CrudError::InputValidation("List of blacklisted operations given is invalid".to_string());

        let Value::Array(items) = operations else {
            return Err(invalid());
        };
        let names = items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(invalid)?;

        *self
            .blacklisted_operations
            .write()
            .unwrap_or_else(PoisonError::into_inner) = dedup_in_order(names);
        Ok(())
    }

    pub fn blacklist_operation(&self, operation: impl Into<String>) {
        let operation = operation.into();
        let mut operations = self
            .blacklisted_operations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !operations.contains(&operation) {
            operations.push(operation);
        }
    }
}

impl Supports for PermissiveValidator {
    fn supported_features(&self) -> &Capabilities {
        &self.features
    }
}

impl AccessControlValidator for PermissiveValidator {
    fn validate(
        &self,
        _instance: &dyn CrudInstance,
        operation: &str,
        _context: &Kwargs,
    ) -> Result<(), CrudError> {
        let denied = self
            .blacklisted_operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|o| o == operation);

        if denied {
            warn!(event = "AccessControl", phase = "Denied", operation = operation);
            return Err(CrudError::AccessDenied(format!(
                "Operation '{operation}' is blacklisted"
            )));
        }
        Ok(())
    }
}
