use serde::Deserialize;
use tracing::debug;

use crate::access_control::PermissiveValidator;
use crate::error::CrudError;

/// Settings of a [`PermissiveValidator`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorConfig {
    #[serde(default)]
    pub blacklisted_operations: Vec<String>,
}

impl ValidatorConfig {
    pub fn into_validator(self) -> PermissiveValidator {
        PermissiveValidator::new().with_blacklisted_operations(self.blacklisted_operations)
    }
}

/// Build a `PermissiveValidator` from a JSON document.
///
/// Malformed documents are mapped into `CrudError::InputValidation`.
///
/// Example:
/// ```rust
/// use crud_engine::load_permissive_validator;
/// let validator = load_permissive_validator(r#"{ "blacklisted_operations": ["delete"] }"#).unwrap();
/// assert_eq!(validator.blacklisted_operations(), vec!["delete"]);
/// ```
pub fn load_permissive_validator(text: &str) -> Result<PermissiveValidator, CrudError> {
    let config: ValidatorConfig = serde_json::from_str(text)?;
    debug!(
        event = "Loader",
        phase = "PermissiveValidator",
        blacklisted = config.blacklisted_operations.len()
    );
    Ok(config.into_validator())
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[test]
    fn test_load_permissive_validator() {
        let validator = load_permissive_validator(
            r#"{ "blacklisted_operations": ["delete", "upsert", "delete"] }"#,
        )
        .unwrap();
        assert_eq!(validator.blacklisted_operations(), vec!["delete", "upsert"]);
    }

    #[test]
    fn test_missing_list_is_empty() {
        let validator = load_permissive_validator("{}").unwrap();
        assert!(validator.blacklisted_operations().is_empty());
    }

    #[parameterized(
        not_json = { "blacklisted_operations = []" },
        not_a_list = { r#"{ "blacklisted_operations": "delete" }"# },
        not_strings = { r#"{ "blacklisted_operations": [1, 2] }"# },
        unknown_field = { r#"{ "allowed_operations": [] }"# },
    )]
    fn test_rejects(text: &str) {
        assert!(matches!(
            load_permissive_validator(text),
            Err(CrudError::InputValidation(_))
        ));
    }
}
