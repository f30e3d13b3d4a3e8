//! The fixed set of operations callers may request.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::error::CrudError;

/// A CRUD operation. Parsing is case-insensitive.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Delete,
    Execute,
    Get,
    IsValid,
    Update,
    Upsert,
}

impl Operation {
    /// Parses a requested operation name, failing with `OperationNotSupported`
    /// for anything outside the supported set.
    pub fn parse(name: &str) -> Result<Self, CrudError> {
        Operation::from_str(name).map_err(|_| {
            CrudError::OperationNotSupported(format!(
                "Operation '{}' is not supported",
                name.to_lowercase()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;
    use yare::parameterized;

    #[parameterized(
        lower = { "get", Operation::Get },
        upper = { "GET", Operation::Get },
        mixed = { "Is_Valid", Operation::IsValid },
        upsert = { "upsert", Operation::Upsert },
    )]
    fn test_parse(name: &str, expected: Operation) {
        assert_eq!(Operation::parse(name).unwrap(), expected);
    }

    #[parameterized(
        select = { "select" },
        unknown = { "frobnicate" },
        camel = { "isValid" },
        empty = { "" },
    )]
    fn test_parse_rejects(name: &str) {
        assert!(matches!(
            Operation::parse(name),
            Err(CrudError::OperationNotSupported(_))
        ));
    }

    #[test]
    fn test_supported_set() {
        let names: Vec<String> = Operation::iter().map(|op| op.to_string()).collect();
        assert_eq!(
            names,
            vec!["create", "delete", "execute", "get", "is_valid", "update", "upsert"]
        );
    }

    #[test]
    fn test_as_ref_matches_method_names() {
        assert_eq!(Operation::IsValid.as_ref(), "is_valid");
    }
}
