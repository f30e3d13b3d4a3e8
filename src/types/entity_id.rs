//! Namespaced identifiers for registered entity types.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CrudError;

use super::address::{filter_control_chars, replace_non_word_chars};

/// Identifies an entity type: a module namespace plus a CamelCase type name,
/// rendered as `module.Name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    module: String,
    name: String,
}

impl EntityId {
    /// Construct from already normalized parts.
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        EntityId {
            module: module.into(),
            name: name.into(),
        }
    }

    /// Derive the id from the first two address path segments.
    ///
    /// Non-word runs in the module segment become `_`. The instance segment
    /// loses its control characters, `-` becomes `_`, and the `_`-separated
    /// words are capitalized and joined (`order-items` is `OrderItems`).
    pub fn from_path_segments(module: &str, instance: &str) -> Self {
        let module = replace_non_word_chars(module);
        let instance = filter_control_chars(instance).replace('-', "_");
        let name = instance.split('_').map(capitalize).collect::<String>();
        EntityId::new(module, name)
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}.{}", self.module, self.name)
    }
}

impl FromStr for EntityId {
    type Err = CrudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('.') {
            Some((module, name)) if !module.is_empty() && !name.is_empty() => {
                Ok(EntityId::new(module, name))
            }
            _ => Err(CrudError::InputValidation(format!(
                "Failed to parse entity id '{s}' (expected format: module.Name)"
            ))),
        }
    }
}
