//! Arguments handed to entity operations.

use serde_json::{Map, Value};

use crate::error::CrudError;
use crate::filter::TreeFilterParser;

/// Caller supplied keyword arguments.
pub type Kwargs = Map<String, Value>;

/// Argument keys starting with this marker never reach an entity from the caller.
pub const EXCLUSION_MARKER: char = '_';

/// Returns `kwargs` without the keys starting with [`EXCLUSION_MARKER`].
pub fn strip_excluded(kwargs: &Kwargs) -> Kwargs {
    kwargs
        .iter()
        .filter(|(key, _)| !key.starts_with(EXCLUSION_MARKER))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Arguments for a single call step: the caller's keyword arguments plus the
/// values threaded in by the call stack.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    kwargs: Kwargs,
    select_id: Option<String>,
    selected_value: Option<Value>,
}

impl CallArgs {
    pub fn new(kwargs: Kwargs) -> Self {
        Self {
            kwargs,
            select_id: None,
            selected_value: None,
        }
    }

    pub(crate) fn for_step(
        kwargs: Kwargs,
        select_id: Option<String>,
        selected_value: Option<Value>,
    ) -> Self {
        Self {
            kwargs,
            select_id,
            selected_value,
        }
    }

    pub fn with_select_id(mut self, select_id: impl Into<String>) -> Self {
        self.select_id = Some(select_id.into());
        self
    }

    pub fn with_selected_value(mut self, value: Value) -> Self {
        self.selected_value = Some(value);
        self
    }

    pub fn kwargs(&self) -> &Kwargs {
        &self.kwargs
    }

    /// The literal identifier consumed by this step, if any.
    pub fn select_id(&self) -> Option<&str> {
        self.select_id.as_deref()
    }

    /// The previous step's return value. `None` for the first step.
    pub fn selected_value(&self) -> Option<&Value> {
        self.selected_value.as_ref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.kwargs.get(key)
    }

    pub fn require_select_id(&self) -> Result<&str, CrudError> {
        self.select_id()
            .ok_or_else(|| CrudError::InputValidation("No element identifier given".to_string()))
    }

    pub fn require_selected_value(&self) -> Result<&Value, CrudError> {
        self.selected_value()
            .ok_or_else(|| CrudError::InputValidation("No element selected".to_string()))
    }

    pub fn require_str(&self, key: &str) -> Result<&str, CrudError> {
        match self.kwargs.get(key) {
            Some(Value::String(value)) => Ok(value),
            Some(_) => Err(CrudError::InputValidation(format!(
                "Argument '{key}' must be a string"
            ))),
            None => Err(CrudError::InputValidation(format!(
                "Argument '{key}' is missing"
            ))),
        }
    }

    /// Keyword arguments without underscore-prefixed keys and without `reserved`.
    pub fn filtered(&self, reserved: &[&str]) -> Kwargs {
        self.kwargs
            .iter()
            .filter(|(key, _)| {
                !key.starts_with(EXCLUSION_MARKER) && !reserved.contains(&key.as_str())
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Builds a filter parser from the string argument `key`, if present.
    pub fn filter(&self, key: &str) -> Result<Option<TreeFilterParser>, CrudError> {
        match self.kwargs.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(document)) => TreeFilterParser::new(document).map(Some),
            Some(_) => Err(CrudError::InputValidation(
                "Filter given is invalid".to_string(),
            )),
        }
    }
}
