//! Translation of JSON filter documents into condition trees.
//!
//! A filter document is a JSON object or array. Objects are AND-concatenated
//! conditions keyed by field, arrays are OR-concatenated alternatives for the
//! enclosing key, and every other value is a literal:
//!
//! ```rust
//! use crud_engine::filter::{FilterNode, FilterParser, TreeFilterParser};
//!
//! let parser = TreeFilterParser::new(r#"{"status": ["open", "held"], "owner": "bob"}"#).unwrap();
//! let FilterNode::And(conditions) = parser.filter().unwrap() else { panic!() };
//! assert_eq!(conditions.len(), 2);
//! ```
//!
//! Keys on the parser's [`Blacklist`] contribute nothing: they stay in the
//! enclosing AND node, mapped to `None`.

mod blacklist;
mod flat;

use std::collections::BTreeMap;

use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CrudError;

pub use blacklist::Blacklist;
pub use flat::{FlatFilterParser, TreeFilterParser};

/// A parsed filter condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterNode {
    /// All conditions must hold. Blacklisted keys map to `None`.
    And(BTreeMap<String, Option<FilterNode>>),
    /// Any of `nodes` must hold for `key`. The key is absent at the top level.
    Or {
        key: Option<String>,
        nodes: Vec<FilterNode>,
    },
    Leaf(Value),
}

impl FilterNode {
    pub fn empty() -> Self {
        FilterNode::And(BTreeMap::new())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FilterNode::And(conditions) if conditions.is_empty())
    }
}

/// Raw document, blacklist and cached result shared by every parser variant.
#[derive(Debug)]
pub struct FilterState {
    raw: String,
    blacklist: Blacklist,
    filter: OnceCell<FilterNode>,
}

impl FilterState {
    pub fn new(document: &str) -> Self {
        Self {
            raw: document.trim().to_string(),
            blacklist: Blacklist::new(),
            filter: OnceCell::new(),
        }
    }

    pub fn from_bytes(document: &[u8]) -> Result<Self, CrudError> {
        let document = std::str::from_utf8(document)
            .map_err(|_| CrudError::InputValidation("Filter given is invalid".to_string()))?;
        Ok(Self::new(document))
    }

    pub fn with_blacklist(mut self, blacklist: Blacklist) -> Self {
        self.blacklist = blacklist;
        self
    }

    /// The trimmed document.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }
}

/// A filter parser producing [`FilterNode`] trees.
///
/// Variants decide how AND and OR concatenations and the empty filter are
/// represented. The defaults reject all three.
pub trait FilterParser: Send + Sync {
    fn state(&self) -> &FilterState;

    fn parse_and_concatenation(
        &self,
        _filter_data: &Map<String, Value>,
    ) -> Result<FilterNode, CrudError> {
        Err(CrudError::OperationNotSupported(
            "AND-concatenated filter definitions are not supported".to_string(),
        ))
    }

    fn parse_or_concatenation(
        &self,
        _key: Option<&str>,
        _filter_list: &[Value],
    ) -> Result<FilterNode, CrudError> {
        Err(CrudError::OperationNotSupported(
            "OR-concatenated filter definitions are not supported".to_string(),
        ))
    }

    fn empty_filter(&self) -> Result<FilterNode, CrudError> {
        Err(CrudError::OperationNotSupported(
            "Empty filter definitions are not supported".to_string(),
        ))
    }

    /// Stores the empty filter for an all-whitespace document. Called by
    /// constructors.
    fn prepare(&self) -> Result<(), CrudError> {
        let state = self.state();
        if state.raw.is_empty() && state.filter.get().is_none() {
            let empty = self.empty_filter()?;
            let _ = state.filter.set(empty);
        }
        Ok(())
    }

    /// The parsed filter. Computed on first access and cached afterwards,
    /// blacklist changes made later are not reflected.
    fn filter(&self) -> Result<&FilterNode, CrudError> {
        self.state()
            .filter
            .get_or_try_init(|| self.parse_raw_filter())
    }

    fn parse_raw_filter(&self) -> Result<FilterNode, CrudError> {
        let raw = self.state().raw();

        // Opening and closing characters are checked independently.
        let opens = matches!(raw.chars().next(), Some('[' | '{'));
        let closes = matches!(raw.chars().last(), Some(']' | '}'));
        if !opens || !closes {
            return Err(CrudError::InputValidation(
                "Filter definition given is invalid".to_string(),
            ));
        }

        let data: Value = serde_json::from_str(raw).map_err(|e| {
            CrudError::InputValidation(format!("Failed to decode filter definition given: {e}"))
        })?;

        let filter = self.parse(None, &data)?.ok_or_else(|| {
            CrudError::InputValidation("Failed to parse filter definition given".to_string())
        })?;

        debug!(event = "Filter", phase = "Parsed", filter = ?filter);
        Ok(filter)
    }

    /// Parses `filter_data` found under `key`. Yields `None` for blacklisted keys.
    fn parse(&self, key: Option<&str>, filter_data: &Value) -> Result<Option<FilterNode>, CrudError> {
        if let Some(key) = key {
            if self.state().blacklist.contains(key) {
                debug!(event = "Filter", phase = "Blacklisted", key = key);
                return Ok(None);
            }
        }
        self.parse_value(key, filter_data).map(Some)
    }

    /// Dispatches on the value type without consulting the blacklist.
    fn parse_value(&self, key: Option<&str>, filter_data: &Value) -> Result<FilterNode, CrudError> {
        match filter_data {
            Value::Object(map) => self.parse_and_concatenation(map),
            Value::Array(list) => self.parse_or_concatenation(key, list),
            other => Ok(FilterNode::Leaf(other.clone())),
        }
    }

    fn blacklist(&self) -> &Blacklist {
        self.state().blacklist()
    }

    fn add_blacklisted_key(&self, key: &str) {
        self.state().blacklist.add(key);
    }

    fn remove_blacklisted_key(&self, key: &str) {
        self.state().blacklist.remove(key);
    }
}
