use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::{Blacklist, FilterNode, FilterParser, FilterState};
use crate::error::CrudError;

fn concatenate_and<P: FilterParser + ?Sized>(
    parser: &P,
    filter_data: &Map<String, Value>,
) -> Result<FilterNode, CrudError> {
    let mut conditions = BTreeMap::new();
    for (key, value) in filter_data {
        conditions.insert(key.clone(), parser.parse(Some(key), value)?);
    }
    Ok(FilterNode::And(conditions))
}

/// Parses flat, AND-concatenated filter objects. Arrays are rejected.
#[derive(Debug)]
pub struct FlatFilterParser {
    state: FilterState,
}

impl FlatFilterParser {
    pub fn new(document: &str) -> Result<Self, CrudError> {
        Self::from_state(FilterState::new(document))
    }

    pub fn from_bytes(document: &[u8]) -> Result<Self, CrudError> {
        Self::from_state(FilterState::from_bytes(document)?)
    }

    pub fn with_blacklist(document: &str, blacklist: Blacklist) -> Result<Self, CrudError> {
        Self::from_state(FilterState::new(document).with_blacklist(blacklist))
    }

    fn from_state(state: FilterState) -> Result<Self, CrudError> {
        let parser = Self { state };
        parser.prepare()?;
        Ok(parser)
    }
}

impl FilterParser for FlatFilterParser {
    fn state(&self) -> &FilterState {
        &self.state
    }

    fn parse_and_concatenation(
        &self,
        filter_data: &Map<String, Value>,
    ) -> Result<FilterNode, CrudError> {
        concatenate_and(self, filter_data)
    }

    fn empty_filter(&self) -> Result<FilterNode, CrudError> {
        Ok(FilterNode::empty())
    }
}

/// Parses AND-concatenated objects and OR-concatenated arrays.
#[derive(Debug)]
pub struct TreeFilterParser {
    state: FilterState,
}

impl TreeFilterParser {
    pub fn new(document: &str) -> Result<Self, CrudError> {
        Self::from_state(FilterState::new(document))
    }

    pub fn from_bytes(document: &[u8]) -> Result<Self, CrudError> {
        Self::from_state(FilterState::from_bytes(document)?)
    }

    pub fn with_blacklist(document: &str, blacklist: Blacklist) -> Result<Self, CrudError> {
        Self::from_state(FilterState::new(document).with_blacklist(blacklist))
    }

    fn from_state(state: FilterState) -> Result<Self, CrudError> {
        let parser = Self { state };
        parser.prepare()?;
        Ok(parser)
    }
}

impl FilterParser for TreeFilterParser {
    fn state(&self) -> &FilterState {
        &self.state
    }

    fn parse_and_concatenation(
        &self,
        filter_data: &Map<String, Value>,
    ) -> Result<FilterNode, CrudError> {
        concatenate_and(self, filter_data)
    }

    fn parse_or_concatenation(
        &self,
        key: Option<&str>,
        filter_list: &[Value],
    ) -> Result<FilterNode, CrudError> {
        // The key itself already passed the blacklist.
        let nodes = filter_list
            .iter()
            .map(|value| self.parse_value(key, value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FilterNode::Or {
            key: key.map(str::to_string),
            nodes,
        })
    }

    fn empty_filter(&self) -> Result<FilterNode, CrudError> {
        Ok(FilterNode::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_json_snapshot;
    use serde_json::json;
    use yare::parameterized;

    #[parameterized(
        empty_object = { "{}" },
        whitespace = { "   \n\t " },
        nothing = { "" },
        padded_object = { "  { }  " },
    )]
    fn test_empty_documents(document: &str) {
        let parser = FlatFilterParser::new(document).unwrap();
        assert_eq!(parser.filter().unwrap(), &FilterNode::empty());
    }

    #[test]
    fn test_flat_and_concatenation() {
        let parser = FlatFilterParser::new(r#"{"a": 1, "b": "x", "c": {"d": null}}"#).unwrap();
        assert_json_snapshot!(parser.filter().unwrap(), @r#"
        {
          "and": {
            "a": {
              "leaf": 1
            },
            "b": {
              "leaf": "x"
            },
            "c": {
              "and": {
                "d": {
                  "leaf": null
                }
              }
            }
          }
        }
        "#);
    }

    #[test]
    fn test_flat_parser_rejects_arrays() {
        let parser = FlatFilterParser::new(r#"{"a": 1, "b": [1, 2, 3]}"#).unwrap();
        assert!(matches!(
            parser.filter(),
            Err(CrudError::OperationNotSupported(_))
        ));
    }

    #[test]
    fn test_tree_parser_or_concatenation() {
        let parser = TreeFilterParser::new(r#"{"a": 1, "b": [1, 2, 3]}"#).unwrap();

        let mut expected = BTreeMap::new();
        expected.insert("a".to_string(), Some(FilterNode::Leaf(json!(1))));
        expected.insert(
            "b".to_string(),
            Some(FilterNode::Or {
                key: Some("b".to_string()),
                nodes: vec![
                    FilterNode::Leaf(json!(1)),
                    FilterNode::Leaf(json!(2)),
                    FilterNode::Leaf(json!(3)),
                ],
            }),
        );
        assert_eq!(parser.filter().unwrap(), &FilterNode::And(expected));
    }

    #[test]
    fn test_blacklisted_key_is_kept_without_value() {
        let parser = TreeFilterParser::new(r#"{"a": 1, "b": [1, 2, 3]}"#).unwrap();
        parser.add_blacklisted_key("a");

        let FilterNode::And(conditions) = parser.filter().unwrap() else {
            panic!("expected an AND node");
        };
        assert!(conditions.contains_key("a"));
        assert_eq!(conditions["a"], None);
        assert!(matches!(conditions["b"], Some(FilterNode::Or { .. })));
    }

    #[test]
    fn test_nested_blacklisted_key() {
        let blacklist = Blacklist::from_keys(["password"]);
        let parser = FlatFilterParser::with_blacklist(
            r#"{"user": {"name": "bob", "password": "hunter2"}}"#,
            blacklist,
        )
        .unwrap();
        assert_json_snapshot!(parser.filter().unwrap(), @r#"
        {
          "and": {
            "user": {
              "and": {
                "name": {
                  "leaf": "bob"
                },
                "password": null
              }
            }
          }
        }
        "#);
    }

    #[test]
    fn test_top_level_array() {
        let parser = TreeFilterParser::new(r#"[{"a": 1}, {"a": 2}]"#).unwrap();
        let FilterNode::Or { key, nodes } = parser.filter().unwrap() else {
            panic!("expected an OR node");
        };
        assert_eq!(key, &None);
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_result_is_cached() {
        let parser = TreeFilterParser::new(r#"{"a": 1}"#).unwrap();
        let first = parser.filter().unwrap().clone();
        parser.add_blacklisted_key("a");
        assert_eq!(parser.filter().unwrap(), &first);
    }

    #[parameterized(
        plain_text = { "hello" },
        number = { "42" },
        quoted = { "\"{}\"" },
        open_only = { "{\"a\": 1" },
        close_only = { "\"a\": 1}" },
    )]
    fn test_shape_check_rejects(document: &str) {
        let err = TreeFilterParser::new(document).unwrap().filter().unwrap_err();
        assert_eq!(
            err,
            CrudError::InputValidation("Filter definition given is invalid".to_string())
        );
    }

    #[test]
    fn test_mismatched_brackets_reach_the_decoder() {
        let err = TreeFilterParser::new(r#"{"a": 1]"#)
            .unwrap()
            .filter()
            .unwrap_err();
        let CrudError::InputValidation(message) = err else {
            panic!("expected an input validation error");
        };
        assert!(message.starts_with("Failed to decode filter definition given"));
    }

    #[test]
    fn test_from_bytes() {
        let parser = FlatFilterParser::from_bytes(br#"{"a": true}"#).unwrap();
        assert!(matches!(parser.filter().unwrap(), FilterNode::And(_)));
    }

    #[test]
    fn test_shared_blacklist_across_parsers() {
        let blacklist = Blacklist::new();
        let first = TreeFilterParser::with_blacklist(r#"{"a": 1}"#, blacklist.clone()).unwrap();
        let second = TreeFilterParser::with_blacklist(r#"{"a": 2}"#, blacklist.clone()).unwrap();

        first.add_blacklisted_key("a");
        assert!(second.blacklist().contains("a"));

        let FilterNode::And(conditions) = second.filter().unwrap() else {
            panic!("expected an AND node");
        };
        assert_eq!(conditions["a"], None);
    }
}
