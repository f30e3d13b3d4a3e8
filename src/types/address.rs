//! CRUD URLs and the entity paths they carry.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::error::CrudError;

use super::entity_id::EntityId;

/// Scheme assumed for addresses given without one.
pub const DEFAULT_SCHEME: &str = "x-in-process";

static NON_WORD_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").unwrap());

/// Replaces every run of non-word characters with a single `_`.
pub fn replace_non_word_chars(s: &str) -> String {
    NON_WORD_CHARS.replace_all(s, "_").into_owned()
}

/// Removes control characters.
pub fn filter_control_chars(s: &str) -> String {
    s.chars().filter(|c| !c.is_control()).collect()
}

/// A parsed CRUD URL, `scheme://[authority]/path`.
///
/// Bare paths (`/shop/widgets`, `shop/widgets`) get the [`DEFAULT_SCHEME`].
/// The scheme and authority are validated as a URL, but the path is taken
/// verbatim from the raw input, cut at `?` or `#`: dot segments stay and
/// nothing is percent encoded or decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrudUrl {
    raw: String,
    url: Url,
    path: String,
}

/// The path part of `raw`, as written.
fn raw_path(raw: &str) -> &str {
    let rest = match raw.split_once("://") {
        Some((_, rest)) => match rest.find(['/', '?', '#']) {
            Some(start) => &rest[start..],
            None => "",
        },
        None => raw,
    };
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    &rest[..end]
}

impl CrudUrl {
    pub fn parse(raw: &str) -> Result<Self, CrudError> {
        let normalized = if raw.contains("://") {
            raw.to_string()
        } else if raw.starts_with('/') {
            format!("{DEFAULT_SCHEME}://{raw}")
        } else {
            format!("{DEFAULT_SCHEME}:///{raw}")
        };

        let url = Url::parse(&normalized).map_err(|e| {
            CrudError::InputValidation(format!("CRUD URL '{raw}' is invalid: {e}"))
        })?;

        let path = raw_path(raw);
        let path = if path.is_empty() || path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        Ok(CrudUrl {
            raw: raw.to_string(),
            url,
            path,
        })
    }

    /// The address as given by the caller.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// The scheme with `-` replaced by `_`, used to look up protocols.
    pub fn protocol_name(&self) -> String {
        self.url.scheme().replace('-', "_")
    }

    /// The path exactly as written in the raw address.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl FromStr for CrudUrl {
    type Err = CrudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CrudUrl::parse(s)
    }
}

impl Display for CrudUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.raw)
    }
}

/// An entity path: the entity id from the first two segments and the
/// selector tokens following them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressPath {
    entity: EntityId,
    selectors: Vec<String>,
}

impl AddressPath {
    pub fn parse(path: &str) -> Result<Self, CrudError> {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        let mut segments = trimmed.split('/');

        let (Some(module), Some(instance)) = (segments.next(), segments.next()) else {
            return Err(CrudError::OperationNotSupported(format!(
                "CRUD URL path '{path}' does not identify an entity (expected format: /module/instance[/selector...])"
            )));
        };

        Ok(AddressPath {
            entity: EntityId::from_path_segments(module, instance),
            selectors: segments.map(filter_control_chars).collect(),
        })
    }

    pub fn entity(&self) -> &EntityId {
        &self.entity
    }

    pub fn selectors(&self) -> &[String] {
        &self.selectors
    }
}
