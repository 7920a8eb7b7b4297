//! Template tree and placeholder resolution.
//!
//! The config document is held as a [`TemplateNode`] tree so that `{key}`
//! placeholders can be substituted anywhere in it (query text, override
//! blocks, output locations) before it is deserialized into typed config.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Number, Value as JsonValue};

use crate::params::ParameterStore;

/// Matches the shortest `{...}` span, capturing the identifier inside.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(.*?)\}").expect("placeholder pattern is valid"));

/// A node of a template document.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    /// JSON null.
    Null,
    /// Boolean leaf.
    Bool(bool),
    /// Numeric leaf.
    Number(Number),
    /// Text that may contain `{key}` placeholders.
    String(String),
    /// Ordered list of nodes.
    Sequence(Vec<TemplateNode>),
    /// Key/value structure, in document order.
    Mapping(Vec<(String, TemplateNode)>),
}

impl TemplateNode {
    /// Returns a copy of this tree with every known placeholder substituted.
    ///
    /// Placeholders whose identifier is not in `params` are left untouched,
    /// braces included. Scalar leaves are returned as-is.
    pub fn resolve(&self, params: &ParameterStore) -> TemplateNode {
        match self {
            Self::String(s) => Self::String(resolve_str(s, params)),
            Self::Sequence(items) => {
                Self::Sequence(items.iter().map(|item| item.resolve(params)).collect())
            }
            Self::Mapping(entries) => Self::Mapping(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.resolve(params)))
                    .collect(),
            ),
            leaf => leaf.clone(),
        }
    }

    /// Returns the string contents if this is a string node.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Looks up a key in a mapping node.
    pub fn get(&self, key: &str) -> Option<&TemplateNode> {
        match self {
            Self::Mapping(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// Substitutes known `{key}` placeholders in a single string.
pub fn resolve_str(text: &str, params: &ParameterStore) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| match params.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

impl From<JsonValue> for TemplateNode {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => Self::Number(n),
            JsonValue::String(s) => Self::String(s),
            JsonValue::Array(items) => Self::Sequence(items.into_iter().map(Self::from).collect()),
            JsonValue::Object(map) => Self::Mapping(
                map.into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<TemplateNode> for JsonValue {
    fn from(node: TemplateNode) -> Self {
        match node {
            TemplateNode::Null => JsonValue::Null,
            TemplateNode::Bool(b) => JsonValue::Bool(b),
            TemplateNode::Number(n) => JsonValue::Number(n),
            TemplateNode::String(s) => JsonValue::String(s),
            TemplateNode::Sequence(items) => {
                JsonValue::Array(items.into_iter().map(JsonValue::from).collect())
            }
            TemplateNode::Mapping(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key, JsonValue::from(value));
                }
                JsonValue::Object(map)
            }
        }
    }
}

impl From<&str> for TemplateNode {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for TemplateNode {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}
