//! Parameter store for template substitution.
//!
//! Parameters arrive from several sources (config file defaults, the session
//! identity, `-p` flags) and are layered with last-write-wins semantics.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{AthqError, Result};

/// String key/value parameters used to fill `{key}` placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterStore {
    values: BTreeMap<String, String>,
}

impl ParameterStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds parameters from a comma-separated `key=value,key=value` string.
    ///
    /// The whole string is validated before anything is stored.
    pub fn add_from_delimited(&mut self, input: &str) -> Result<()> {
        let pairs = input
            .split(',')
            .map(split_pair)
            .collect::<Result<Vec<_>>>()?;

        for (key, value) in pairs {
            self.insert(key, value);
        }
        Ok(())
    }

    /// Adds every entry of a mapping.
    pub fn add_from_mapping<I, K, V>(&mut self, mapping: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in mapping {
            self.insert(key, value);
        }
    }

    /// Adds parameters from a list of `key=value` strings.
    pub fn add_from_list<S: AsRef<str>>(&mut self, pairs: &[S]) -> Result<()> {
        let parsed = pairs
            .iter()
            .map(|pair| split_pair(pair.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        for (key, value) in parsed {
            self.insert(key, value);
        }
        Ok(())
    }

    /// Inserts or overwrites a single parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        debug!("param {} = {}", key, value);
        self.values.insert(key, value);
    }

    /// Returns the value for `key`, if set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Splits `key=value` on the first `=`.
fn split_pair(token: &str) -> Result<(String, String)> {
    let (key, value) = token
        .split_once('=')
        .ok_or_else(|| AthqError::malformed(format!("'{token}' is not of the form key=value")))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(AthqError::malformed(format!("'{token}' has an empty key")));
    }

    Ok((key.to_string(), value.to_string()))
}
