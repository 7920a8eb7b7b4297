//! Configuration management for athq.
//!
//! The config file is a JSON document holding named query templates, default
//! parameters and environment-specific values. It is loaded as a raw
//! [`TemplateNode`] tree, resolved against the parameter store, and only then
//! deserialized into [`Config`], so placeholders work anywhere in the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::error::{AthqError, Result};
use crate::params::ParameterStore;
use crate::template::TemplateNode;

/// File name looked up in the working and config directories.
pub const CONFIG_FILE_NAME: &str = "athena.json";

/// Query used when none is named.
pub const DEFAULT_QUERY_NAME: &str = "default";

/// Row colors used when the config has no `colors` entry.
pub const DEFAULT_COLORS: [&str; 3] = ["cyan", "magenta", "yellow"];

/// A `{name, value}` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,
    pub value: String,
}

/// A named SQL template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDefinition {
    pub name: String,

    /// SQL text with `{param}` and `{clause group}` placeholders.
    #[serde(rename = "value")]
    pub template: String,

    /// Clause fragments applied before any given on the command line.
    #[serde(default)]
    pub clauses: Vec<NamedValue>,
}

/// A `{name, value}` pair whose value may be any JSON value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigValue {
    pub name: String,
    pub value: JsonValue,
}

/// One entry of the `config` section.
///
/// Entries of no known shape are kept as [`ConfigEntry::Other`] and ignored
/// by lookups, so one odd entry never blocks loading the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigEntry {
    /// Values for a profile, optionally narrowed to one region.
    Override {
        profile: String,
        #[serde(default)]
        region: Option<String>,
        #[serde(default)]
        values: Vec<JsonMap<String, JsonValue>>,
    },
    /// A value that applies everywhere.
    Named(ConfigValue),
    /// Row colors for table output.
    Colors { colors: Vec<String> },
    Other(JsonValue),
}

/// Resolved configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub queries: Vec<QueryDefinition>,

    #[serde(default)]
    pub parameters: Vec<ConfigValue>,

    #[serde(default)]
    pub config: Vec<ConfigEntry>,
}

impl Config {
    /// Finds a query by name, falling back to `default`.
    pub fn lookup_query(&self, name: Option<&str>) -> Option<&QueryDefinition> {
        let name = name.unwrap_or(DEFAULT_QUERY_NAME);
        let found = self.queries.iter().find(|q| q.name == name);
        match found {
            Some(query) => info!("Using query {}: {}", name, query.template),
            None => info!("Query not found [{}]", name),
        }
        found
    }

    /// Returns every query name in file order.
    pub fn query_names(&self) -> Vec<&str> {
        self.queries.iter().map(|q| q.name.as_str()).collect()
    }

    /// Returns the configured row colors or the defaults.
    pub fn colors(&self) -> Vec<String> {
        self.config
            .iter()
            .find_map(|entry| match entry {
                ConfigEntry::Colors { colors } if !colors.is_empty() => Some(colors.clone()),
                _ => None,
            })
            .unwrap_or_else(|| {
                debug!("No colors found, using defaults");
                DEFAULT_COLORS.iter().map(|c| c.to_string()).collect()
            })
    }

    /// Looks up a config value for a profile and region.
    ///
    /// Checks an override block matching both profile and region first, then
    /// a profile block without a region, then a flat `{name, value}` entry.
    /// Numbers and booleans are returned in their JSON spelling; arrays,
    /// objects and nulls are not usable as values and are skipped.
    pub fn get_config_value(&self, name: &str, profile: &str, region: &str) -> Option<String> {
        let exact = self.override_value(name, |p, r| p == profile && r == Some(region));
        if exact.is_some() {
            debug!("{} from [{}] [{}] override", name, profile, region);
            return exact;
        }

        let profile_only = self.override_value(name, |p, r| p == profile && r.is_none());
        if profile_only.is_some() {
            debug!("{} from [{}] override", name, profile);
            return profile_only;
        }

        self.config.iter().find_map(|entry| match entry {
            ConfigEntry::Named(named) if named.name == name => scalar_text(&named.value),
            _ => None,
        })
    }

    fn override_value(
        &self,
        name: &str,
        matches: impl Fn(&str, Option<&str>) -> bool,
    ) -> Option<String> {
        self.config.iter().find_map(|entry| match entry {
            ConfigEntry::Override {
                profile,
                region,
                values,
            } if matches(profile, region.as_deref()) => values
                .iter()
                .find_map(|map| map.get(name).and_then(scalar_text)),
            _ => None,
        })
    }

    /// Returns entries of the `config` section that match no known shape.
    pub fn unrecognized_entries(&self) -> impl Iterator<Item = &JsonValue> {
        self.config.iter().filter_map(|entry| match entry {
            ConfigEntry::Other(value) => Some(value),
            _ => None,
        })
    }
}

/// Renders a scalar JSON value as text.
pub fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

/// The config document before parameter substitution.
#[derive(Debug, Clone)]
pub struct RawConfig {
    tree: TemplateNode,
    path: Option<PathBuf>,
}

impl RawConfig {
    /// Loads a config file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading config file [{}]", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AthqError::ConfigFileNotFound(path.to_path_buf())
            } else {
                AthqError::config(format!("Failed to read {}: {}", path.display(), e))
            }
        })?;

        let mut raw = Self::from_json_str(&content).map_err(|e| match e {
            AthqError::Config(msg) => AthqError::config(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;
        raw.path = Some(path.to_path_buf());
        Ok(raw)
    }

    /// Parses a config document from a JSON string.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: JsonValue = serde_json::from_str(content)
            .map_err(|e| AthqError::config(format!("Invalid JSON: {}", e)))?;
        if !value.is_object() {
            return Err(AthqError::config("Config root must be a JSON object"));
        }
        Ok(Self {
            tree: value.into(),
            path: None,
        })
    }

    /// Returns the file this config came from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the unresolved document.
    pub fn tree(&self) -> &TemplateNode {
        &self.tree
    }

    /// Returns the `parameters` section as key/value pairs.
    ///
    /// Values are taken as written; they are defaults that later parameter
    /// sources override. Scalar values are accepted in their JSON spelling.
    pub fn default_parameters(&self) -> Result<Vec<(String, String)>> {
        let Some(section) = self.tree.get("parameters") else {
            return Ok(Vec::new());
        };
        let parameters: Vec<ConfigValue> = serde_json::from_value(section.clone().into())
            .map_err(|e| AthqError::config(format!("Invalid parameters section: {}", e)))?;
        if !parameters.is_empty() {
            info!("Found {} parameters in config file", parameters.len());
        }

        let mut pairs = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            match scalar_text(&parameter.value) {
                Some(value) => pairs.push((parameter.name, value)),
                None => warn!(
                    "Ignoring parameter {}: value must be a string, number or boolean",
                    parameter.name
                ),
            }
        }
        Ok(pairs)
    }

    /// Substitutes `params` throughout the document and deserializes it.
    pub fn resolve(&self, params: &ParameterStore) -> Result<Config> {
        let resolved: JsonValue = self.tree.resolve(params).into();
        let config: Config = serde_json::from_value(resolved)
            .map_err(|e| AthqError::config(format!("Invalid config: {}", e)))?;
        for entry in config.unrecognized_entries() {
            warn!("Ignoring unrecognized config entry: {}", entry);
        }
        Ok(config)
    }
}

/// Picks the config file to load.
///
/// An explicit path wins; otherwise `./athena.json` when present, else the
/// file in the platform config directory.
pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return local;
    }
    default_path()
}

/// Returns the config file location in the platform config directory.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("athq")
        .join(CONFIG_FILE_NAME)
}
