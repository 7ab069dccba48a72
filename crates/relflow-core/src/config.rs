//! Flat job configuration shared by the compiler and the runtime.
//!
//! A `Config` is an ordered string map. The compiler never edits a caller's
//! config in place: merges produce a new snapshot (`with_overrides`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Well-known configuration keys.
pub mod keys {
    /// Single statement.
    pub const SQL_STMT: &str = "relflow.sql.stmt";
    /// JSON array of statements; also written into compiled snapshots.
    pub const SQL_STMTS_JSON: &str = "relflow.sql.stmts.json";
    /// DSL converter selection (`yaml`).
    pub const DSL_FORMAT: &str = "relflow.sql.dsl.format";
    /// IO resolver factory selection (`config`).
    pub const IO_RESOLVER: &str = "relflow.sql.io.resolver";
    /// Comma list of systems known to the config-based resolver.
    pub const IO_SYSTEMS: &str = "relflow.sql.io.systems";
    /// Prefix for per-system resolver registrations.
    pub const IO_SYSTEM_PREFIX: &str = "relflow.sql.io.system.";
    pub const RUNNER_CLASS: &str = "app.runner.class";

    /// `streams.<stream>.samza.system`: the runtime's stream-to-system binding.
    pub fn stream_system(stream: &str) -> String {
        format!("streams.{}.samza.system", stream)
    }
}

/// Prefix of environment variables folded into a config by `from_env`.
pub const ENV_PREFIX: &str = "RELFLOW_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config {
    entries: BTreeMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Required key; missing or blank values are a `Config` error.
    pub fn require(&self, key: &str) -> Result<&str> {
        match self.get(key).map(str::trim) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(Error::Config(format!("missing required key '{}'", key))),
        }
    }

    /// Comma-separated list value; blank items are dropped.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert while building a fresh config. Returns the replaced value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Entries under `prefix`, with the prefix stripped from each key.
    pub fn subset(&self, prefix: &str) -> Config {
        self.entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k[prefix.len()..].to_string(), v.clone()))
            .filter(|(k, _)| !k.is_empty())
            .collect()
    }

    /// New snapshot holding `self` overlaid by `overrides`; `overrides` wins
    /// on every shared key.
    pub fn with_overrides(&self, overrides: &Config) -> Config {
        let mut merged = self.entries.clone();
        for (k, v) in &overrides.entries {
            merged.insert(k.clone(), v.clone());
        }
        Config { entries: merged }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.entries
    }

    /// Build a config from environment variables, e.g.
    /// `RELFLOW_SQL_IO_RESOLVER=config` becomes `relflow.sql.io.resolver=config`.
    ///
    /// The whole key is lowercased and every `_` becomes `.`, so keys with
    /// mixed-case or underscored segments (such as `streams.PageViews.*`)
    /// cannot be set this way; put them in the config file instead.
    pub fn from_env() -> Self {
        Self::from_env_vars(std::env::vars())
    }

    pub fn from_env_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        vars.into_iter()
            .filter_map(|(k, v)| {
                let rest = k.strip_prefix(ENV_PREFIX)?;
                if rest.is_empty() {
                    return None;
                }
                let key = format!("relflow.{}", rest.to_ascii_lowercase().replace('_', "."));
                Some((key, v))
            })
            .collect()
    }

    /// Parse `key = value` lines. `#` and `!` start comments.
    pub fn from_properties_str(src: &str) -> Result<Self> {
        let mut cfg = Config::new();
        for (lineno, raw) in src.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let (k, v) = line
                .split_once('=')
                .or_else(|| line.split_once(':'))
                .ok_or_else(|| {
                    Error::Config(format!("line {}: expected 'key = value'", lineno + 1))
                })?;
            let k = k.trim();
            if k.is_empty() {
                return Err(Error::Config(format!("line {}: empty key", lineno + 1)));
            }
            cfg.insert(k, v.trim());
        }
        Ok(cfg)
    }

    /// Parse a YAML document. Nested mappings are flattened with `.`;
    /// sequences of scalars become comma lists.
    pub fn from_yaml_str(src: &str) -> Result<Self> {
        let doc: serde_yaml::Value =
            serde_yaml::from_str(src).map_err(|e| Error::Config(format!("yaml: {}", e)))?;
        let mut cfg = Config::new();
        match doc {
            serde_yaml::Value::Null => {}
            serde_yaml::Value::Mapping(_) => flatten_yaml("", &doc, &mut cfg)?,
            other => {
                return Err(Error::Config(format!(
                    "yaml config must be a mapping, got {:?}",
                    other
                )))
            }
        }
        Ok(cfg)
    }
}

fn flatten_yaml(prefix: &str, value: &serde_yaml::Value, out: &mut Config) -> Result<()> {
    use serde_yaml::Value;
    match value {
        Value::Mapping(map) => {
            for (k, v) in map {
                let k = yaml_scalar(k)
                    .ok_or_else(|| Error::Config(format!("non-scalar key under '{}'", prefix)))?;
                let key = if prefix.is_empty() {
                    k
                } else {
                    format!("{}.{}", prefix, k)
                };
                flatten_yaml(&key, v, out)?;
            }
        }
        Value::Sequence(items) => {
            let parts = items
                .iter()
                .map(|v| {
                    yaml_scalar(v).ok_or_else(|| {
                        Error::Config(format!("'{}': lists may only hold scalars", prefix))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            out.insert(prefix, parts.join(","));
        }
        Value::Tagged(tagged) => flatten_yaml(prefix, &tagged.value, out)?,
        scalar => {
            let v = yaml_scalar(scalar).unwrap_or_default();
            out.insert(prefix, v);
        }
    }
    Ok(())
}

fn yaml_scalar(v: &serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value;
    match v {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

impl FromIterator<(String, String)> for Config {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Config {
            entries: iter.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<String, String>> for Config {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Config { entries }
    }
}
