//! Resolver backed by system registrations read from job config.
//!
//! Logical names are `<system>.<stream>`: the first segment picks the
//! registration, the rest is the stream/table name inside that system.
//!
//! ```text
//! relflow.sql.io.systems = kafka, profiles
//! relflow.sql.io.system.kafka.roles = input,output
//! relflow.sql.io.system.kafka.config.bootstrap.servers = localhost:9092
//! relflow.sql.io.system.kafka.stream.PageViews.samza.offset.default = oldest
//! relflow.sql.io.system.profiles.kind = table
//! relflow.sql.io.system.profiles.roles = input
//! relflow.sql.io.system.profiles.physical = rocksdb
//! ```

use std::collections::BTreeMap;

use relflow_core::config::{keys, Config};
use relflow_core::error::{Error, Result};
use relflow_core::plan::QualifiedName;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::io_config::SqlIoConfig;
use crate::resolver::{IoResolver, IoRole, IoRoles};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Stream,
    Table,
}

/// One logical system the resolver knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemRegistration {
    /// Name used as the first segment of logical names.
    pub name: String,
    /// Physical system the runtime should bind streams to.
    pub physical: String,
    pub roles: IoRoles,
    pub kind: SourceKind,
    /// System-wide keys, emitted as `systems.<physical>.<key>`.
    pub system_config: BTreeMap<String, String>,
    /// Per-stream keys, emitted as `streams.<stream>.<key>`.
    pub stream_config: BTreeMap<String, BTreeMap<String, String>>,
}

impl SystemRegistration {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            physical: name.clone(),
            name,
            roles: IoRoles::BOTH,
            kind: SourceKind::Stream,
            system_config: BTreeMap::new(),
            stream_config: BTreeMap::new(),
        }
    }

    pub fn physical(mut self, physical: impl Into<String>) -> Self {
        self.physical = physical.into();
        self
    }

    pub fn roles(mut self, roles: IoRoles) -> Self {
        self.roles = roles;
        self
    }

    pub fn table(mut self) -> Self {
        self.kind = SourceKind::Table;
        self
    }

    pub fn system_key(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.system_config.insert(key.into(), value.into());
        self
    }

    pub fn stream_key(
        mut self,
        stream: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.stream_config
            .entry(stream.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Read the registration for `name` from its config subset
    /// (`relflow.sql.io.system.<name>.` already stripped).
    fn from_subset(name: &str, sub: &Config) -> Result<Self> {
        let mut reg = SystemRegistration::new(name);

        if let Some(physical) = sub.get("physical").map(str::trim).filter(|s| !s.is_empty()) {
            reg.physical = physical.to_string();
        }

        if sub.contains_key("roles") {
            let listed = sub.get_list("roles");
            let mut roles = IoRoles {
                input: false,
                output: false,
            };
            for r in &listed {
                match r.as_str() {
                    "input" => roles.input = true,
                    "output" => roles.output = true,
                    other => {
                        return Err(Error::Config(format!(
                            "system '{}': unknown role '{}'",
                            name, other
                        )))
                    }
                }
            }
            if !roles.input && !roles.output {
                return Err(Error::Config(format!("system '{}': no roles listed", name)));
            }
            reg.roles = roles;
        }

        reg.kind = match sub.get("kind").map(str::trim) {
            None | Some("stream") => SourceKind::Stream,
            Some("table") => SourceKind::Table,
            Some(other) => {
                return Err(Error::Config(format!(
                    "system '{}': unknown kind '{}'",
                    name, other
                )))
            }
        };

        reg.system_config = sub.subset("config.").into_map();

        for (rest, value) in sub.subset("stream.").iter() {
            let (stream, key) = rest.split_once('.').ok_or_else(|| {
                Error::Config(format!(
                    "system '{}': stream key 'stream.{}' lacks a property name",
                    name, rest
                ))
            })?;
            reg.stream_config
                .entry(stream.to_string())
                .or_default()
                .insert(key.to_string(), value.to_string());
        }

        Ok(reg)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigIoResolver {
    systems: BTreeMap<String, SystemRegistration>,
}

impl ConfigIoResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system(mut self, reg: SystemRegistration) -> Self {
        self.systems.insert(reg.name.clone(), reg);
        self
    }

    /// Build from the `relflow.sql.io.*` keys of a job config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut resolver = ConfigIoResolver::new();
        for name in config.get_list(keys::IO_SYSTEMS) {
            let prefix = format!("{}{}.", keys::IO_SYSTEM_PREFIX, name);
            let reg = SystemRegistration::from_subset(&name, &config.subset(&prefix))?;
            debug!(system = %reg.name, physical = %reg.physical, kind = ?reg.kind, "registered io system");
            resolver = resolver.with_system(reg);
        }
        Ok(resolver)
    }

    pub fn systems(&self) -> impl Iterator<Item = &SystemRegistration> {
        self.systems.values()
    }

    fn registration(&self, name: &str) -> Option<(&SystemRegistration, String)> {
        let qualified = QualifiedName::parse(name).ok()?;
        let stream = qualified.tail();
        if stream.is_empty() {
            return None;
        }
        self.systems
            .get(qualified.head())
            .map(|reg| (reg, stream))
    }

    fn lookup(&self, name: &str, role: IoRole) -> Result<SqlIoConfig> {
        let (reg, stream) = self
            .registration(name)
            .ok_or_else(|| Error::UnresolvedStream {
                name: name.to_string(),
            })?;

        if !reg.roles.supports(role) {
            return Err(Error::RoleMismatch {
                name: name.to_string(),
                role: role.to_string(),
            });
        }

        let mut io = SqlIoConfig::new(name, reg.physical.clone(), stream.clone());
        io.is_table = reg.kind == SourceKind::Table;
        for (k, v) in &reg.system_config {
            io.config
                .insert(format!("systems.{}.{}", reg.physical, k), v.clone());
        }
        if let Some(props) = reg.stream_config.get(&stream) {
            for (k, v) in props {
                io.config.insert(format!("streams.{}.{}", stream, k), v.clone());
            }
        }

        debug!(%name, %role, system = %io.system_name, stream = %io.stream_name, "resolved");
        Ok(io)
    }
}

impl IoResolver for ConfigIoResolver {
    fn resolve_input(&self, name: &str) -> Result<SqlIoConfig> {
        self.lookup(name, IoRole::Input)
    }

    fn resolve_output(&self, name: &str) -> Result<SqlIoConfig> {
        self.lookup(name, IoRole::Output)
    }

    fn is_table(&self, name: &str) -> bool {
        self.registration(name)
            .map(|(reg, _)| reg.kind == SourceKind::Table)
            .unwrap_or(false)
    }
}
