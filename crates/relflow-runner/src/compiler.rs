//! Compiler driver.
//!
//! statements → roots (DSL converter) → stream roles (classifier) →
//! physical configs (resolver) → operator graph (lowering) → one flat
//! config snapshot. Any failure aborts the whole compilation; callers never
//! see a partially merged config.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use relflow_core::config::{keys, Config};
use relflow_core::error::{Error, Result};
use relflow_core::hash::Fingerprint;
use relflow_core::plan::RelRoot;
use relflow_io::{create_io_resolver, IoResolver, IoRole};
use relflow_operators::OperatorGraph;
use relflow_planner::{classify, create_dsl_converter, lower_to_graph, DslConverter};
use relflow_planner::{ResolvedStreams, StreamRoles};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::fingerprint::fingerprint;

/// Which runner the runtime should start the job with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerMode {
    Local,
    Remote,
}

impl RunnerMode {
    /// Value written under `app.runner.class`.
    pub fn runner_class(&self) -> &'static str {
        match self {
            RunnerMode::Local => "local",
            RunnerMode::Remote => "remote",
        }
    }
}

impl fmt::Display for RunnerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.runner_class())
    }
}

impl FromStr for RunnerMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(RunnerMode::Local),
            "remote" => Ok(RunnerMode::Remote),
            other => Err(Error::Config(format!("unknown runner mode '{}'", other))),
        }
    }
}

/// Result of a successful compilation.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Flat snapshot handed to the runtime.
    pub config: Config,
    pub graph: OperatorGraph,
    pub roles: StreamRoles,
}

impl ExecutionConfig {
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        fingerprint(&self.config, &self.graph)
    }
}

/// Statements stored in `config`: the single statement under
/// `relflow.sql.stmt` if present, else the JSON array under
/// `relflow.sql.stmts.json`.
pub fn fetch_statements(config: &Config) -> Result<Vec<String>> {
    let stmts = if let Some(stmt) = config.get(keys::SQL_STMT) {
        vec![stmt.to_string()]
    } else if let Some(json) = config.get(keys::SQL_STMTS_JSON) {
        serde_json::from_str::<Vec<String>>(json).map_err(|e| {
            Error::Config(format!("{} is not a JSON string array: {}", keys::SQL_STMTS_JSON, e))
        })?
    } else {
        return Err(Error::Config(format!(
            "no statements: set {} or {}",
            keys::SQL_STMT,
            keys::SQL_STMTS_JSON
        )));
    };
    if stmts.iter().all(|s| s.trim().is_empty()) {
        return Err(Error::Config("statement list is empty".into()));
    }
    Ok(stmts)
}

pub fn serialize_statements(statements: &[String]) -> Result<String> {
    Ok(serde_json::to_string(statements)?)
}

pub struct SqlCompiler {
    converter: Arc<dyn DslConverter>,
    resolver: Arc<dyn IoResolver>,
}

impl SqlCompiler {
    pub fn new(converter: Arc<dyn DslConverter>, resolver: Arc<dyn IoResolver>) -> Self {
        Self {
            converter,
            resolver,
        }
    }

    /// Converter and resolver picked by the job config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let converter: Arc<dyn DslConverter> = Arc::from(create_dsl_converter(config)?);
        let resolver = create_io_resolver(config)?;
        Ok(Self::new(converter, resolver))
    }

    /// Convert `statements` and return the root that gets compiled.
    pub fn plan(&self, statements: &[String]) -> Result<RelRoot> {
        let text = self.converter.join_statements(statements);
        let mut roots = self.converter.convert_dsl(&text)?.into_iter();
        let first = roots
            .next()
            .ok_or_else(|| Error::Dsl("converter returned no plan roots".into()))?;
        let ignored = roots.count();
        if ignored > 0 {
            warn!(ignored, "only the first plan root is compiled");
        }
        Ok(first)
    }

    /// Resolve every classified name for the role it was classified in.
    pub fn resolve(&self, roles: &StreamRoles) -> Result<ResolvedStreams> {
        let mut resolved = ResolvedStreams::new();
        for name in roles.inputs() {
            let cfg = self.resolver.resolve_input(name)?;
            debug!(%name, system = %cfg.system_name, table = cfg.is_table, "resolved input");
            resolved.insert(IoRole::Input, name, cfg);
        }
        for name in roles.outputs() {
            let cfg = self.resolver.resolve_output(name)?;
            debug!(%name, system = %cfg.system_name, "resolved output");
            resolved.insert(IoRole::Output, name, cfg);
        }
        Ok(resolved)
    }

    /// Compile `statements` into a runnable job description. `overrides`
    /// is laid over the synthesized keys and wins on every shared key.
    pub fn compile(
        &self,
        statements: &[String],
        overrides: &Config,
        mode: RunnerMode,
    ) -> Result<ExecutionConfig> {
        let root = self.plan(statements)?;
        let roles = classify(root.project())?;
        debug!(depth = root.project().depth(), "planned statement");
        for name in roles.read_and_written() {
            debug!(%name, "stream is both read and written");
        }
        let resolved = self.resolve(&roles)?;

        let mut synthesized = merge_resolved(&resolved)?;
        synthesized.insert(keys::SQL_STMTS_JSON, serialize_statements(statements)?);
        synthesized.insert(keys::RUNNER_CLASS, mode.runner_class());
        let config = synthesized.with_overrides(overrides);

        let graph = lower_to_graph(root.project(), &resolved)?;
        graph.validate_tables(roles.inputs(), |t| self.resolver.is_table(t))?;

        Ok(ExecutionConfig {
            config,
            graph,
            roles,
        })
    }
}

/// System bindings plus each resolved config's keys. A stream bound to two
/// different systems is a conflict.
fn merge_resolved(resolved: &ResolvedStreams) -> Result<Config> {
    let mut merged = Config::new();
    for cfg in resolved.all() {
        let (key, system) = cfg.system_binding();
        if let Some(existing) = merged.get(&key) {
            if existing != system {
                return Err(Error::ConfigurationConflict {
                    name: cfg.stream_name.clone(),
                    existing: existing.to_string(),
                    conflicting: system,
                });
            }
        }
        merged.insert(key, system);
        for (k, v) in &cfg.config {
            merged.insert(k.clone(), v.clone());
        }
    }
    Ok(merged)
}

/// Read the statements out of `config`, compile them with the configured
/// converter and resolver, and log the resulting snapshot.
pub fn compute_configs(mode: RunnerMode, config: &Config) -> Result<ExecutionConfig> {
    let statements = fetch_statements(config)?;
    let compiler = SqlCompiler::from_config(config)?;
    let exec = compiler.compile(&statements, config, mode)?;
    info!(
        mode = %mode,
        keys = exec.config.len(),
        operators = exec.graph.len(),
        inputs = exec.roles.inputs().len(),
        outputs = exec.roles.outputs().len(),
        "computed job config"
    );
    for (k, v) in exec.config.iter() {
        debug!(key = %k, value = %v, "job config");
    }
    Ok(exec)
}
