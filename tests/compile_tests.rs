//! End-to-end compilation: statements + job config → execution config.


use relflow_core::config::{keys, Config};
use relflow_core::error::{Error, Result};
use relflow_io::{ConfigIoResolver, IoResolver, SqlIoConfig};
use relflow_operators::{OpCode, OperatorSpec};
use relflow_planner::YamlDslConverter;
use relflow_runner::{compute_configs, serialize_statements, RunnerMode, SqlCompiler};
use std::sync::Arc;
use test_plans::{job_config, ENRICH_PAGE_VIEWS, FILTER_ERRORS};

fn with_statement(cfg: Config, stmt: &str) -> Config {
    cfg.with(keys::SQL_STMT, stmt)
}

#[test]
fn test_compute_configs_end_to_end() {
    let cfg = with_statement(job_config(), ENRICH_PAGE_VIEWS);
    let exec = compute_configs(RunnerMode::Local, &cfg).unwrap();
    let out = &exec.config;

    assert_eq!(out.get("streams.PageViews.samza.system"), Some("kafka"));
    assert_eq!(out.get("streams.users.samza.system"), Some("rocksdb"));
    assert_eq!(out.get("streams.EnrichedPageViews.samza.system"), Some("kafka"));
    assert_eq!(out.get("systems.kafka.bootstrap.servers"), Some("localhost:9092"));
    assert_eq!(out.get("streams.PageViews.samza.offset.default"), Some("oldest"));
    assert_eq!(out.get(keys::RUNNER_CLASS), Some("local"));
    assert_eq!(
        out.get(keys::SQL_STMTS_JSON),
        Some(serialize_statements(&[ENRICH_PAGE_VIEWS.to_string()]).unwrap().as_str())
    );

    let codes: Vec<OpCode> = exec.graph.iter().map(|s| s.op_code()).collect();
    assert_eq!(
        codes,
        vec![OpCode::Input, OpCode::Join, OpCode::Map, OpCode::Sink]
    );
    let join = exec.graph.iter().find(|s| s.op_code() == OpCode::Join).unwrap();
    assert_eq!(join.table_id(), Some("profiles.users"));
}

#[test]
fn test_unresolved_stream_yields_no_config() {
    let stmt = "op: modify\ntable: kafka.out\ninput: { op: scan, table: unknown.Clicks }";
    let result = compute_configs(RunnerMode::Local, &with_statement(job_config(), stmt));
    match result {
        Err(Error::UnresolvedStream { name }) => assert_eq!(name, "unknown.Clicks"),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(exec) => panic!("expected failure, got {} keys", exec.config.len()),
    }
}

#[test]
fn test_override_for_stream_system_wins() {
    let cfg = with_statement(job_config(), ENRICH_PAGE_VIEWS)
        .with("streams.PageViews.samza.system", "override");
    let exec = compute_configs(RunnerMode::Remote, &cfg).unwrap();
    assert_eq!(exec.config.get("streams.PageViews.samza.system"), Some("override"));
    assert_eq!(exec.config.get(keys::RUNNER_CLASS), Some("remote"));
}

#[test]
fn test_repeated_resolution_is_value_equal() {
    let resolver = ConfigIoResolver::from_config(&job_config()).unwrap();
    let a = resolver.resolve_input("kafka.PageViews").unwrap();
    let b = resolver.resolve_input("kafka.PageViews").unwrap();
    assert_eq!(a, b);
    assert!(resolver.is_table("profiles.users"));
    assert!(!resolver.is_table("kafka.PageViews"));
}

#[test]
fn test_writing_to_read_only_system_fails() {
    let stmt = "op: modify\ntable: profiles.users\ninput: { op: scan, table: kafka.PageViews }";
    let err = compute_configs(RunnerMode::Local, &with_statement(job_config(), stmt)).unwrap_err();
    assert!(matches!(err, Error::RoleMismatch { ref name, ref role } if name == "profiles.users" && role == "output"));
}

#[test]
fn test_only_first_statement_is_compiled() {
    let stmts = vec![FILTER_ERRORS.to_string(), ENRICH_PAGE_VIEWS.to_string()];
    let cfg = job_config().with(keys::SQL_STMTS_JSON, serialize_statements(&stmts).unwrap());
    let exec = compute_configs(RunnerMode::Local, &cfg).unwrap();
    assert!(exec.roles.inputs().contains("kafka.Requests"));
    assert!(!exec.roles.inputs().contains("kafka.PageViews"));
    assert!(exec.config.get("streams.PageViews.samza.system").is_none());
    let stored: Vec<String> =
        serde_json::from_str(exec.config.get(keys::SQL_STMTS_JSON).unwrap()).unwrap();
    assert_eq!(stored, stmts);
}

#[test]
fn test_fingerprint_is_stable_and_mode_sensitive() {
    let cfg = with_statement(job_config(), FILTER_ERRORS);
    let local_a = compute_configs(RunnerMode::Local, &cfg).unwrap();
    let local_b = compute_configs(RunnerMode::Local, &cfg).unwrap();
    let remote = compute_configs(RunnerMode::Remote, &cfg).unwrap();
    assert_eq!(local_a.fingerprint().unwrap(), local_b.fingerprint().unwrap());
    assert_ne!(local_a.fingerprint().unwrap(), remote.fingerprint().unwrap());
}

/// Resolver that places every name on one in-memory system.
struct SingleSystem;

impl IoResolver for SingleSystem {
    fn resolve_input(&self, name: &str) -> Result<SqlIoConfig> {
        Ok(SqlIoConfig::new(name, "mem", name.replace('.', "_")))
    }

    fn resolve_output(&self, name: &str) -> Result<SqlIoConfig> {
        self.resolve_input(name)
    }

    fn is_table(&self, _name: &str) -> bool {
        false
    }
}

#[test]
fn test_custom_resolver_plugs_in() {
    let compiler = SqlCompiler::new(Arc::new(YamlDslConverter::new()), Arc::new(SingleSystem));
    let exec = compiler
        .compile(&[ENRICH_PAGE_VIEWS.to_string()], &Config::new(), RunnerMode::Local)
        .unwrap();
    assert_eq!(exec.config.get("streams.kafka_PageViews.samza.system"), Some("mem"));
    assert_eq!(exec.config.get("streams.profiles_users.samza.system"), Some("mem"));
    // Not a table for this resolver, so the join is stream-stream.
    assert!(exec
        .graph
        .iter()
        .any(|s| matches!(s, OperatorSpec::StreamStreamJoin { .. })));
    assert_eq!(exec.graph.inputs().count(), 2);
}

#[test]
fn test_missing_statements_is_config_error() {
    let err = compute_configs(RunnerMode::Local, &job_config()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
