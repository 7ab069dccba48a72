//! relflow CLI: compile plan statements into a runnable job config.

use clap::{Parser, Subcommand};
use relflow_core::config::{keys, Config};
use relflow_core::VERSION;
use relflow_planner::{classify, create_dsl_converter};
use relflow_runner::{compute_configs, serialize_statements, RunnerMode};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "relflow")]
#[command(about = "relflow: relational plan to dataflow job compiler", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a job and print the resulting config and operator graph
    Compile {
        /// Job config file (.yaml/.yml or .properties)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Plan statement files; replace any statements in the config
        #[arg(short, long)]
        plan: Vec<PathBuf>,

        /// Runner the job is compiled for (local or remote)
        #[arg(long, default_value = "local")]
        mode: String,

        /// Extra config entries, key=value; win over everything else
        #[arg(long = "set", value_name = "KEY=VALUE")]
        overrides: Vec<String>,

        /// Print only the flat config as properties
        #[arg(long)]
        properties: bool,
    },

    /// Show the input and output streams of a plan
    Classify {
        /// Plan statement file
        #[arg(short, long)]
        plan: PathBuf,
    },

    /// Compile a job and report whether it is valid
    Validate {
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long)]
        plan: Vec<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Compile {
            config,
            plan,
            mode,
            overrides,
            properties,
        } => {
            if let Err(e) = compile_job(config.as_deref(), &plan, &mode, &overrides, properties) {
                report("Error", e.as_ref());
                std::process::exit(1);
            }
        }
        Commands::Classify { plan } => {
            if let Err(e) = classify_plan(&plan) {
                report("Error", e.as_ref());
                std::process::exit(1);
            }
        }
        Commands::Validate { config, plan } => match validate_job(config.as_deref(), &plan) {
            Ok(operators) => println!("✓ Job is valid ({} operators)", operators),
            Err(e) => {
                report("Validation failed", e.as_ref());
                std::process::exit(1);
            }
        },
    }
}

fn report(prefix: &str, e: &(dyn std::error::Error + 'static)) {
    eprintln!("{}: {}", prefix, e);
    if let Some(stream) = offending_stream(e) {
        eprintln!("  stream: {}", stream);
    }
}

fn offending_stream<'a>(e: &'a (dyn std::error::Error + 'static)) -> Option<&'a str> {
    e.downcast_ref::<relflow_core::error::Error>()?.stream_name()
}

fn compile_job(
    config_path: Option<&Path>,
    plans: &[PathBuf],
    mode: &str,
    overrides: &[String],
    properties: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mode: RunnerMode = mode.parse()?;
    let mut config = load_job_config(config_path, plans)?;
    for entry in overrides {
        let (k, v) = parse_override(entry)?;
        config.insert(k, v);
    }

    let exec = compute_configs(mode, &config)?;

    if properties {
        for (k, v) in exec.config.iter() {
            println!("{}={}", k, v);
        }
        return Ok(());
    }

    let out = json!({
        "compiler_version": VERSION,
        "fingerprint": exec.fingerprint()?.to_hex(),
        "inputs": exec.roles.inputs(),
        "outputs": exec.roles.outputs(),
        "operators": exec.graph.describe(),
        "config": exec.config,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn classify_plan(plan: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let text = fs::read_to_string(plan)?;
    let converter = create_dsl_converter(&Config::new())?;
    let roots = converter.convert_dsl(&text)?;
    for (idx, root) in roots.iter().enumerate() {
        let roles = classify(root.project())?;
        println!(
            "{}",
            serde_json::to_string(&json!({
                "statement": idx,
                "inputs": roles.inputs(),
                "outputs": roles.outputs(),
            }))?
        );
    }
    Ok(())
}

fn validate_job(
    config_path: Option<&Path>,
    plans: &[PathBuf],
) -> Result<usize, Box<dyn std::error::Error>> {
    let config = load_job_config(config_path, plans)?;
    let exec = compute_configs(RunnerMode::Local, &config)?;
    Ok(exec.graph.len())
}

/// File config, overlaid by `RELFLOW_*` env vars, with plan files (if any)
/// stored as the job's statements.
fn load_job_config(
    config_path: Option<&Path>,
    plans: &[PathBuf],
) -> Result<Config, Box<dyn std::error::Error>> {
    let file = match config_path {
        Some(path) => parse_config_file(path, &fs::read_to_string(path)?)?,
        None => Config::new(),
    };
    let mut config = file.with_overrides(&Config::from_env());

    if !plans.is_empty() {
        let statements = plans
            .iter()
            .map(fs::read_to_string)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(statements = statements.len(), "loaded plan files");
        config = strip_statements(config);
        config.insert(keys::SQL_STMTS_JSON, serialize_statements(&statements)?);
    }
    Ok(config)
}

fn parse_config_file(path: &Path, src: &str) -> relflow_core::error::Result<Config> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => Config::from_yaml_str(src),
        _ => Config::from_properties_str(src),
    }
}

fn strip_statements(config: Config) -> Config {
    config
        .into_map()
        .into_iter()
        .filter(|(k, _)| k != keys::SQL_STMT && k != keys::SQL_STMTS_JSON)
        .collect()
}

fn parse_override(entry: &str) -> Result<(String, String), String> {
    match entry.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.trim().to_string())),
        _ => Err(format!("invalid --set '{}': expected KEY=VALUE", entry)),
    }
}
