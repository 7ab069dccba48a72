//! Planner collaborator seam.
//!
//! A `DslConverter` turns statement text into relational roots. The only
//! converter shipped here reads YAML plan documents; a SQL front end would
//! plug in through the same trait and `DslConverterFactory`.

pub mod yaml;

use relflow_core::config::{keys, Config};
use relflow_core::error::{Error, Result};
use relflow_core::plan::RelRoot;

pub const DEFAULT_DSL_FORMAT: &str = "yaml";

pub trait DslConverter: Send + Sync {
    /// Convert statement text into one root per statement. An empty result
    /// is an error.
    fn convert_dsl(&self, dsl: &str) -> Result<Vec<RelRoot>>;

    /// Separator used when several statements are handed over as one text.
    fn statement_separator(&self) -> &str {
        "\n"
    }

    /// Join `statements` with this converter's separator.
    fn join_statements(&self, statements: &[String]) -> String {
        statements.join(self.statement_separator())
    }
}

pub trait DslConverterFactory: Send + Sync {
    fn create(&self, config: &Config) -> Result<Box<dyn DslConverter>>;
}

pub struct YamlDslConverterFactory;

impl DslConverterFactory for YamlDslConverterFactory {
    fn create(&self, _config: &Config) -> Result<Box<dyn DslConverter>> {
        Ok(Box::new(yaml::YamlDslConverter::new()))
    }
}

/// Build the converter named by `relflow.sql.dsl.format`.
pub fn create_dsl_converter(config: &Config) -> Result<Box<dyn DslConverter>> {
    let format = config.get_or(keys::DSL_FORMAT, DEFAULT_DSL_FORMAT);
    match format {
        "yaml" | "yml" => YamlDslConverterFactory.create(config),
        other => Err(Error::Config(format!(
            "unknown DSL format '{}' for {}",
            other,
            keys::DSL_FORMAT
        ))),
    }
}
