//! Resolver factories keyed on resolver type.
//!
//! The job config names the resolver (`relflow.sql.io.resolver`, default
//! `config`); the registry maps that name to a factory.

use std::collections::BTreeMap;
use std::sync::Arc;

use relflow_core::config::{keys, Config};
use relflow_core::error::{Error, Result};

use crate::config_resolver::ConfigIoResolver;
use crate::resolver::IoResolver;

pub const DEFAULT_RESOLVER: &str = "config";

pub trait IoResolverFactory: Send + Sync {
    fn create(&self, config: &Config) -> Result<Arc<dyn IoResolver>>;
}

/// Builds a `ConfigIoResolver` from the job config.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigIoResolverFactory;

impl IoResolverFactory for ConfigIoResolverFactory {
    fn create(&self, config: &Config) -> Result<Arc<dyn IoResolver>> {
        Ok(Arc::new(ConfigIoResolver::from_config(config)?))
    }
}

/// Named resolver factories.
pub struct ResolverRegistry {
    factories: BTreeMap<String, Arc<dyn IoResolverFactory>>,
}

impl ResolverRegistry {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the built-in `config` factory.
    pub fn with_defaults() -> Self {
        let mut r = Self::empty();
        r.register(DEFAULT_RESOLVER, Arc::new(ConfigIoResolverFactory));
        r
    }

    pub fn register(&mut self, name: impl Into<String>, factory: Arc<dyn IoResolverFactory>) {
        self.factories.insert(name.into(), factory);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Create the resolver the config asks for.
    pub fn create(&self, config: &Config) -> Result<Arc<dyn IoResolver>> {
        let name = config.get_or(keys::IO_RESOLVER, DEFAULT_RESOLVER).trim();
        let factory = self.factories.get(name).ok_or_else(|| {
            Error::Config(format!(
                "unknown io resolver '{}' (known: {})",
                name,
                self.names().collect::<Vec<_>>().join(", ")
            ))
        })?;
        factory.create(config)
    }
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Create the configured resolver using the built-in factories.
pub fn create_io_resolver(config: &Config) -> Result<Arc<dyn IoResolver>> {
    ResolverRegistry::with_defaults().create(config)
}
