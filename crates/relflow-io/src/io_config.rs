//! Physical IO configuration for one logical name.

use std::collections::BTreeMap;

use relflow_core::config::keys;
use serde::{Deserialize, Serialize};

/// Where a logical stream/table physically lives and how to reach it.
///
/// Value-equal across repeated resolutions of the same name, which is what
/// lets the compiler merge duplicate references safely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlIoConfig {
    /// Logical qualified name as written in the plan.
    pub source: String,
    /// Physical system identifier.
    pub system_name: String,
    /// Stream or table name inside the system.
    pub stream_name: String,
    /// Backed by a materialized table rather than a stream.
    pub is_table: bool,
    /// System-specific keys to hand to the runtime.
    pub config: BTreeMap<String, String>,
}

impl SqlIoConfig {
    pub fn new(
        source: impl Into<String>,
        system_name: impl Into<String>,
        stream_name: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            system_name: system_name.into(),
            stream_name: stream_name.into(),
            is_table: false,
            config: BTreeMap::new(),
        }
    }

    pub fn as_table(mut self) -> Self {
        self.is_table = true;
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// The `streams.<stream>.samza.system` binding for this config.
    pub fn system_binding(&self) -> (String, String) {
        (keys::stream_system(&self.stream_name), self.system_name.clone())
    }
}
