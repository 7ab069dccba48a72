//! The resolver contract consumed by the compiler.

use std::fmt;

use relflow_core::error::Result;
use serde::{Deserialize, Serialize};

use crate::io_config::SqlIoConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoRole {
    Input,
    Output,
}

impl fmt::Display for IoRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoRole::Input => f.write_str("input"),
            IoRole::Output => f.write_str("output"),
        }
    }
}

/// Roles a registered system accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoRoles {
    pub input: bool,
    pub output: bool,
}

impl IoRoles {
    pub const BOTH: IoRoles = IoRoles {
        input: true,
        output: true,
    };
    pub const INPUT_ONLY: IoRoles = IoRoles {
        input: true,
        output: false,
    };
    pub const OUTPUT_ONLY: IoRoles = IoRoles {
        input: false,
        output: true,
    };

    pub fn supports(&self, role: IoRole) -> bool {
        match role {
            IoRole::Input => self.input,
            IoRole::Output => self.output,
        }
    }
}

impl Default for IoRoles {
    fn default() -> Self {
        IoRoles::BOTH
    }
}

/// Lookup from logical name to physical configuration.
///
/// Implementations must be side-effect free: the same name resolves to a
/// value-equal `SqlIoConfig` on every call. Errors:
/// - `Error::UnresolvedStream` when no registered system claims the name
/// - `Error::RoleMismatch` when the system does not support the role
pub trait IoResolver: Send + Sync {
    fn resolve_input(&self, name: &str) -> Result<SqlIoConfig>;

    fn resolve_output(&self, name: &str) -> Result<SqlIoConfig>;

    /// Whether `name` is registered as a materialized table.
    fn is_table(&self, name: &str) -> bool;

    fn resolve(&self, name: &str, role: IoRole) -> Result<SqlIoConfig> {
        match role {
            IoRole::Input => self.resolve_input(name),
            IoRole::Output => self.resolve_output(name),
        }
    }
}
