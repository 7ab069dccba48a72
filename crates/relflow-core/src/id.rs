//! Strongly-typed identifiers used across the compiler.
//!
//! Operator ids are opaque caller-assigned strings; uniqueness is enforced
//! by the operator graph, not here.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(transparent)]
pub struct OpId(String);

impl OpId {
    pub fn new(v: impl Into<String>) -> Self {
        Self(v.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OpId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for OpId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
