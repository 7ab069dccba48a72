use thiserror::Error;

/// Canonical result for the compiler crates.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A plan node needed a table reference and did not carry one.
    #[error("Plan classification error: {0}")]
    PlanClassification(String),

    #[error("Unresolved stream '{name}': no registered system claims it")]
    UnresolvedStream { name: String },

    #[error("Stream '{name}' cannot be used as {role}")]
    RoleMismatch { name: String, role: String },

    #[error("Conflicting configuration for '{name}': bound to '{existing}' and '{conflicting}'")]
    ConfigurationConflict {
        name: String,
        existing: String,
        conflicting: String,
    },

    #[error("DSL conversion error: {0}")]
    Dsl(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Operator graph error: {0}")]
    Graph(String),

    #[error("Hashing error: {0}")]
    Hash(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl Error {
    /// Name of the stream/table the error is about, when there is one.
    pub fn stream_name(&self) -> Option<&str> {
        match self {
            Error::UnresolvedStream { name }
            | Error::RoleMismatch { name, .. }
            | Error::ConfigurationConflict { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}
