//! Operator graph: owns specs, keeps insertion (= topological) order.
//!
//! Specs must be added after their upstreams, so every back-reference is
//! checked on insertion and the graph can never hold a dangling id.

use std::collections::{BTreeSet, HashMap};

use relflow_core::error::{Error, Result};
use relflow_core::id::OpId;
use serde::{Deserialize, Serialize};

use crate::spec::{OpCode, OperatorSpec};
use crate::traits::OpError;

/// Serializable summary of one spec, for logs and CLI output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorDescriptor {
    pub id: OpId,
    pub op_code: OpCode,
    pub upstream: Vec<OpId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OperatorGraph {
    specs: Vec<OperatorSpec>,
    index: HashMap<OpId, usize>,
}

impl OperatorGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, spec: impl Into<OperatorSpec>) -> std::result::Result<&OpId, OpError> {
        let spec = spec.into();
        let id = spec.id().clone();
        if self.index.contains_key(&id) {
            return Err(OpError::DuplicateId(id.to_string()));
        }
        if let Some(missing) = spec.upstream().into_iter().find(|u| !self.index.contains_key(*u)) {
            return Err(OpError::UnknownUpstream {
                op: id.to_string(),
                upstream: missing.to_string(),
            });
        }
        if spec.upstream().is_empty() && spec.op_code() != OpCode::Input {
            return Err(OpError::Invalid(format!(
                "operator '{}' ({}) has no upstream",
                id,
                spec.op_code()
            )));
        }
        let pos = self.specs.len();
        self.specs.push(spec);
        self.index.insert(id, pos);
        Ok(self.specs[pos].id())
    }

    pub fn get(&self, id: &OpId) -> Option<&OperatorSpec> {
        self.index.get(id).map(|&i| &self.specs[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperatorSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn inputs(&self) -> impl Iterator<Item = &OperatorSpec> {
        self.specs.iter().filter(|s| s.op_code() == OpCode::Input)
    }

    pub fn sinks(&self) -> impl Iterator<Item = &OperatorSpec> {
        self.specs.iter().filter(|s| s.op_code() == OpCode::Sink)
    }

    /// Ids of the specs that read from `id`.
    pub fn downstream(&self, id: &OpId) -> Vec<&OpId> {
        self.specs
            .iter()
            .filter(|s| s.upstream().contains(&id))
            .map(|s| s.id())
            .collect()
    }

    /// Every stream-table join must bind a table that was classified as an
    /// input or that the resolver knows independently.
    pub fn validate_tables<F>(&self, classified_inputs: &BTreeSet<String>, registered: F) -> Result<()>
    where
        F: Fn(&str) -> bool,
    {
        for spec in &self.specs {
            if let Some(table) = spec.table_id() {
                if !classified_inputs.contains(table) && !registered(table) {
                    return Err(Error::UnresolvedStream {
                        name: table.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn describe(&self) -> Vec<OperatorDescriptor> {
        self.specs
            .iter()
            .map(|s| OperatorDescriptor {
                id: s.id().clone(),
                op_code: s.op_code(),
                upstream: s.upstream().into_iter().cloned().collect(),
                table: s.table_id().map(str::to_string),
                capabilities: match s {
                    OperatorSpec::StreamTableJoin(j) => j
                        .capabilities()
                        .names()
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    _ => Vec::new(),
                },
            })
            .collect()
    }
}
