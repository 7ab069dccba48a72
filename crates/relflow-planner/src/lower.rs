//! Lowering: relational tree + resolved IO configs → operator graph.
//!
//! Children are lowered before parents, so every spec is added after its
//! upstreams and the graph's insertion order is a topological order.
//! A scan of a name the resolver marked as a table is not lowered into an
//! input when it is one side of a join; the join binds it by table id
//! instead.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use relflow_core::error::{Error, Result};
use relflow_core::id::OpId;
use relflow_core::plan::{BinaryOp, JoinType, RelNode, UnaryOp};
use relflow_io::{IoRole, SqlIoConfig};
use relflow_operators::{
    FieldJoinFunction, OpCode, OperatorGraph, OperatorSpec, StreamTableJoinSpec,
};
use tracing::debug;

/// Resolved configs for one plan, keyed by logical name per role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedStreams {
    inputs: BTreeMap<String, SqlIoConfig>,
    outputs: BTreeMap<String, SqlIoConfig>,
}

impl ResolvedStreams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `config` for `role` under `name`, the name the plan used.
    /// Resolvers may normalize `config.source`, so it is not the key.
    pub fn insert(&mut self, role: IoRole, name: impl Into<String>, config: SqlIoConfig) {
        let map = match role {
            IoRole::Input => &mut self.inputs,
            IoRole::Output => &mut self.outputs,
        };
        map.insert(name.into(), config);
    }

    pub fn get(&self, name: &str, role: IoRole) -> Option<&SqlIoConfig> {
        match role {
            IoRole::Input => self.inputs.get(name),
            IoRole::Output => self.outputs.get(name),
        }
    }

    pub fn inputs(&self) -> impl Iterator<Item = &SqlIoConfig> {
        self.inputs.values()
    }

    pub fn outputs(&self) -> impl Iterator<Item = &SqlIoConfig> {
        self.outputs.values()
    }

    /// Inputs first, then outputs.
    pub fn all(&self) -> impl Iterator<Item = &SqlIoConfig> {
        self.inputs().chain(self.outputs())
    }

    /// Whether `name` was resolved as an input backed by a table.
    pub fn is_table(&self, name: &str) -> bool {
        self.inputs.get(name).map_or(false, |c| c.is_table)
    }

    pub fn len(&self) -> usize {
        self.inputs.len() + self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }
}

/// Lower `root` into an operator graph. Every table reference in the tree
/// must already be present in `resolved` under the role it is used in.
pub fn lower_to_graph(root: &RelNode, resolved: &ResolvedStreams) -> Result<OperatorGraph> {
    let mut lowering = Lowering {
        resolved,
        graph: OperatorGraph::new(),
        next: 0,
        inputs: HashMap::new(),
    };
    lowering.lower(root)?;
    debug!(operators = lowering.graph.len(), "lowered plan");
    Ok(lowering.graph)
}

struct Lowering<'a> {
    resolved: &'a ResolvedStreams,
    graph: OperatorGraph,
    next: usize,
    /// One input spec per logical stream, shared by every scan of it.
    inputs: HashMap<String, OpId>,
}

impl<'a> Lowering<'a> {
    fn fresh(&mut self, code: OpCode) -> OpId {
        let id = OpId::new(format!("{}_{}", code, self.next));
        self.next += 1;
        id
    }

    fn add(&mut self, spec: impl Into<OperatorSpec>) -> Result<OpId> {
        let id = self.graph.add(spec)?.clone();
        Ok(id)
    }

    fn resolved(&self, name: &str, role: IoRole) -> Result<&'a SqlIoConfig> {
        self.resolved
            .get(name, role)
            .ok_or_else(|| Error::UnresolvedStream {
                name: name.to_string(),
            })
    }

    /// Logical name of `node` if it is a direct scan of a table.
    fn table_side(&self, node: &RelNode) -> Option<String> {
        match node {
            RelNode::Scan { table: Some(t) } => {
                let name = t.to_string();
                self.resolved.is_table(&name).then_some(name)
            }
            _ => None,
        }
    }

    fn lower(&mut self, node: &RelNode) -> Result<OpId> {
        match node {
            RelNode::Scan { table: None } => Err(Error::PlanClassification(
                "scan without a table reference cannot be lowered".into(),
            )),
            RelNode::Scan { table: Some(t) } => {
                let name = t.to_string();
                if let Some(id) = self.inputs.get(&name) {
                    return Ok(id.clone());
                }
                let system = self.resolved(&name, IoRole::Input)?.system_name.clone();
                let id = self.fresh(OpCode::Input);
                self.add(OperatorSpec::Input {
                    id,
                    stream: name.clone(),
                    system,
                })
                .map(|id| {
                    self.inputs.insert(name, id.clone());
                    id
                })
            }
            // A unary table reference is bound by name through the resolved
            // config; only the streamed input becomes an upstream.
            RelNode::Unary { op, input, .. } => {
                let upstream = self.lower(input)?;
                self.lower_unary(op, upstream)
            }
            RelNode::Binary {
                op: BinaryOp::Union,
                left,
                right,
            } => {
                let l = self.lower(left)?;
                let r = self.lower(right)?;
                let id = self.fresh(OpCode::Merge);
                self.add(OperatorSpec::Merge {
                    id,
                    inputs: vec![l, r],
                })
            }
            RelNode::Binary {
                op:
                    BinaryOp::Join {
                        join_type,
                        left_key,
                        right_key,
                    },
                left,
                right,
            } => match (self.table_side(left), self.table_side(right)) {
                (Some(l), Some(r)) => Err(Error::Graph(format!(
                    "join between tables '{}' and '{}' has no stream side",
                    l, r
                ))),
                (None, Some(table)) => {
                    let stream = self.lower(left)?;
                    self.stream_table_join(stream, table, *join_type, left_key, right_key)
                }
                (Some(table), None) => {
                    if *join_type == JoinType::Left {
                        return Err(Error::Graph(format!(
                            "left join must keep the stream on the left, found table '{}'",
                            table
                        )));
                    }
                    let stream = self.lower(right)?;
                    self.stream_table_join(stream, table, *join_type, right_key, left_key)
                }
                (None, None) => {
                    let l = self.lower(left)?;
                    let r = self.lower(right)?;
                    let id = self.fresh(OpCode::Join);
                    self.add(OperatorSpec::StreamStreamJoin {
                        id,
                        left: l,
                        right: r,
                        join_type: *join_type,
                        left_key: left_key.clone(),
                        right_key: right_key.clone(),
                    })
                }
            },
            RelNode::Modify { table, input, .. } => {
                let upstream = self.lower(input)?;
                let name = table.to_string();
                let system = self.resolved(&name, IoRole::Output)?.system_name.clone();
                let id = self.fresh(OpCode::Sink);
                self.add(OperatorSpec::Sink {
                    id,
                    upstream,
                    stream: name,
                    system,
                })
            }
        }
    }

    fn lower_unary(&mut self, op: &UnaryOp, upstream: OpId) -> Result<OpId> {
        match op {
            UnaryOp::Project { columns } => {
                let id = self.fresh(OpCode::Map);
                self.add(OperatorSpec::Map {
                    id,
                    upstream,
                    columns: columns.clone(),
                })
            }
            UnaryOp::Filter { condition } => {
                let id = self.fresh(OpCode::Filter);
                self.add(OperatorSpec::Filter {
                    id,
                    upstream,
                    condition: condition.clone(),
                })
            }
            UnaryOp::Aggregate {
                group_by,
                aggregates,
            } => {
                let id = self.fresh(OpCode::PartitionBy);
                let keyed = self.add(OperatorSpec::PartitionBy {
                    id,
                    upstream,
                    keys: group_by.clone(),
                })?;
                let id = self.fresh(OpCode::Map);
                self.add(OperatorSpec::Map {
                    id,
                    upstream: keyed,
                    columns: group_by.iter().chain(aggregates).cloned().collect(),
                })
            }
            UnaryOp::Window {
                partition_by,
                size_ms,
            } => {
                let id = self.fresh(OpCode::Window);
                self.add(OperatorSpec::Window {
                    id,
                    upstream,
                    partition_by: partition_by.clone(),
                    size_ms: *size_ms,
                })
            }
        }
    }

    fn stream_table_join(
        &mut self,
        stream: OpId,
        table: String,
        join_type: JoinType,
        message_key: &str,
        record_key: &str,
    ) -> Result<OpId> {
        let id = self.fresh(OpCode::Join);
        let join_fn = Arc::new(FieldJoinFunction::new(message_key, record_key, join_type));
        self.add(StreamTableJoinSpec::new(id, table, join_fn, Vec::new()).with_upstream(stream))
    }
}
