//! Relational plan tree handed to the compiler by an external planner.
//!
//! The node family is closed: every pass over the tree is an exhaustive
//! `match`, so adding a variant breaks the build until each pass handles it.
//! Children are owned through `Box`, which makes shared subtrees and cycles
//! unrepresentable.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Dotted multi-part table name, e.g. `kafka.PageViewStream`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QualifiedName(Vec<String>);

impl QualifiedName {
    pub fn new<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(Error::Dsl("qualified name has no segments".into()));
        }
        if let Some(pos) = segments.iter().position(|s| s.trim().is_empty()) {
            return Err(Error::Dsl(format!(
                "qualified name segment {} is empty in {:?}",
                pos, segments
            )));
        }
        Ok(Self(segments))
    }

    /// Parse a dot-joined name.
    pub fn parse(dotted: &str) -> Result<Self> {
        Self::new(dotted.split('.').map(str::trim))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// First segment; by convention the system that owns the name.
    pub fn head(&self) -> &str {
        &self.0[0]
    }

    /// Everything after the first segment, dot-joined. Empty for one-part names.
    pub fn tail(&self) -> String {
        self.0[1..].join(".")
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl TryFrom<String> for QualifiedName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<QualifiedName> for String {
    fn from(n: QualifiedName) -> Self {
        n.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    Inner,
    Left,
}

/// Single-input relational operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Project { columns: Vec<String> },
    Filter { condition: String },
    Aggregate { group_by: Vec<String>, aggregates: Vec<String> },
    Window { partition_by: Vec<String>, size_ms: u64 },
}

/// Two-input relational operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Join {
        join_type: JoinType,
        left_key: String,
        right_key: String,
    },
    Union,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifyOp {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RelNode {
    /// Leaf reading a table or stream. `table` is `None` only when the
    /// planner could not attach one; classification rejects that.
    Scan { table: Option<QualifiedName> },
    /// Sink write into `table`.
    Modify {
        table: QualifiedName,
        op: ModifyOp,
        input: Box<RelNode>,
    },
    Binary {
        op: BinaryOp,
        left: Box<RelNode>,
        right: Box<RelNode>,
    },
    /// `table` is set for operators that read a table themselves
    /// (table functions, lookups).
    Unary {
        op: UnaryOp,
        table: Option<QualifiedName>,
        input: Box<RelNode>,
    },
}

impl RelNode {
    pub fn scan(table: QualifiedName) -> Self {
        RelNode::Scan { table: Some(table) }
    }

    pub fn unary(op: UnaryOp, input: RelNode) -> Self {
        RelNode::Unary {
            op,
            table: None,
            input: Box::new(input),
        }
    }

    pub fn binary(op: BinaryOp, left: RelNode, right: RelNode) -> Self {
        RelNode::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn modify(table: QualifiedName, op: ModifyOp, input: RelNode) -> Self {
        RelNode::Modify {
            table,
            op,
            input: Box::new(input),
        }
    }

    /// Child nodes in left-to-right order.
    pub fn inputs(&self) -> Vec<&RelNode> {
        use RelNode::*;
        match self {
            Scan { .. } => vec![],
            Modify { input, .. } | Unary { input, .. } => vec![input.as_ref()],
            Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
        }
    }

    /// Table directly referenced by this node, if any.
    pub fn table(&self) -> Option<&QualifiedName> {
        use RelNode::*;
        match self {
            Scan { table } | Unary { table, .. } => table.as_ref(),
            Modify { table, .. } => Some(table),
            Binary { .. } => None,
        }
    }

    /// Short operator label used in errors and logs.
    pub fn label(&self) -> &'static str {
        match self {
            RelNode::Scan { .. } => "scan",
            RelNode::Modify { .. } => "modify",
            RelNode::Binary { op, .. } => match op {
                BinaryOp::Join { .. } => "join",
                BinaryOp::Union => "union",
            },
            RelNode::Unary { op, .. } => match op {
                UnaryOp::Project { .. } => "project",
                UnaryOp::Filter { .. } => "filter",
                UnaryOp::Aggregate { .. } => "aggregate",
                UnaryOp::Window { .. } => "window",
            },
        }
    }

    /// Longest root-to-leaf path, counting nodes.
    pub fn depth(&self) -> usize {
        1 + self.inputs().iter().map(|n| n.depth()).max().unwrap_or(0)
    }
}

/// Root of one planned statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelRoot {
    rel: RelNode,
}

impl RelRoot {
    pub fn new(rel: RelNode) -> Self {
        Self { rel }
    }

    /// The top relational node, including any final projection.
    pub fn project(&self) -> &RelNode {
        &self.rel
    }

    pub fn into_inner(self) -> RelNode {
        self.rel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> QualifiedName {
        QualifiedName::parse(s).unwrap()
    }

    #[test]
    fn qualified_name_round_trips_through_display() {
        let name = q("kafka.PageViewStream");
        assert_eq!(name.head(), "kafka");
        assert_eq!(name.tail(), "PageViewStream");
        assert_eq!(name.to_string(), "kafka.PageViewStream");
    }

    #[test]
    fn qualified_name_rejects_empty_segments() {
        assert!(QualifiedName::parse("kafka..topic").is_err());
        assert!(QualifiedName::parse("").is_err());
        assert!(QualifiedName::new(Vec::<String>::new()).is_err());
    }

    #[test]
    fn node_shapes() {
        let join = RelNode::binary(
            BinaryOp::Union,
            RelNode::scan(q("kafka.a")),
            RelNode::scan(q("kafka.b")),
        );
        let sink = RelNode::modify(q("kafka.out"), ModifyOp::Insert, join);
        assert_eq!(sink.inputs().len(), 1);
        assert_eq!(sink.inputs()[0].inputs().len(), 2);
        assert_eq!(sink.depth(), 3);
        assert_eq!(sink.table(), Some(&q("kafka.out")));
        assert_eq!(sink.inputs()[0].table(), None);
        assert_eq!(sink.inputs()[0].label(), "union");
    }
}
