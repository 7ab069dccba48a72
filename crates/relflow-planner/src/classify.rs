//! Stream role classification.
//!
//! Walks a relational tree once and sorts every table reference into the
//! input set (read) or the output set (written by a `Modify`). Binary nodes
//! contribute both subtrees to the same sets, so mixed join shapes classify
//! the same regardless of which side is visited first.

use std::collections::BTreeSet;

use relflow_core::error::{Error, Result};
use relflow_core::plan::RelNode;
use serde::Serialize;
use tracing::debug;

/// Input and output names of one plan. A name may sit in both sets when a
/// query reads the table it writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamRoles {
    inputs: BTreeSet<String>,
    outputs: BTreeSet<String>,
}

impl StreamRoles {
    pub fn inputs(&self) -> &BTreeSet<String> {
        &self.inputs
    }

    pub fn outputs(&self) -> &BTreeSet<String> {
        &self.outputs
    }

    /// Names that are both read and written.
    pub fn read_and_written(&self) -> impl Iterator<Item = &str> {
        self.inputs.intersection(&self.outputs).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }
}

/// Classify every table reference under `root`.
///
/// A scan without a table reference is rejected rather than skipped.
pub fn classify(root: &RelNode) -> Result<StreamRoles> {
    let mut roles = StreamRoles::default();
    let mut path = Vec::new();
    walk(root, &mut path, &mut roles)?;
    debug!(inputs = ?roles.inputs, outputs = ?roles.outputs, "classified plan");
    Ok(roles)
}

fn walk<'a>(node: &'a RelNode, path: &mut Vec<&'a str>, roles: &mut StreamRoles) -> Result<()> {
    path.push(node.label());
    match node {
        RelNode::Modify { table, input, .. } => {
            roles.outputs.insert(table.to_string());
            walk(input, path, roles)?;
        }
        RelNode::Binary { left, right, .. } => {
            walk(left, path, roles)?;
            walk(right, path, roles)?;
        }
        RelNode::Unary { table, input, .. } => {
            if let Some(t) = table {
                roles.inputs.insert(t.to_string());
            }
            walk(input, path, roles)?;
        }
        RelNode::Scan { table } => match table {
            Some(t) => {
                roles.inputs.insert(t.to_string());
            }
            None => {
                return Err(Error::PlanClassification(format!(
                    "scan at '{}' has no table reference",
                    path.join(" > ")
                )))
            }
        },
    }
    path.pop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relflow_core::plan::{BinaryOp, JoinType, ModifyOp, QualifiedName, UnaryOp};

    fn q(s: &str) -> QualifiedName {
        QualifiedName::parse(s).unwrap()
    }

    fn scan(s: &str) -> RelNode {
        RelNode::scan(q(s))
    }

    fn join(l: RelNode, r: RelNode) -> RelNode {
        RelNode::binary(
            BinaryOp::Join {
                join_type: JoinType::Inner,
                left_key: "id".into(),
                right_key: "id".into(),
            },
            l,
            r,
        )
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn single_scan_is_single_input() {
        let roles = classify(&scan("kafka.S")).unwrap();
        assert_eq!(roles.inputs(), &set(&["kafka.S"]));
        assert!(roles.outputs().is_empty());
    }

    #[test]
    fn modify_over_scan() {
        let plan = RelNode::modify(q("kafka.T"), ModifyOp::Insert, scan("kafka.S"));
        let roles = classify(&plan).unwrap();
        assert_eq!(roles.inputs(), &set(&["kafka.S"]));
        assert_eq!(roles.outputs(), &set(&["kafka.T"]));
    }

    #[test]
    fn join_under_modify_is_order_independent() {
        let ab = RelNode::modify(
            q("kafka.C"),
            ModifyOp::Insert,
            join(scan("kafka.A"), scan("kafka.B")),
        );
        let ba = RelNode::modify(
            q("kafka.C"),
            ModifyOp::Insert,
            join(scan("kafka.B"), scan("kafka.A")),
        );
        let r1 = classify(&ab).unwrap();
        let r2 = classify(&ba).unwrap();
        assert_eq!(r1.inputs(), &set(&["kafka.A", "kafka.B"]));
        assert_eq!(r1.outputs(), &set(&["kafka.C"]));
        assert_eq!(r1, r2);
    }

    #[test]
    fn projections_and_filters_are_walked() {
        let plan = RelNode::modify(
            q("kafka.out"),
            ModifyOp::Insert,
            RelNode::unary(
                UnaryOp::Project {
                    columns: vec!["a".into()],
                },
                RelNode::unary(
                    UnaryOp::Filter {
                        condition: "a > 1".into(),
                    },
                    RelNode::binary(BinaryOp::Union, scan("kafka.x"), scan("kafka.y")),
                ),
            ),
        );
        let roles = classify(&plan).unwrap();
        assert_eq!(roles.inputs(), &set(&["kafka.x", "kafka.y"]));
        assert_eq!(roles.outputs(), &set(&["kafka.out"]));
    }

    #[test]
    fn unary_table_reference_is_an_input() {
        let plan = RelNode::Unary {
            op: UnaryOp::Filter {
                condition: "true".into(),
            },
            table: Some(q("lookup.users")),
            input: Box::new(scan("kafka.clicks")),
        };
        let roles = classify(&plan).unwrap();
        assert_eq!(roles.inputs(), &set(&["kafka.clicks", "lookup.users"]));
    }

    #[test]
    fn self_referential_read_then_write() {
        let plan = RelNode::modify(
            q("kafka.T"),
            ModifyOp::Insert,
            join(scan("kafka.T"), scan("kafka.S")),
        );
        let roles = classify(&plan).unwrap();
        assert!(roles.inputs().contains("kafka.T"));
        assert!(roles.outputs().contains("kafka.T"));
        assert_eq!(roles.read_and_written().collect::<Vec<_>>(), vec!["kafka.T"]);
    }

    #[test]
    fn duplicate_references_are_deduplicated() {
        let plan = RelNode::binary(BinaryOp::Union, scan("kafka.A"), scan("kafka.A"));
        assert_eq!(classify(&plan).unwrap().inputs().len(), 1);
    }

    #[test]
    fn scan_without_table_is_an_error() {
        let plan = RelNode::modify(
            q("kafka.out"),
            ModifyOp::Insert,
            join(scan("kafka.A"), RelNode::Scan { table: None }),
        );
        match classify(&plan) {
            Err(Error::PlanClassification(msg)) => {
                assert!(msg.contains("modify > join > scan"), "{}", msg)
            }
            other => panic!("expected classification error, got {:?}", other),
        }
    }
}
