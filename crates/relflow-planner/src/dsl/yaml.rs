//! YAML → relational plan converter. One YAML document per statement.
//!
//! Example:
//! ```yaml
//! op: modify
//! table: kafka.EnrichedPageViews
//! input:
//!   op: join
//!   left_key: user_id
//!   right_key: id
//!   left:  { op: scan, table: kafka.PageViews }
//!   right: { op: scan, table: profiles.users }
//! ---
//! op: modify
//! table: kafka.Errors
//! input:
//!   op: filter
//!   condition: "status >= 500"
//!   input: { op: scan, table: kafka.Requests }
//! ```

use serde::{Deserialize, Serialize};

use relflow_core::error::{Error, Result};
use relflow_core::plan::{BinaryOp, JoinType, ModifyOp, QualifiedName, RelNode, RelRoot, UnaryOp};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "op")]
pub enum NodeDef {
    #[serde(rename = "scan")]
    Scan {
        #[serde(default)]
        table: Option<String>,
    },

    #[serde(rename = "project")]
    Project {
        columns: Vec<String>,
        #[serde(default)]
        table: Option<String>,
        input: Box<NodeDef>,
    },

    #[serde(rename = "filter")]
    Filter {
        condition: String,
        #[serde(default)]
        table: Option<String>,
        input: Box<NodeDef>,
    },

    #[serde(rename = "aggregate")]
    Aggregate {
        group_by: Vec<String>,
        #[serde(default)]
        aggregates: Vec<String>,
        input: Box<NodeDef>,
    },

    #[serde(rename = "window")]
    Window {
        #[serde(default)]
        partition_by: Vec<String>,
        size_ms: u64,
        input: Box<NodeDef>,
    },

    #[serde(rename = "join")]
    Join {
        #[serde(default = "default_join_type")]
        join_type: JoinType,
        left_key: String,
        right_key: String,
        left: Box<NodeDef>,
        right: Box<NodeDef>,
    },

    #[serde(rename = "union")]
    Union {
        left: Box<NodeDef>,
        right: Box<NodeDef>,
    },

    #[serde(rename = "modify", alias = "insert")]
    Modify {
        table: String,
        #[serde(default = "default_modify_op")]
        operation: ModifyOp,
        input: Box<NodeDef>,
    },
}

fn default_join_type() -> JoinType {
    JoinType::Inner
}

fn default_modify_op() -> ModifyOp {
    ModifyOp::Insert
}

fn name(s: &str) -> Result<QualifiedName> {
    QualifiedName::parse(s)
}

fn opt_name(s: Option<&str>) -> Result<Option<QualifiedName>> {
    s.map(name).transpose()
}

fn to_rel(def: NodeDef) -> Result<RelNode> {
    Ok(match def {
        NodeDef::Scan { table } => RelNode::Scan {
            table: opt_name(table.as_deref())?,
        },
        NodeDef::Project {
            columns,
            table,
            input,
        } => RelNode::Unary {
            op: UnaryOp::Project { columns },
            table: opt_name(table.as_deref())?,
            input: Box::new(to_rel(*input)?),
        },
        NodeDef::Filter {
            condition,
            table,
            input,
        } => RelNode::Unary {
            op: UnaryOp::Filter { condition },
            table: opt_name(table.as_deref())?,
            input: Box::new(to_rel(*input)?),
        },
        NodeDef::Aggregate {
            group_by,
            aggregates,
            input,
        } => RelNode::unary(
            UnaryOp::Aggregate {
                group_by,
                aggregates,
            },
            to_rel(*input)?,
        ),
        NodeDef::Window {
            partition_by,
            size_ms,
            input,
        } => {
            if size_ms == 0 {
                return Err(Error::Dsl("window size_ms must be positive".into()));
            }
            RelNode::unary(
                UnaryOp::Window {
                    partition_by,
                    size_ms,
                },
                to_rel(*input)?,
            )
        }
        NodeDef::Join {
            join_type,
            left_key,
            right_key,
            left,
            right,
        } => RelNode::binary(
            BinaryOp::Join {
                join_type,
                left_key,
                right_key,
            },
            to_rel(*left)?,
            to_rel(*right)?,
        ),
        NodeDef::Union { left, right } => {
            RelNode::binary(BinaryOp::Union, to_rel(*left)?, to_rel(*right)?)
        }
        NodeDef::Modify {
            table,
            operation,
            input,
        } => RelNode::modify(name(&table)?, operation, to_rel(*input)?),
    })
}

/// Parse one YAML plan document into a root.
pub fn parse_yaml_plan(yaml_src: &str) -> Result<RelRoot> {
    let def: NodeDef =
        serde_yaml::from_str(yaml_src).map_err(|e| Error::Dsl(format!("invalid plan: {}", e)))?;
    Ok(RelRoot::new(to_rel(def)?))
}

#[derive(Debug, Clone, Default)]
pub struct YamlDslConverter;

impl YamlDslConverter {
    pub fn new() -> Self {
        Self
    }
}

impl super::DslConverter for YamlDslConverter {
    fn convert_dsl(&self, dsl: &str) -> Result<Vec<RelRoot>> {
        let mut roots = Vec::new();
        for (idx, doc) in serde_yaml::Deserializer::from_str(dsl).enumerate() {
            let value = serde_yaml::Value::deserialize(doc)
                .map_err(|e| Error::Dsl(format!("statement {}: {}", idx, e)))?;
            // Blank documents come from leading or doubled separators.
            if value.is_null() {
                continue;
            }
            let def: NodeDef = serde_yaml::from_value(value)
                .map_err(|e| Error::Dsl(format!("statement {}: {}", idx, e)))?;
            roots.push(RelRoot::new(to_rel(def)?));
        }
        if roots.is_empty() {
            return Err(Error::Dsl("no plan statements found".into()));
        }
        Ok(roots)
    }

    fn statement_separator(&self) -> &str {
        "\n---\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::DslConverter;

    const ENRICH: &str = r#"
op: modify
table: kafka.EnrichedPageViews
input:
  op: join
  join_type: left
  left_key: user_id
  right_key: id
  left:  { op: scan, table: kafka.PageViews }
  right: { op: scan, table: profiles.users }
"#;

    #[test]
    fn parses_join_under_modify() {
        let root = parse_yaml_plan(ENRICH).unwrap();
        match root.project() {
            RelNode::Modify {
                table, op, input, ..
            } => {
                assert_eq!(table.to_string(), "kafka.EnrichedPageViews");
                assert_eq!(*op, ModifyOp::Insert);
                match &**input {
                    RelNode::Binary {
                        op: BinaryOp::Join { join_type, .. },
                        left,
                        ..
                    } => {
                        assert_eq!(*join_type, JoinType::Left);
                        assert_eq!(
                            left.table().map(|t| t.to_string()).as_deref(),
                            Some("kafka.PageViews")
                        );
                    }
                    other => panic!("expected join, got {:?}", other),
                }
            }
            other => panic!("expected modify, got {:?}", other),
        }
    }

    #[test]
    fn multiple_documents_become_multiple_roots() {
        let conv = YamlDslConverter::new();
        let stmts = vec![
            ENRICH.to_string(),
            "op: insert\ntable: kafka.out\ninput: { op: scan, table: kafka.in }".to_string(),
        ];
        let roots = conv.convert_dsl(&conv.join_statements(&stmts)).unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[1].project().label(), "modify");
    }

    #[test]
    fn blank_documents_are_skipped() {
        let conv = YamlDslConverter::new();
        let roots = conv
            .convert_dsl("---\nop: scan\ntable: kafka.a\n---\n---\n")
            .unwrap();
        assert_eq!(roots.len(), 1);
    }

    #[test]
    fn empty_input_is_rejected() {
        let conv = YamlDslConverter::new();
        assert!(matches!(conv.convert_dsl(""), Err(Error::Dsl(_))));
    }

    #[test]
    fn scan_without_table_parses() {
        // Classification, not parsing, rejects a table-less scan.
        let root = parse_yaml_plan("op: scan").unwrap();
        assert_eq!(root.project(), &RelNode::Scan { table: None });
    }

    #[test]
    fn bad_plans_are_dsl_errors() {
        assert!(matches!(parse_yaml_plan("op: explode"), Err(Error::Dsl(_))));
        assert!(matches!(
            parse_yaml_plan("op: scan\ntable: 'kafka..x'"),
            Err(Error::Dsl(_))
        ));
        assert!(matches!(
            parse_yaml_plan("op: window\nsize_ms: 0\ninput: { op: scan, table: a.b }"),
            Err(Error::Dsl(_))
        ));
    }
}
