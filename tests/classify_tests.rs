//! Stream role classification over hand-built and DSL-built plans.


use relflow_core::error::Error;
use relflow_core::plan::{BinaryOp, RelNode, UnaryOp};
use relflow_planner::{classify, DslConverter, YamlDslConverter};
use std::collections::BTreeSet;
use test_plans::{inner_join, insert, scan, ENRICH_PAGE_VIEWS, FILTER_ERRORS};

fn names(v: &[&str]) -> BTreeSet<String> {
    v.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_single_scan_is_passthrough() {
    let roles = classify(&scan("kafka.S")).unwrap();
    assert_eq!(roles.inputs(), &names(&["kafka.S"]));
    assert!(roles.outputs().is_empty());
}

#[test]
fn test_modify_over_scan() {
    let roles = classify(&insert("kafka.T", scan("kafka.S"))).unwrap();
    assert_eq!(roles.inputs(), &names(&["kafka.S"]));
    assert_eq!(roles.outputs(), &names(&["kafka.T"]));
}

#[test]
fn test_join_sides_commute() {
    let ab = insert("kafka.C", inner_join(scan("kafka.A"), scan("kafka.B"), "k", "k"));
    let ba = insert("kafka.C", inner_join(scan("kafka.B"), scan("kafka.A"), "k", "k"));
    let r1 = classify(&ab).unwrap();
    let r2 = classify(&ba).unwrap();
    assert_eq!(r1.inputs(), &names(&["kafka.A", "kafka.B"]));
    assert_eq!(r1.outputs(), &names(&["kafka.C"]));
    assert_eq!(r1, r2);
}

#[test]
fn test_deep_mixed_tree() {
    // ((A ⋈ B) ∪ filter(C)) → D, with a lookup table on the filter
    let filtered = RelNode::Unary {
        op: UnaryOp::Filter {
            condition: "x > 0".into(),
        },
        table: Some(test_plans::q("lookup.dims")),
        input: Box::new(scan("kafka.C")),
    };
    let plan = insert(
        "kafka.D",
        RelNode::binary(
            BinaryOp::Union,
            inner_join(scan("kafka.A"), scan("kafka.B"), "id", "id"),
            filtered,
        ),
    );
    let roles = classify(&plan).unwrap();
    assert_eq!(
        roles.inputs(),
        &names(&["kafka.A", "kafka.B", "kafka.C", "lookup.dims"])
    );
    assert_eq!(roles.outputs(), &names(&["kafka.D"]));
}

#[test]
fn test_leaf_without_table_is_rejected() {
    let plan = insert("kafka.out", RelNode::Scan { table: None });
    assert!(matches!(classify(&plan), Err(Error::PlanClassification(_))));
}

#[test]
fn test_classify_yaml_statements() {
    let conv = YamlDslConverter::new();
    let text = conv.join_statements(&[ENRICH_PAGE_VIEWS.to_string(), FILTER_ERRORS.to_string()]);
    let roots = conv.convert_dsl(&text).unwrap();
    assert_eq!(roots.len(), 2);

    let enrich = classify(roots[0].project()).unwrap();
    assert_eq!(enrich.inputs(), &names(&["kafka.PageViews", "profiles.users"]));
    assert_eq!(enrich.outputs(), &names(&["kafka.EnrichedPageViews"]));

    let errors = classify(roots[1].project()).unwrap();
    assert_eq!(errors.inputs(), &names(&["kafka.Requests"]));
    assert_eq!(errors.outputs(), &names(&["kafka.Errors"]));
}
