//! Behavior of the three-phase analysis pipeline: rewrites, folding,
//! advisory warnings, and schema-driven narrowing.

use xpath_expr::context::{ContextItemStaticInfo, StaticContext, StaticContextBuilder};
use xpath_expr::error::ErrorCode;
use xpath_expr::expr::{
    Axis, AxisExpr, ContextItemExpr, EquivalenceExpr, Expr, ExprKind, InstanceOfExpr,
    RootExpr, SimpleStepExpr, SlashExpr, SubscriptExpr,
};
use xpath_expr::model::{ExpandedName, NodeKind};
use xpath_expr::simple_node::SimpleNode;
use xpath_expr::types::{
    AtomicType, Cardinality, ContentModelTable, ItemType, Multiplicity, NodeTest,
    SequenceType,
};
use xpath_expr::xdm::{AtomicValue, Value};
use xpath_expr::analyze;

use std::sync::Arc;

fn int_literal(n: i64) -> Expr<SimpleNode> {
    Expr::literal(Value::one(AtomicValue::Integer(n)))
}

fn name(s: &str) -> ExpandedName {
    ExpandedName::local_only(s)
}

/// library -> shelf* -> book{0,2} -> title{1,1}; library -> catalog*.
fn library_schema() -> ContentModelTable {
    let mut t = ContentModelTable::new();
    t.declare(name("library"), name("shelf"), Multiplicity::new(0, None));
    t.declare(name("library"), name("catalog"), Multiplicity::new(0, None));
    t.declare(name("shelf"), name("book"), Multiplicity::new(0, Some(2)));
    t.declare(name("book"), name("title"), Multiplicity::new(1, Some(1)));
    t
}

fn schema_context() -> StaticContext {
    StaticContextBuilder::new()
        .with_schema(Arc::new(library_schema()))
        .build()
}

fn element_info(local: &str) -> ContextItemStaticInfo {
    ContextItemStaticInfo::new(ItemType::element(local))
}

#[test]
fn context_absent_makes_focus_expressions_static_errors() {
    let sc = StaticContext::default();
    let expr: Expr<SimpleNode> = ContextItemExpr::default().into_expr();
    let err = analyze(expr, &sc, &ContextItemStaticInfo::absent()).unwrap_err();
    assert_eq!(err.code, ErrorCode::XPDY0002);
    assert!(err.is_static_error());
}

#[test]
fn axis_step_over_atomic_context_is_a_type_error() {
    let sc = StaticContext::default();
    let step: Expr<SimpleNode> =
        AxisExpr::new(Axis::Child, NodeTest::AnyKind).into_expr();
    let info = ContextItemStaticInfo::new(ItemType::Atomic(AtomicType::String));
    let err = analyze(step, &sc, &info).unwrap_err();
    assert_eq!(err.code, ErrorCode::XPTY0020);
    assert!(err.is_type_error);
}

#[test]
fn dead_axis_kind_combination_folds_to_empty_with_a_warning() {
    let sc = StaticContext::default();
    // child axis can never deliver an attribute node
    let step: Expr<SimpleNode> =
        AxisExpr::new(Axis::Child, NodeTest::Kind(NodeKind::Attribute)).into_expr();
    let (out, warnings) = analyze(step, &sc, &element_info("a")).unwrap();
    assert_eq!(out.as_literal(), Some(&Value::Empty));
    assert_eq!(warnings.len(), 1);
}

#[test]
fn attribute_axis_from_a_text_origin_folds_to_empty() {
    let sc = StaticContext::default();
    let step: Expr<SimpleNode> =
        AxisExpr::new(Axis::Attribute, NodeTest::AnyKind).into_expr();
    let info = ContextItemStaticInfo::new(ItemType::Node(NodeTest::Kind(NodeKind::Text)));
    let (out, warnings) = analyze(step, &sc, &info).unwrap();
    assert_eq!(out.as_literal(), Some(&Value::Empty));
    assert_eq!(warnings.len(), 1);
}

#[test]
fn axis_over_unknown_context_gets_a_runtime_node_check() {
    let sc = StaticContext::default();
    let step: Expr<SimpleNode> =
        AxisExpr::new(Axis::Child, NodeTest::element("x")).into_expr();
    let (out, _) = analyze(step, &sc, &ContextItemStaticInfo::unknown()).unwrap();
    assert!(matches!(out.kind, ExprKind::ItemCheck(_)));
}

#[test]
fn root_rewrites_to_context_item_under_a_document_context() {
    let sc = StaticContext::default();
    let expr: Expr<SimpleNode> = RootExpr.into_expr();
    let info = ContextItemStaticInfo::new(ItemType::document_node());
    let (out, _) = analyze(expr, &sc, &info).unwrap();
    assert!(matches!(out.kind, ExprKind::ContextItem(_)));
}

#[test]
fn schema_bounds_child_step_cardinality() {
    let sc = schema_context();
    let step: Expr<SimpleNode> =
        AxisExpr::new(Axis::Child, NodeTest::element("book")).into_expr();
    let (out, warnings) = analyze(step, &sc, &element_info("shelf")).unwrap();
    assert!(warnings.is_empty());
    match &out.kind {
        ExprKind::Axis(a) => assert_eq!(a.known_max, Some(2)),
        other => panic!("expected an axis step, got {other:?}"),
    }
}

#[test]
fn subscript_within_schema_bound_is_zero_or_one() {
    let sc = schema_context();
    let step = AxisExpr::new(Axis::Child, NodeTest::element("book")).into_expr();
    let expr: Expr<SimpleNode> = SubscriptExpr::new(step, int_literal(2)).into_expr();
    let (out, warnings) = analyze(expr, &sc, &element_info("shelf")).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(out.cardinality(), Cardinality::ZeroOrOne);
    assert!(matches!(out.kind, ExprKind::Subscript(_)));
}

#[test]
fn subscript_beyond_schema_bound_folds_to_empty() {
    let sc = schema_context();
    let step = AxisExpr::new(Axis::Child, NodeTest::element("book")).into_expr();
    let expr: Expr<SimpleNode> = SubscriptExpr::new(step, int_literal(3)).into_expr();
    let (out, warnings) = analyze(expr, &sc, &element_info("shelf")).unwrap();
    assert_eq!(out.as_literal(), Some(&Value::Empty));
    assert_eq!(warnings.len(), 1);
}

#[test]
fn unique_child_collapses_to_a_bounded_step() {
    let sc = schema_context();
    let step: Expr<SimpleNode> =
        AxisExpr::new(Axis::Child, NodeTest::element("title")).into_expr();
    let (out, _) = analyze(step, &sc, &element_info("book")).unwrap();
    assert_eq!(out.cardinality(), Cardinality::ZeroOrOne);
    // The bound rests on the schema's word alone, so the enforcing wrapper
    // must survive the whole pipeline.
    match &out.kind {
        ExprKind::FirstItem(f) => assert!(matches!(f.base.kind, ExprKind::Axis(_))),
        other => panic!("expected a first-item wrapper, got {other:?}"),
    }
    let (again, _) = analyze(out.clone(), &sc, &element_info("book")).unwrap();
    assert_eq!(out, again);
}

#[test]
fn impossible_child_folds_to_empty() {
    let sc = schema_context();
    let step: Expr<SimpleNode> =
        AxisExpr::new(Axis::Child, NodeTest::element("title")).into_expr();
    let (out, warnings) = analyze(step, &sc, &element_info("shelf")).unwrap();
    assert_eq!(out.as_literal(), Some(&Value::Empty));
    assert_eq!(warnings.len(), 1);
}

#[test]
fn descendant_step_decomposes_along_the_content_model() {
    let sc = schema_context();
    let step: Expr<SimpleNode> =
        AxisExpr::new(Axis::Descendant, NodeTest::element("book")).into_expr();
    let (out, _) = analyze(step, &sc, &element_info("library")).unwrap();
    match &out.kind {
        ExprKind::Slash(s) => {
            match &s.lhs.kind {
                ExprKind::Axis(a) => {
                    assert_eq!(a.axis, Axis::Child);
                    assert_eq!(
                        a.test,
                        NodeTest::OneOf {
                            kind: NodeKind::Element,
                            names: vec![name("shelf")],
                        }
                    );
                }
                other => panic!("expected a child step on the left, got {other:?}"),
            }
            match &s.rhs.kind {
                ExprKind::Axis(a) => assert_eq!(a.axis, Axis::DescendantOrSelf),
                other => panic!("expected a descendant-or-self step, got {other:?}"),
            }
        }
        other => panic!("expected decomposition into a path, got {other:?}"),
    }
}

#[test]
fn analysis_is_idempotent() {
    let sc = schema_context();
    let info = element_info("shelf");
    let step = AxisExpr::new(Axis::Child, NodeTest::element("book")).into_expr();
    let expr: Expr<SimpleNode> = SubscriptExpr::new(step, int_literal(2)).into_expr();
    let (once, _) = analyze(expr, &sc, &info).unwrap();
    let (twice, warnings) = analyze(once.clone(), &sc, &info).unwrap();
    assert_eq!(once, twice);
    assert!(warnings.is_empty());
}

#[test]
fn forward_step_below_a_singleton_origin_becomes_a_simple_step() {
    let sc = StaticContext::default();
    let slash: Expr<SimpleNode> = SlashExpr::new(
        ContextItemExpr::default().into_expr(),
        AxisExpr::new(Axis::Child, NodeTest::element("x")).into_expr(),
    )
    .into_expr();
    let info = ContextItemStaticInfo::new(ItemType::element("root"));
    let (out, _) = analyze(slash, &sc, &info).unwrap();
    assert!(matches!(out.kind, ExprKind::SimpleStep(_)));
}

#[test]
fn simple_step_demotes_when_its_step_is_not_an_axis() {
    let sc = StaticContext::default();
    let expr: Expr<SimpleNode> = SimpleStepExpr::new(
        ContextItemExpr::default().into_expr(),
        ContextItemExpr::default().into_expr(),
    )
    .into_expr();
    let info = ContextItemStaticInfo::new(ItemType::element("root"));
    let (out, _) = analyze(expr, &sc, &info).unwrap();
    assert!(matches!(out.kind, ExprKind::Slash(_)));
}

#[test]
fn simple_step_with_an_unproven_origin_gets_a_cardinality_check() {
    let sc = StaticContext::default();
    let expr: Expr<SimpleNode> = SimpleStepExpr::new(
        AxisExpr::new(Axis::Child, NodeTest::element("shelf")).into_expr(),
        AxisExpr::new(Axis::Child, NodeTest::element("book")).into_expr(),
    )
    .into_expr();
    let info = ContextItemStaticInfo::new(ItemType::element("library"));
    let (out, _) = analyze(expr, &sc, &info).unwrap();
    match &out.kind {
        ExprKind::SimpleStep(s) => {
            assert!(matches!(s.start.kind, ExprKind::CardinalityCheck(_)));
        }
        other => panic!("expected a simple step, got {other:?}"),
    }
}

#[test]
fn reverse_step_below_a_singleton_origin_gets_a_reverse_wrapper() {
    let sc = StaticContext::default();
    let slash: Expr<SimpleNode> = SlashExpr::new(
        ContextItemExpr::default().into_expr(),
        AxisExpr::new(Axis::Ancestor, NodeTest::AnyKind).into_expr(),
    )
    .into_expr();
    let info = ContextItemStaticInfo::new(ItemType::element("leaf"));
    let (out, _) = analyze(slash, &sc, &info).unwrap();
    match &out.kind {
        ExprKind::Slash(s) => assert!(matches!(s.rhs.kind, ExprKind::Reverse(_))),
        other => panic!("expected a path, got {other:?}"),
    }
}

#[test]
fn instance_of_decided_statically_when_types_settle_it() {
    let sc = StaticContext::default();
    let info = ContextItemStaticInfo::unknown();

    // integer literal instance of xs:decimal? -> provably true
    let yes: Expr<SimpleNode> = InstanceOfExpr::new(
        int_literal(5),
        SequenceType::optional(ItemType::Atomic(AtomicType::Decimal)),
    )
    .into_expr();
    let (out, _) = analyze(yes, &sc, &info).unwrap();
    assert_eq!(
        out.as_literal(),
        Some(&Value::one(AtomicValue::Boolean(true)))
    );

    // integer literal instance of xs:string -> provably false
    let no: Expr<SimpleNode> = InstanceOfExpr::new(
        int_literal(5),
        SequenceType::single(ItemType::Atomic(AtomicType::String)),
    )
    .into_expr();
    let (out, _) = analyze(no, &sc, &info).unwrap();
    assert_eq!(
        out.as_literal(),
        Some(&Value::one(AtomicValue::Boolean(false)))
    );
}

#[test]
fn incomparable_equivalence_folds_to_false_with_a_warning() {
    let sc = StaticContext::default();
    let expr: Expr<SimpleNode> = EquivalenceExpr::new(
        int_literal(1),
        Expr::literal(Value::one(AtomicValue::Boolean(true))),
    )
    .into_expr();
    let (out, warnings) = analyze(expr, &sc, &ContextItemStaticInfo::unknown()).unwrap();
    assert_eq!(
        out.as_literal(),
        Some(&Value::one(AtomicValue::Boolean(false)))
    );
    assert_eq!(warnings.len(), 1);
}

#[test]
fn equivalence_of_constants_folds() {
    let sc = StaticContext::default();
    let expr: Expr<SimpleNode> =
        EquivalenceExpr::new(int_literal(3), int_literal(3)).into_expr();
    let (out, _) = analyze(expr, &sc, &ContextItemStaticInfo::unknown()).unwrap();
    assert_eq!(
        out.as_literal(),
        Some(&Value::one(AtomicValue::Boolean(true)))
    );
}

#[test]
fn literal_equality_respects_type_annotations() {
    let a: Expr<SimpleNode> = Expr::literal(Value::one(AtomicValue::Integer(3)));
    let b: Expr<SimpleNode> = Expr::literal(Value::one(AtomicValue::Short(3)));
    assert_ne!(a, b);
    let e1: Expr<SimpleNode> = Expr::empty();
    let e2: Expr<SimpleNode> = Expr::empty();
    assert_eq!(e1, e2);
}

#[test]
fn explain_renders_the_rewritten_tree() {
    let sc = schema_context();
    let step = AxisExpr::new(Axis::Child, NodeTest::element("book")).into_expr();
    let expr: Expr<SimpleNode> = SubscriptExpr::new(step, int_literal(2)).into_expr();
    let (out, _) = analyze(expr, &sc, &element_info("shelf")).unwrap();
    let rendered = out.explain().to_string();
    assert!(rendered.contains("subscript"));
    assert!(rendered.contains("known-max"));
}

#[test]
fn provably_empty_literals_report_nothing_type() {
    let e: Expr<SimpleNode> = Expr::empty();
    assert_eq!(e.item_type(), ItemType::Nothing);
    assert_eq!(e.cardinality(), Cardinality::Empty);
}
