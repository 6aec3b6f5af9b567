//! Dynamic behavior: axis navigation, path composition, error handling,
//! and the agreement between pull and push evaluation.

use xpath_expr::analyze;
use xpath_expr::component::{BindingVector, Component, PackageId, SymbolicName};
use xpath_expr::context::{
    ContextItemStaticInfo, DynamicContext, DynamicContextBuilder, SequenceCollector,
    StaticContext, StaticContextBuilder,
};
use xpath_expr::error::ErrorCode;
use xpath_expr::expr::{
    Axis, AxisExpr, CastableToListExpr, CatchClause, ContextItemExpr, Expr,
    InstanceOfExpr, NegateExpr, QNameTest, RootExpr, SimpleStepExpr, SlashExpr,
    SubscriptExpr, TryCatchExpr,
};
use xpath_expr::model::{ExpandedName, XdmNode};
use xpath_expr::simple_node::{SimpleNode, doc, elem};
use xpath_expr::types::{
    AtomicType, Cardinality, ContentModelTable, ItemType, Multiplicity, NodeTest,
    SequenceType,
};
use xpath_expr::xdm::{AtomicValue, Item, Value};

use std::sync::Arc;

/// doc > library > (shelf > (book, book), shelf > book)
fn library() -> SimpleNode {
    doc()
        .child(
            elem("library")
                .child(
                    elem("shelf")
                        .child(elem("book").child_text("A"))
                        .child(elem("book").child_text("B")),
                )
                .child(elem("shelf").child(elem("book").child_text("C"))),
        )
        .build()
}

fn ctx_at(node: SimpleNode) -> DynamicContext<SimpleNode> {
    DynamicContextBuilder::new().with_context_node(node).build()
}

fn texts(value: &Value<SimpleNode>) -> Vec<String> {
    value.items().iter().map(Item::string_value).collect()
}

fn child_step(local: &str) -> Expr<SimpleNode> {
    AxisExpr::new(Axis::Child, NodeTest::element(local)).into_expr()
}

#[test]
fn path_composition_is_document_order_without_duplicates() {
    let root = library();
    let lib = root.children()[0].clone();
    let path = SlashExpr::new(child_step("shelf"), child_step("book")).into_expr();
    let value = path.evaluate(&ctx_at(lib)).unwrap();
    assert_eq!(texts(&value), ["A", "B", "C"]);
}

#[test]
fn path_over_atomic_origin_raises_a_type_error() {
    let path: Expr<SimpleNode> = SlashExpr::new(
        Expr::literal(Value::one(AtomicValue::Integer(1))),
        child_step("book"),
    )
    .into_expr();
    let err = path.evaluate(&DynamicContext::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::XPTY0019);
}

#[test]
fn simple_step_iterates_the_axis_from_a_single_origin() {
    let root = library();
    let lib = root.children()[0].clone();
    let shelf = lib.children()[0].clone();
    let expr: Expr<SimpleNode> = SimpleStepExpr::new(
        ContextItemExpr::default().into_expr(),
        child_step("book"),
    )
    .into_expr();
    let value = expr.evaluate(&ctx_at(shelf)).unwrap();
    assert_eq!(texts(&value), ["A", "B"]);

    let empty_start: Expr<SimpleNode> =
        SimpleStepExpr::new(Expr::empty(), child_step("book")).into_expr();
    assert!(empty_start.evaluate(&ctx_at(lib)).unwrap().is_empty());
}

#[test]
fn ancestors_come_nearest_first() {
    let root = library();
    let lib = root.children()[0].clone();
    let shelf = lib.children()[0].clone();
    let book = shelf.children()[0].clone();
    let step: Expr<SimpleNode> =
        AxisExpr::new(Axis::Ancestor, NodeTest::Kind(xpath_expr::NodeKind::Element))
            .into_expr();
    let value = step.evaluate(&ctx_at(book)).unwrap();
    let names: Vec<_> = value
        .items()
        .iter()
        .map(|i| match i {
            Item::Node(n) => n.name().unwrap().local,
            Item::Atomic(_) => unreachable!(),
        })
        .collect();
    assert_eq!(names, ["shelf", "library"]);
}

#[test]
fn root_step_finds_the_document() {
    let root = library();
    let lib = root.children()[0].clone();
    let shelf = lib.children()[0].clone();
    let expr: Expr<SimpleNode> = RootExpr.into_expr();
    let value = expr.evaluate(&ctx_at(shelf)).unwrap();
    assert_eq!(value, Value::one(Item::Node(root)));
}

#[test]
fn root_step_without_a_document_root_is_an_error() {
    let orphan = elem("standalone").child(elem("x")).build();
    let child = orphan.children()[0].clone();
    let expr: Expr<SimpleNode> = RootExpr.into_expr();
    let err = expr.evaluate(&ctx_at(child)).unwrap_err();
    assert_eq!(err.code, ErrorCode::XPDY0050);
}

#[test]
fn context_item_absent_is_xpdy0002() {
    let expr: Expr<SimpleNode> = ContextItemExpr::default().into_expr();
    let err = expr.evaluate(&DynamicContext::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::XPDY0002);
}

#[test]
fn subscript_selects_by_position() {
    let root = library();
    let lib = root.children()[0].clone();
    let shelf = lib.children()[0].clone();
    let expr: Expr<SimpleNode> = SubscriptExpr::new(
        child_step("book"),
        Expr::literal(Value::one(AtomicValue::Integer(2))),
    )
    .into_expr();
    let value = expr.evaluate(&ctx_at(shelf.clone())).unwrap();
    assert_eq!(texts(&value), ["B"]);

    let beyond: Expr<SimpleNode> = SubscriptExpr::new(
        child_step("book"),
        Expr::literal(Value::one(AtomicValue::Integer(9))),
    )
    .into_expr();
    assert!(beyond.evaluate(&ctx_at(shelf)).unwrap().is_empty());
}

#[test]
fn schema_bounded_child_step_caps_its_result_at_run_time() {
    let mut schema = ContentModelTable::new();
    schema.declare(
        ExpandedName::local_only("book"),
        ExpandedName::local_only("title"),
        Multiplicity::new(1, Some(1)),
    );
    let sc = StaticContextBuilder::new()
        .with_schema(Arc::new(schema))
        .build();
    let info = ContextItemStaticInfo::new(ItemType::element("book"));
    let (step, _) = analyze(child_step("title"), &sc, &info).unwrap();
    assert_eq!(step.cardinality(), Cardinality::ZeroOrOne);

    // The instance breaks the schema's promise of a single title; the
    // advertised cardinality must hold anyway.
    let rogue = elem("book")
        .child(elem("title").child_text("first"))
        .child(elem("title").child_text("second"))
        .build();
    let value = step.evaluate(&ctx_at(rogue)).unwrap();
    assert_eq!(texts(&value), ["first"]);
}

#[test]
fn simple_step_rejects_a_many_valued_origin_at_run_time() {
    let sc = StaticContext::default();
    let info = ContextItemStaticInfo::new(ItemType::element("library"));
    let expr: Expr<SimpleNode> =
        SimpleStepExpr::new(child_step("shelf"), child_step("book")).into_expr();
    let (analyzed, _) = analyze(expr, &sc, &info).unwrap();

    let root = library();
    let lib = root.children()[0].clone();
    let err = analyzed.evaluate(&ctx_at(lib)).unwrap_err();
    assert_eq!(err.code, ErrorCode::XPTY0004);
}

#[test]
fn subscript_accepts_untyped_numerals_and_rejects_others() {
    let root = library();
    let lib = root.children()[0].clone();
    let shelf = lib.children()[0].clone();
    let untyped: Expr<SimpleNode> = SubscriptExpr::new(
        child_step("book"),
        Expr::literal(Value::one(AtomicValue::UntypedAtomic("1".into()))),
    )
    .into_expr();
    assert_eq!(texts(&untyped.evaluate(&ctx_at(shelf.clone())).unwrap()), ["A"]);

    let bad: Expr<SimpleNode> = SubscriptExpr::new(
        child_step("book"),
        Expr::literal(Value::one(AtomicValue::UntypedAtomic("two".into()))),
    )
    .into_expr();
    assert_eq!(
        bad.evaluate(&ctx_at(shelf)).unwrap_err().code,
        ErrorCode::FORG0001
    );
}

#[test]
fn instance_of_stops_pulling_once_the_answer_is_known() {
    // Third item would fail its run-time item check; instance-of must
    // answer false from the first two items without touching it.
    let checked = xpath_expr::expr::ItemCheckExpr::new(
        Expr::literal(Value::from_items(vec![
            Item::Atomic(AtomicValue::Integer(1)),
            Item::Atomic(AtomicValue::Integer(2)),
            Item::Atomic(AtomicValue::String("boom".into())),
        ])),
        ItemType::Atomic(AtomicType::Integer),
        xpath_expr::expr::CheckSubject::Result,
    )
    .into_expr();
    let expr: Expr<SimpleNode> = InstanceOfExpr::new(
        checked,
        SequenceType::optional(ItemType::Atomic(AtomicType::Integer)),
    )
    .into_expr();
    let value = expr.evaluate(&DynamicContext::default()).unwrap();
    assert_eq!(value, Value::one(AtomicValue::Boolean(false)));
}

#[test]
fn instance_of_checks_every_item_type() {
    let expr: Expr<SimpleNode> = InstanceOfExpr::new(
        Expr::literal(Value::from_items(vec![
            Item::Atomic(AtomicValue::Integer(1)),
            Item::Atomic(AtomicValue::String("x".into())),
        ])),
        SequenceType::zero_or_more(ItemType::Atomic(AtomicType::Integer)),
    )
    .into_expr();
    let value = expr.evaluate(&DynamicContext::default()).unwrap();
    assert_eq!(value, Value::one(AtomicValue::Boolean(false)));
}

#[test]
fn castable_to_list_probes_tokens() {
    let yes: Expr<SimpleNode> = CastableToListExpr::new(
        Expr::literal(Value::one(AtomicValue::String("1 2 3".into()))),
        AtomicType::Integer,
        false,
    )
    .into_expr();
    assert_eq!(
        yes.evaluate(&DynamicContext::default()).unwrap(),
        Value::one(AtomicValue::Boolean(true))
    );

    let no: Expr<SimpleNode> = CastableToListExpr::new(
        Expr::literal(Value::one(AtomicValue::String("1 two 3".into()))),
        AtomicType::Integer,
        false,
    )
    .into_expr();
    assert_eq!(
        no.evaluate(&DynamicContext::default()).unwrap(),
        Value::one(AtomicValue::Boolean(false))
    );

    let empty: Expr<SimpleNode> = CastableToListExpr::new(
        Expr::literal(Value::Empty),
        AtomicType::Integer,
        true,
    )
    .into_expr();
    assert_eq!(
        empty.evaluate(&DynamicContext::default()).unwrap(),
        Value::one(AtomicValue::Boolean(true))
    );
}

fn failing_expr() -> Expr<SimpleNode> {
    // Unary minus over a string fails with a dynamic type error.
    NegateExpr::new(Expr::literal(Value::one(AtomicValue::String("x".into()))))
        .into_expr()
}

#[test]
fn try_catch_first_matching_clause_wins() {
    let expr: Expr<SimpleNode> = TryCatchExpr::new(
        failing_expr(),
        vec![
            CatchClause::new(
                vec![QNameTest::Name(ErrorCode::FORG0001.as_qname())],
                Expr::literal(Value::one(AtomicValue::String("wrong".into()))),
            ),
            CatchClause::catch_all(Expr::literal(Value::one(AtomicValue::String(
                "caught".into(),
            )))),
            CatchClause::new(
                vec![QNameTest::Name(ErrorCode::XPTY0004.as_qname())],
                Expr::literal(Value::one(AtomicValue::String("too-late".into()))),
            ),
        ],
    )
    .into_expr();
    let value = expr.evaluate(&DynamicContext::default()).unwrap();
    assert_eq!(texts(&value), ["caught"]);
}

#[test]
fn try_catch_rethrows_unmatched_errors() {
    let expr: Expr<SimpleNode> = TryCatchExpr::new(
        failing_expr(),
        vec![CatchClause::new(
            vec![QNameTest::Name(ErrorCode::FORG0001.as_qname())],
            Expr::empty(),
        )],
    )
    .into_expr();
    let err = expr.evaluate(&DynamicContext::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::XPTY0004);
}

fn global_failure_ref() -> (Expr<SimpleNode>, Arc<BindingVector<SimpleNode>>) {
    let name = ExpandedName::local_only("broken");
    let component = Component::variable(
        name.clone(),
        failing_expr(),
        PackageId::new("test-package"),
    );
    let mut bindings = BindingVector::new();
    let slot = bindings.bind(Arc::new(component), false);
    let reference = xpath_expr::expr::BindingRefExpr::new(
        slot,
        SymbolicName::variable(name),
    )
    .into_expr();
    (reference, Arc::new(bindings))
}

#[test]
fn global_variable_failure_bypasses_the_first_try_catch() {
    let (reference, bindings) = global_failure_ref();
    let ctx = DynamicContextBuilder::new().with_bindings(bindings).build();

    let inner: Expr<SimpleNode> =
        TryCatchExpr::new(reference, vec![CatchClause::catch_all(Expr::empty())])
            .into_expr();
    let err = inner.evaluate(&ctx).unwrap_err();
    assert_eq!(err.code, ErrorCode::XPTY0004);
    assert!(!err.global, "the first try/catch strips the global flag");

    // Once the flag is stripped, an enclosing try/catch may handle it.
    let outer: Expr<SimpleNode> = TryCatchExpr::new(
        inner,
        vec![CatchClause::catch_all(Expr::literal(Value::one(
            AtomicValue::String("recovered".into()),
        )))],
    )
    .into_expr();
    let value = outer.evaluate(&ctx).unwrap();
    assert_eq!(texts(&value), ["recovered"]);
}

#[test]
fn push_and_pull_modes_agree() {
    let root = library();
    let lib = root.children()[0].clone();
    let path = SlashExpr::new(child_step("shelf"), child_step("book")).into_expr();
    let ctx = ctx_at(lib);

    let pulled = path.evaluate(&ctx).unwrap();
    let mut collector = SequenceCollector::new();
    path.process(&ctx, &mut collector).unwrap();
    assert_eq!(collector.into_value(), pulled);
}

#[test]
fn effective_boolean_value_follows_the_sequence_rules() {
    let root = library();
    let lib = root.children()[0].clone();
    let some = child_step("shelf");
    assert!(some.effective_boolean_value(&ctx_at(lib.clone())).unwrap());
    let none = child_step("missing");
    assert!(!none.effective_boolean_value(&ctx_at(lib)).unwrap());
}

#[test]
fn evaluate_item_rejects_longer_sequences() {
    let root = library();
    let lib = root.children()[0].clone();
    let shelf = lib.children()[0].clone();
    let err = child_step("book").evaluate_item(&ctx_at(shelf)).unwrap_err();
    assert_eq!(err.code, ErrorCode::XPTY0004);
}
