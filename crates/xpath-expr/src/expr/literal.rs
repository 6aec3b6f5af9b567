//! Literal values as expressions.
//!
//! A literal is the fixed point of all three analysis phases and the target
//! of every constant-folding rewrite. Equality of literal expressions is
//! equality of their values: type annotations participate, so an integer 3
//! and a short 3 are different literals even though they compare equal as
//! numbers at run time.

use crate::context::ExpressionVisitor;
use crate::error::Location;
use crate::explain::ExplainNode;
use crate::expr::Expr;
use crate::model::XdmNode;
use crate::types::ItemType;
use crate::xdm::{Item, Value};

/// The item type of a literal, read off its value.
pub(super) fn literal_item_type<N: XdmNode>(value: &Value<N>) -> ItemType {
    let mut ty: Option<ItemType> = None;
    for item in value.items() {
        let t = match item {
            Item::Node(_) => ItemType::ANY_NODE,
            Item::Atomic(a) => ItemType::Atomic(a.type_label()),
        };
        match &ty {
            None => ty = Some(t),
            Some(prev) if *prev == t => {}
            Some(_) => return ItemType::AnyItem,
        }
    }
    ty.unwrap_or(ItemType::Nothing)
}

pub(super) fn explain_literal<N: XdmNode>(value: &Value<N>) -> ExplainNode {
    let node = ExplainNode::new("literal").attr("count", value.len());
    match value.items() {
        [] => node.attr("value", "()"),
        [Item::Atomic(a)] => node.attr("value", a).attr("type", a.type_label()),
        _ => node,
    }
}

/// Replace a subtree with the empty-sequence literal, recording an advisory
/// warning. Used when analysis proves a subtree can never select anything.
pub(super) fn fold_to_empty<N: XdmNode>(
    visitor: &mut ExpressionVisitor<'_>,
    loc: Location,
    reason: impl Into<String>,
) -> Expr<N> {
    visitor.warn(reason, loc);
    Expr::empty().at(loc)
}

/// A boolean literal, the result of folding a decidable predicate.
pub(super) fn boolean_literal<N: XdmNode>(b: bool, loc: Location) -> Expr<N> {
    Expr::literal(Value::boolean(b)).at(loc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simple_node::SimpleNode;
    use crate::types::AtomicType;
    use crate::xdm::AtomicValue;

    #[test]
    fn item_type_of_uniform_literal_is_precise() {
        let v: Value<SimpleNode> = Value::from_items(vec![
            Item::Atomic(AtomicValue::Integer(1)),
            Item::Atomic(AtomicValue::Integer(2)),
        ]);
        assert_eq!(literal_item_type(&v), ItemType::Atomic(AtomicType::Integer));
    }

    #[test]
    fn item_type_of_empty_literal_is_nothing() {
        let v: Value<SimpleNode> = Value::Empty;
        assert_eq!(literal_item_type(&v), ItemType::Nothing);
    }

    #[test]
    fn mixed_literal_widens_to_any_item() {
        let v: Value<SimpleNode> = Value::from_items(vec![
            Item::Atomic(AtomicValue::Integer(1)),
            Item::Atomic(AtomicValue::String("x".into())),
        ]);
        assert_eq!(literal_item_type(&v), ItemType::AnyItem);
    }
}
