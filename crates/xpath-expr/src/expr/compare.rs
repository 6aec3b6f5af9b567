//! Value predicates: equivalence, instance-of, castable-to-list.
//!
//! These all deliver exactly one boolean. Equivalence compares two optional
//! atomized values, treating two empty sequences as equal and values of
//! incomparable kinds as unequal rather than as an error. Instance-of tests
//! a sequence against a sequence type and stops pulling items as soon as the
//! answer is decided. Castable-to-list probes whether the tokens of a
//! string would all cast to a member type; failures are answers, not errors.

use crate::context::{Collation, ContextItemStaticInfo, DynamicContext, ExpressionVisitor};
use crate::error::{Error, Location};
use crate::expr::literal::boolean_literal;
use crate::expr::{Expr, ExprKind};
use crate::iter::{BoxIter, SingletonIter};
use crate::model::XdmNode;
use crate::types::{AtomicType, ItemType, Relationship, SequenceType};
use crate::xdm::{AtomicValue, Item, Value};

/// `a eqv b` over optional atomized operands.
#[derive(Debug, Clone, PartialEq)]
pub struct EquivalenceExpr<N: XdmNode> {
    pub lhs: Box<Expr<N>>,
    pub rhs: Box<Expr<N>>,
}

impl<N: XdmNode> EquivalenceExpr<N> {
    pub fn new(lhs: Expr<N>, rhs: Expr<N>) -> Self {
        Self {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn into_expr(self) -> Expr<N> {
        Expr::new(ExprKind::Equivalence(self))
    }

    pub(super) fn simplify(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.lhs = Box::new(self.lhs.simplify(visitor)?);
        self.rhs = Box::new(self.rhs.simplify(visitor)?);
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn type_check(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.lhs = Box::new(self.lhs.type_check(visitor, context_info)?);
        self.rhs = Box::new(self.rhs.type_check(visitor, context_info)?);

        if let (ItemType::Atomic(a), ItemType::Atomic(b)) =
            (self.lhs.item_type(), self.rhs.item_type())
        {
            if !a.comparison_class().comparable_with(b.comparison_class()) {
                let both_present = !self.lhs.cardinality().allows_zero()
                    && !self.rhs.cardinality().allows_zero();
                if both_present {
                    visitor.warn(
                        format!("values of type {a} and {b} can never compare equal"),
                        loc,
                    );
                    return Ok(boolean_literal(false, loc));
                }
                visitor.warn(
                    format!(
                        "values of type {a} and {b} only compare equal when both are absent"
                    ),
                    loc,
                );
            }
        }
        Ok(self.into_expr().at(loc))
    }

    fn try_fold(&self, ctx_free: bool, loc: Location) -> Option<Expr<N>> {
        if !ctx_free {
            return None;
        }
        let l = self.lhs.as_literal()?;
        let r = self.rhs.as_literal()?;
        let collation = crate::context::CodepointCollation;
        let result = equivalent_values(l, r, &collation).ok()?;
        Some(boolean_literal(result, loc))
    }

    pub(super) fn optimize(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.lhs = Box::new(self.lhs.optimize(visitor, context_info)?);
        self.rhs = Box::new(self.rhs.optimize(visitor, context_info)?);
        // Folding uses the codepoint collation, so only fold when the
        // static context did not install another default.
        let codepoint = visitor.static_context().default_collation.uri()
            == crate::context::CODEPOINT_URI;
        if let Some(folded) = self.try_fold(codepoint, loc) {
            return Ok(folded);
        }
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn iterate<'a>(
        &'a self,
        ctx: &DynamicContext<N>,
        loc: Location,
    ) -> Result<BoxIter<'a, N>, Error> {
        let l = self.lhs.evaluate(ctx)?;
        let r = self.rhs.evaluate(ctx)?;
        let result = equivalent_values(&l, &r, ctx.collation.as_ref())
            .map_err(|e| e.maybe_with_location(loc))?;
        Ok(Box::new(SingletonIter::new(Some(Item::Atomic(
            AtomicValue::Boolean(result),
        )))))
    }
}

fn equivalent_values<N: XdmNode>(
    l: &Value<N>,
    r: &Value<N>,
    collation: &dyn Collation,
) -> Result<bool, Error> {
    let l = l.as_optional_item()?;
    let r = r.as_optional_item()?;
    match (l, r) {
        (None, None) => Ok(true),
        (None, Some(_)) | (Some(_), None) => Ok(false),
        (Some(a), Some(b)) => Ok(atomic_equivalent(&a.atomize(), &b.atomize(), collation)),
    }
}

/// Equality within a comparability class; values of incomparable kinds are
/// simply unequal.
fn atomic_equivalent(a: &AtomicValue, b: &AtomicValue, collation: &dyn Collation) -> bool {
    use crate::types::ComparisonClass as Class;
    let (ca, cb) = (
        a.type_label().comparison_class(),
        b.type_label().comparison_class(),
    );
    if !ca.comparable_with(cb) {
        return false;
    }
    let class = if ca == Class::Any { cb } else { ca };
    match class {
        Class::Numeric => match (a.as_double(), b.as_double()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        Class::Stringlike => collation.equal(&a.string_value(), &b.string_value()),
        Class::Boolean => matches!(
            (a, b),
            (AtomicValue::Boolean(x), AtomicValue::Boolean(y)) if x == y
        ),
        Class::QName => match (a.as_qname(), b.as_qname()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        Class::Any => false,
    }
}

/// `operand instance of target`.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceOfExpr<N: XdmNode> {
    pub operand: Box<Expr<N>>,
    pub target: SequenceType,
}

impl<N: XdmNode> InstanceOfExpr<N> {
    pub fn new(operand: Expr<N>, target: SequenceType) -> Self {
        Self {
            operand: Box::new(operand),
            target,
        }
    }

    pub fn into_expr(self) -> Expr<N> {
        Expr::new(ExprKind::InstanceOf(self))
    }

    /// Decide the test statically, when the operand's static type settles it
    /// either way.
    fn static_decision(&self, visitor: &ExpressionVisitor<'_>) -> Option<bool> {
        let operand_card = self.operand.cardinality();
        let operand_type = self.operand.item_type();
        if operand_type == ItemType::Nothing {
            return Some(self.target.cardinality.allows_zero());
        }
        let relation = visitor
            .type_hierarchy()
            .relationship(&operand_type, &self.target.item_type);
        match relation {
            Relationship::Same | Relationship::SubsumedBy => self
                .target
                .cardinality
                .subsumes(operand_card)
                .then_some(true),
            Relationship::Disjoint => {
                // A provably non-empty operand of a disjoint type can never
                // satisfy the test.
                (!operand_card.allows_zero()).then_some(false)
            }
            Relationship::Subsumes | Relationship::Overlaps => None,
        }
    }

    pub(super) fn simplify(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.operand = Box::new(self.operand.simplify(visitor)?);
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn type_check(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.operand = Box::new(self.operand.type_check(visitor, context_info)?);
        if let Some(decided) = self.static_decision(visitor) {
            return Ok(boolean_literal(decided, loc));
        }
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn optimize(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.operand = Box::new(self.operand.optimize(visitor, context_info)?);
        if let Some(decided) = self.static_decision(visitor) {
            return Ok(boolean_literal(decided, loc));
        }
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn iterate<'a>(
        &'a self,
        ctx: &DynamicContext<N>,
        _loc: Location,
    ) -> Result<BoxIter<'a, N>, Error> {
        let mut input = self.operand.iterate(ctx)?;
        let mut count = 0usize;
        let verdict = loop {
            match input.next_item() {
                Ok(Some(item)) => {
                    count += 1;
                    // Stop pulling as soon as either the type or the length
                    // constraint is violated.
                    if !self.target.item_type.matches_item(&item) {
                        input.close();
                        break false;
                    }
                    if count > 1 && !self.target.cardinality.allows_many() {
                        input.close();
                        break false;
                    }
                }
                Ok(None) => break self.target.cardinality.admits(count),
                Err(e) => {
                    input.close();
                    return Err(e);
                }
            }
        };
        Ok(Box::new(SingletonIter::new(Some(Item::Atomic(
            AtomicValue::Boolean(verdict),
        )))))
    }
}

/// `operand castable as` a whitespace-separated list of a member type.
#[derive(Debug, Clone, PartialEq)]
pub struct CastableToListExpr<N: XdmNode> {
    pub operand: Box<Expr<N>>,
    pub member_type: AtomicType,
    /// Whether the empty sequence (and the empty list) count as castable.
    pub allows_empty: bool,
}

impl<N: XdmNode> CastableToListExpr<N> {
    pub fn new(operand: Expr<N>, member_type: AtomicType, allows_empty: bool) -> Self {
        Self {
            operand: Box::new(operand),
            member_type,
            allows_empty,
        }
    }

    pub fn into_expr(self) -> Expr<N> {
        Expr::new(ExprKind::CastableToList(self))
    }

    fn decide_value(&self, value: &Value<N>) -> Result<bool, Error> {
        let Some(item) = value.as_optional_item()? else {
            return Ok(self.allows_empty);
        };
        let lexical = item.atomize().string_value();
        let mut tokens = lexical.split_whitespace().peekable();
        if tokens.peek().is_none() {
            return Ok(self.allows_empty);
        }
        Ok(tokens.all(|t| self.member_type.accepts_lexical(t)))
    }

    pub(super) fn simplify(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.operand = Box::new(self.operand.simplify(visitor)?);
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn type_check(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.operand = Box::new(self.operand.type_check(visitor, context_info)?);
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn optimize(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.operand = Box::new(self.operand.optimize(visitor, context_info)?);
        if let Some(v) = self.operand.as_literal() {
            if let Ok(decided) = self.decide_value(v) {
                return Ok(boolean_literal(decided, loc));
            }
        }
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn iterate<'a>(
        &'a self,
        ctx: &DynamicContext<N>,
        loc: Location,
    ) -> Result<BoxIter<'a, N>, Error> {
        let value = self.operand.evaluate(ctx)?;
        let result = self
            .decide_value(&value)
            .map_err(|e| e.maybe_with_location(loc))?;
        Ok(Box::new(SingletonIter::new(Some(Item::Atomic(
            AtomicValue::Boolean(result),
        )))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CodepointCollation;
    use crate::simple_node::SimpleNode;

    fn val(items: Vec<AtomicValue>) -> Value<SimpleNode> {
        Value::from_items(items.into_iter().map(Item::Atomic).collect())
    }

    #[test]
    fn both_empty_operands_are_equivalent() {
        let c = CodepointCollation;
        assert!(equivalent_values::<SimpleNode>(&Value::Empty, &Value::Empty, &c).unwrap());
        assert!(
            !equivalent_values(&Value::Empty, &val(vec![AtomicValue::Integer(1)]), &c)
                .unwrap()
        );
    }

    #[test]
    fn numeric_equivalence_crosses_subtypes() {
        let c = CodepointCollation;
        assert!(atomic_equivalent(
            &AtomicValue::Integer(3),
            &AtomicValue::Double(3.0),
            &c
        ));
        assert!(!atomic_equivalent(
            &AtomicValue::Integer(3),
            &AtomicValue::String("3".into()),
            &c
        ));
    }

    #[test]
    fn untyped_compares_as_string() {
        let c = CodepointCollation;
        assert!(atomic_equivalent(
            &AtomicValue::UntypedAtomic("abc".into()),
            &AtomicValue::String("abc".into()),
            &c
        ));
    }
}
