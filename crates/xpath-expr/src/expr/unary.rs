//! Unary minus.
//!
//! Negation atomizes its operand, accepts an empty sequence (yielding
//! empty), and preserves the numeric subtype of its input: negating an
//! integer gives an integer, negating a float gives a float. Untyped input
//! is cast to double first.

use crate::context::{ContextItemStaticInfo, DynamicContext, ExpressionVisitor};
use crate::error::{Error, ErrorCode, Location};
use crate::expr::{Expr, ExprKind};
use crate::iter::{BoxIter, SingletonIter};
use crate::model::XdmNode;
use crate::types::{AtomicType, ItemType};
use crate::xdm::{AtomicValue, Item, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct NegateExpr<N: XdmNode> {
    pub operand: Box<Expr<N>>,
}

impl<N: XdmNode> NegateExpr<N> {
    pub fn new(operand: Expr<N>) -> Self {
        Self {
            operand: Box::new(operand),
        }
    }

    pub fn into_expr(self) -> Expr<N> {
        Expr::new(ExprKind::Negate(self))
    }

    fn try_fold(&self, loc: Location) -> Option<Expr<N>> {
        let v = self.operand.as_literal()?;
        match v.items() {
            [] => Some(Expr::empty().at(loc)),
            [Item::Atomic(a)] => match negate_atomic(a) {
                // Folding never turns a run-time error into an analysis
                // error; a failing negation stays in the tree.
                Ok(n) => Some(Expr::literal(Value::one(n)).at(loc)),
                Err(_) => None,
            },
            _ => None,
        }
    }

    pub(super) fn simplify(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.operand = Box::new(self.operand.simplify(visitor)?);
        if let Some(folded) = self.try_fold(loc) {
            return Ok(folded);
        }
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn type_check(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.operand = Box::new(self.operand.type_check(visitor, context_info)?);
        if let ItemType::Atomic(t) = self.operand.item_type() {
            let acceptable = t.is_numeric()
                || matches!(t, AtomicType::UntypedAtomic | AtomicType::AnyAtomic);
            if !acceptable {
                return Err(Error::type_err(
                    ErrorCode::XPTY0004,
                    format!("cannot apply unary minus to a value of type {t}"),
                )
                .with_location(loc));
            }
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
        if let Some(folded) = self.try_fold(loc) {
            return Ok(folded);
        }
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn iterate<'a>(
        &'a self,
        ctx: &DynamicContext<N>,
        loc: Location,
    ) -> Result<BoxIter<'a, N>, Error> {
        let Some(item) = self.operand.evaluate_item(ctx)? else {
            return Ok(Box::new(SingletonIter::new(None)));
        };
        let negated =
            negate_atomic(&item.atomize()).map_err(|e| e.maybe_with_location(loc))?;
        Ok(Box::new(SingletonIter::new(Some(Item::Atomic(negated)))))
    }
}

/// Negate an atomic value, preserving its numeric subtype.
fn negate_atomic(a: &AtomicValue) -> Result<AtomicValue, Error> {
    use AtomicValue::*;
    let overflow = || {
        Error::dynamic(
            ErrorCode::FOAR0002,
            "numeric overflow when negating the value",
        )
    };
    match a {
        Integer(i) => i.checked_neg().map(Integer).ok_or_else(overflow),
        Long(i) => i.checked_neg().map(Long).ok_or_else(overflow),
        Int(i) => i.checked_neg().map(Int).ok_or_else(overflow),
        Short(i) => i.checked_neg().map(Short).ok_or_else(overflow),
        Byte(i) => i.checked_neg().map(Byte).ok_or_else(overflow),
        Decimal(d) => Ok(Decimal(-d)),
        Double(d) => Ok(Double(-d)),
        Float(f) => Ok(Float(-f)),
        UntypedAtomic(s) => {
            let d: f64 = s.trim().parse().map_err(|_| {
                Error::dynamic(
                    ErrorCode::FORG0001,
                    format!("cannot cast '{s}' to a number"),
                )
            })?;
            Ok(Double(-d))
        }
        other => Err(Error::dynamic_type(
            ErrorCode::XPTY0004,
            format!(
                "cannot apply unary minus to a value of type {}",
                other.type_label()
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negation_preserves_the_subtype() {
        assert_eq!(
            negate_atomic(&AtomicValue::Short(3)).unwrap(),
            AtomicValue::Short(-3)
        );
        assert_eq!(
            negate_atomic(&AtomicValue::Double(1.5)).unwrap(),
            AtomicValue::Double(-1.5)
        );
    }

    #[test]
    fn negation_overflow_is_reported() {
        let err = negate_atomic(&AtomicValue::Byte(i8::MIN)).unwrap_err();
        assert_eq!(err.code, ErrorCode::FOAR0002);
    }

    #[test]
    fn untyped_input_goes_through_a_double_cast() {
        assert_eq!(
            negate_atomic(&AtomicValue::UntypedAtomic(" 4 ".into())).unwrap(),
            AtomicValue::Double(-4.0)
        );
        let err = negate_atomic(&AtomicValue::UntypedAtomic("four".into())).unwrap_err();
        assert_eq!(err.code, ErrorCode::FORG0001);
    }
}
