//! Run-time type and cardinality checks.
//!
//! Type checking inserts these wrappers when a constraint cannot be proved
//! or refuted statically. They are transparent for order and peerness, they
//! disappear again in later phases when a rewrite makes them redundant, and
//! they fail item by item so a lazy consumer only pays for what it pulls.

use crate::context::{ContextItemStaticInfo, DynamicContext, ExpressionVisitor};
use crate::error::{Error, ErrorCode, Location};
use crate::expr::{Expr, ExprKind};
use crate::iter::{BoxIter, SequenceIter};
use crate::model::XdmNode;
use crate::types::{Cardinality, ItemType, Relationship};
use crate::xdm::Item;
use core::fmt;

/// What an [`ItemCheckExpr`] inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckSubject {
    /// Every item the operand delivers.
    Result,
    /// The context item, once, before the operand runs.
    ContextItem,
}

impl fmt::Display for CheckSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CheckSubject::Result => "result",
            CheckSubject::ContextItem => "context-item",
        })
    }
}

/// Assert an item type at run time.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemCheckExpr<N: XdmNode> {
    pub operand: Box<Expr<N>>,
    pub required: ItemType,
    pub subject: CheckSubject,
}

impl<N: XdmNode> ItemCheckExpr<N> {
    pub fn new(operand: Expr<N>, required: ItemType, subject: CheckSubject) -> Self {
        Self {
            operand: Box::new(operand),
            required,
            subject,
        }
    }

    pub fn into_expr(self) -> Expr<N> {
        Expr::new(ExprKind::ItemCheck(self))
    }

    /// Drop the wrapper when the operand's static type already proves it.
    fn reduce(self, visitor: &ExpressionVisitor<'_>, loc: Location) -> Result<Expr<N>, Error> {
        if self.subject == CheckSubject::Result {
            let operand_type = self.operand.item_type();
            let relation = visitor
                .type_hierarchy()
                .relationship(&operand_type, &self.required);
            match relation {
                Relationship::Same | Relationship::SubsumedBy => return Ok(*self.operand),
                Relationship::Disjoint
                    if operand_type != ItemType::Nothing
                        && !self.operand.cardinality().allows_zero() =>
                {
                    return Err(Error::type_err(
                        ErrorCode::XPTY0004,
                        format!(
                            "required item type is {}, supplied type {operand_type} can never match",
                            self.required
                        ),
                    )
                    .with_location(loc));
                }
                _ => {}
            }
        }
        Ok(self.into_expr().at(loc))
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
        self.reduce(visitor, loc)
    }

    pub(super) fn optimize(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.operand = Box::new(self.operand.optimize(visitor, context_info)?);
        self.reduce(visitor, loc)
    }

    pub(super) fn iterate<'a>(
        &'a self,
        ctx: &DynamicContext<N>,
        loc: Location,
    ) -> Result<BoxIter<'a, N>, Error> {
        match self.subject {
            CheckSubject::ContextItem => {
                let item = ctx
                    .require_context_item()
                    .map_err(|e| e.maybe_with_location(loc))?;
                if !self.required.matches_item(item) {
                    return Err(Error::dynamic_type(
                        ErrorCode::XPTY0020,
                        format!("the context item is not a {}", self.required),
                    )
                    .with_location(loc));
                }
                self.operand.iterate(ctx)
            }
            CheckSubject::Result => Ok(Box::new(ItemCheckIter {
                input: self.operand.iterate(ctx)?,
                required: &self.required,
                loc,
            })),
        }
    }
}

struct ItemCheckIter<'a, N: XdmNode> {
    input: BoxIter<'a, N>,
    required: &'a ItemType,
    loc: Location,
}

impl<'a, N: XdmNode> SequenceIter<N> for ItemCheckIter<'a, N> {
    fn next_item(&mut self) -> Result<Option<Item<N>>, Error> {
        match self.input.next_item()? {
            Some(item) => {
                if self.required.matches_item(&item) {
                    Ok(Some(item))
                } else {
                    self.input.close();
                    Err(Error::dynamic_type(
                        ErrorCode::XPTY0004,
                        format!("an item does not match the required type {}", self.required),
                    )
                    .with_location(self.loc))
                }
            }
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.input.close();
    }
}

/// Assert a cardinality at run time.
#[derive(Debug, Clone, PartialEq)]
pub struct CardinalityCheckExpr<N: XdmNode> {
    pub operand: Box<Expr<N>>,
    pub required: Cardinality,
}

impl<N: XdmNode> CardinalityCheckExpr<N> {
    pub fn new(operand: Expr<N>, required: Cardinality) -> Self {
        Self {
            operand: Box::new(operand),
            required,
        }
    }

    pub fn into_expr(self) -> Expr<N> {
        Expr::new(ExprKind::CardinalityCheck(self))
    }

    fn reduce(self, loc: Location) -> Result<Expr<N>, Error> {
        let supplied = self.operand.cardinality();
        if self.required.subsumes(supplied) {
            return Ok(*self.operand);
        }
        if supplied == Cardinality::Empty && !self.required.allows_zero() {
            return Err(Error::type_err(
                ErrorCode::XPTY0004,
                "an empty sequence is supplied where a non-empty one is required",
            )
            .with_location(loc));
        }
        Ok(self.into_expr().at(loc))
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
        self.reduce(loc)
    }

    pub(super) fn optimize(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.operand = Box::new(self.operand.optimize(visitor, context_info)?);
        self.reduce(loc)
    }

    pub(super) fn iterate<'a>(
        &'a self,
        ctx: &DynamicContext<N>,
        loc: Location,
    ) -> Result<BoxIter<'a, N>, Error> {
        Ok(Box::new(CardinalityCheckIter {
            input: self.operand.iterate(ctx)?,
            required: self.required,
            seen: 0,
            done: false,
            loc,
        }))
    }
}

struct CardinalityCheckIter<'a, N: XdmNode> {
    input: BoxIter<'a, N>,
    required: Cardinality,
    seen: usize,
    done: bool,
    loc: Location,
}

impl<'a, N: XdmNode> SequenceIter<N> for CardinalityCheckIter<'a, N> {
    fn next_item(&mut self) -> Result<Option<Item<N>>, Error> {
        if self.done {
            return Ok(None);
        }
        match self.input.next_item()? {
            Some(item) => {
                self.seen += 1;
                if self.seen > 1 && !self.required.allows_many() {
                    self.input.close();
                    return Err(Error::dynamic_type(
                        ErrorCode::XPTY0004,
                        format!(
                            "more than one item is supplied where {} is required",
                            describe(self.required)
                        ),
                    )
                    .with_location(self.loc));
                }
                Ok(Some(item))
            }
            None => {
                self.done = true;
                if self.seen == 0 && !self.required.allows_zero() {
                    return Err(Error::dynamic_type(
                        ErrorCode::XPTY0004,
                        format!(
                            "an empty sequence is supplied where {} is required",
                            describe(self.required)
                        ),
                    )
                    .with_location(self.loc));
                }
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        self.input.close();
    }
}

fn describe(c: Cardinality) -> &'static str {
    match c {
        Cardinality::Empty => "an empty sequence",
        Cardinality::ExactlyOne => "exactly one item",
        Cardinality::ZeroOrOne => "at most one item",
        Cardinality::OneOrMore => "at least one item",
        Cardinality::ZeroOrMore => "any sequence",
    }
}
