//! Path composition and focus-shaped wrappers.
//!
//! [`SlashExpr`] is the `/` operator: the right side is evaluated once per
//! item of the left side with a fresh focus, and a node-valued result comes
//! out in document order without duplicates. [`SimpleStepExpr`] is its
//! singleton-origin specialization. [`FirstItemExpr`],
//! [`SubscriptExpr`] and [`ReverseExpr`] are wrappers the optimizer inserts
//! or rewrites; they also serve as the compiled form of simple positional
//! predicates.

use crate::context::{ContextItemStaticInfo, DynamicContext, ExpressionVisitor};
use crate::error::{Error, ErrorCode, Location};
use crate::expr::{CardinalityCheckExpr, Expr, ExprKind, SpecialProperties};
use crate::iter::{BoxIter, FirstMatchIter, ItemsIter, ReverseIter, SingletonIter};
use crate::model::{NodeKind, XdmNode};
use crate::types::{Cardinality, ItemType, Relationship};
use crate::xdm::{AtomicValue, Item};
use core::cmp::Ordering;

/// The `.` expression: the context item itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextItemExpr {
    /// Filled in during type checking from the static context-item info.
    pub static_type: ItemType,
}

impl Default for ContextItemExpr {
    fn default() -> Self {
        Self {
            static_type: ItemType::AnyItem,
        }
    }
}

impl ContextItemExpr {
    pub fn into_expr<N: XdmNode>(self) -> Expr<N> {
        Expr::new(ExprKind::ContextItem(self))
    }

    pub(super) fn type_check<N: XdmNode>(
        mut self,
        _visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        if context_info.absent {
            return Err(Error::static_err(
                ErrorCode::XPDY0002,
                "'.' is used where no context item is defined",
            )
            .with_location(loc));
        }
        self.static_type = context_info.item_type.clone();
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn iterate<'a, N: XdmNode>(
        &'a self,
        ctx: &DynamicContext<N>,
        loc: Location,
    ) -> Result<BoxIter<'a, N>, Error> {
        let item = ctx
            .require_context_item()
            .map_err(|e| e.maybe_with_location(loc))?;
        Ok(Box::new(SingletonIter::new(Some(item.clone()))))
    }
}

/// The leading `/` of an absolute path: the document root of the context
/// node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RootExpr;

impl RootExpr {
    pub fn into_expr<N: XdmNode>(self) -> Expr<N> {
        Expr::new(ExprKind::Root(self))
    }

    pub(super) fn type_check<N: XdmNode>(
        self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        if context_info.absent {
            return Err(Error::static_err(
                ErrorCode::XPDY0002,
                "'/' is used where no context item is defined",
            )
            .with_location(loc));
        }
        // When the context item is already known to be the document node,
        // '/' is the context item.
        let relation = visitor
            .type_hierarchy()
            .relationship(&context_info.item_type, &ItemType::document_node());
        if matches!(relation, Relationship::Same | Relationship::SubsumedBy) {
            let ci = ContextItemExpr {
                static_type: context_info.item_type.clone(),
            };
            return Ok(ci.into_expr().at(loc));
        }
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn iterate<'a, N: XdmNode>(
        &'a self,
        ctx: &DynamicContext<N>,
        loc: Location,
    ) -> Result<BoxIter<'a, N>, Error> {
        let node = ctx
            .require_context_node()
            .map_err(|e| e.maybe_with_location(loc))?;
        let root = node.document_root();
        if root.kind() != NodeKind::Document {
            return Err(Error::dynamic(
                ErrorCode::XPDY0050,
                "the root of the tree containing the context item is not a document node",
            )
            .with_location(loc));
        }
        Ok(Box::new(SingletonIter::new(Some(Item::Node(root)))))
    }
}

/// The `/` operator.
#[derive(Debug, Clone, PartialEq)]
pub struct SlashExpr<N: XdmNode> {
    pub lhs: Box<Expr<N>>,
    pub rhs: Box<Expr<N>>,
}

impl<N: XdmNode> SlashExpr<N> {
    pub fn new(lhs: Expr<N>, rhs: Expr<N>) -> Self {
        Self {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn into_expr(self) -> Expr<N> {
        Expr::new(ExprKind::Slash(self))
    }

    pub(super) fn simplify(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.lhs = Box::new(self.lhs.simplify(visitor)?);
        self.rhs = Box::new(self.rhs.simplify(visitor)?);
        if self.lhs.as_literal().is_some_and(|v| v.is_empty()) {
            return Ok(Expr::empty().at(loc));
        }
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn type_check(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.lhs = Box::new(self.lhs.type_check(visitor, context_info)?);
        let lhs_type = self.lhs.item_type();
        let relation = visitor
            .type_hierarchy()
            .relationship(&lhs_type, &ItemType::ANY_NODE);
        if relation == Relationship::Disjoint && lhs_type != ItemType::Nothing {
            return Err(Error::type_err(
                ErrorCode::XPTY0019,
                format!("the left side of '/' has item type {lhs_type}, which is not a node type"),
            )
            .with_location(loc));
        }
        let step_info = ContextItemStaticInfo::new(lhs_type);
        self.rhs = Box::new(self.rhs.type_check(visitor, &step_info)?);
        if self.lhs.as_literal().is_some_and(|v| v.is_empty())
            || self.rhs.as_literal().is_some_and(|v| v.is_empty())
        {
            return Ok(Expr::empty().at(loc));
        }
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn optimize(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.lhs = Box::new(self.lhs.optimize(visitor, context_info)?);
        let step_info = ContextItemStaticInfo::new(self.lhs.item_type());
        self.rhs = Box::new(self.rhs.optimize(visitor, &step_info)?);

        if !self.lhs.cardinality().allows_many() {
            // A reverse-ordered step below a singleton origin only needs
            // reversing to come out in document order; no sort, no dedup.
            if self.rhs.cardinality().allows_many()
                && self
                    .rhs
                    .special_properties()
                    .contains(SpecialProperties::REVERSE_ORDERED)
            {
                let rhs_loc = self.rhs.loc;
                self.rhs = Box::new(
                    Expr::new(ExprKind::Reverse(ReverseExpr {
                        base: self.rhs,
                    }))
                    .at(rhs_loc),
                );
            } else if matches!(self.rhs.kind, ExprKind::Axis(_)) {
                // A plain forward step from a single origin needs neither
                // per-item focus bookkeeping nor the final sort.
                return Ok(SimpleStepExpr {
                    start: self.lhs,
                    step: self.rhs,
                }
                .into_expr()
                .at(loc));
            }
        }
        Ok(self.into_expr().at(loc))
    }

    /// Result order is already document order without the final sort pass.
    fn presorted(&self) -> bool {
        let rhs = self.rhs.special_properties();
        if !rhs.contains(SpecialProperties::ORDERED_NODESET) {
            return false;
        }
        if !self.lhs.cardinality().allows_many() {
            return true;
        }
        self.lhs
            .special_properties()
            .contains(SpecialProperties::ORDERED_NODESET)
            && rhs.contains(
                SpecialProperties::PEER_NODESET | SpecialProperties::SUBTREE_NODESET,
            )
    }

    pub(super) fn special_properties(&self) -> SpecialProperties {
        let lhs = self.lhs.special_properties();
        let rhs = self.rhs.special_properties();
        // The evaluator sorts whenever it cannot prove order, so the result
        // is ordered either way.
        let mut props = SpecialProperties::ORDERED_NODESET;
        if lhs.contains(SpecialProperties::SUBTREE_NODESET)
            && rhs.contains(SpecialProperties::SUBTREE_NODESET)
        {
            props |= SpecialProperties::SUBTREE_NODESET;
            if lhs.contains(SpecialProperties::PEER_NODESET)
                && rhs.contains(SpecialProperties::PEER_NODESET)
            {
                props |= SpecialProperties::PEER_NODESET;
            }
        }
        if rhs.contains(SpecialProperties::ATTRIBUTE_NODESET) {
            props |= SpecialProperties::ATTRIBUTE_NODESET;
        }
        if lhs.contains(SpecialProperties::CONTEXT_DOCUMENT)
            && rhs.contains(SpecialProperties::CONTEXT_DOCUMENT)
        {
            props |= SpecialProperties::CONTEXT_DOCUMENT;
        }
        props
    }

    pub(super) fn iterate<'a>(
        &'a self,
        ctx: &DynamicContext<N>,
        loc: Location,
    ) -> Result<BoxIter<'a, N>, Error> {
        let origins = self.lhs.evaluate(ctx)?;
        let size = origins.len();
        let mut out: Vec<Item<N>> = Vec::new();
        for (i, item) in origins.items().iter().enumerate() {
            if !item.is_node() {
                return Err(Error::dynamic_type(
                    ErrorCode::XPTY0019,
                    "a path step was applied to an atomic value",
                )
                .with_location(loc));
            }
            let step_ctx = ctx.with_focus(item.clone(), i + 1, size);
            let value = self.rhs.evaluate(&step_ctx)?;
            out.extend(value.items().iter().cloned());
        }

        let node_count = out.iter().filter(|i| i.is_node()).count();
        if node_count == out.len() {
            if !self.presorted() {
                out = sort_and_dedupe(out, loc)?;
            }
        } else if node_count > 0 {
            return Err(Error::dynamic_type(
                ErrorCode::XPTY0018,
                "a path result mixes nodes and atomic values",
            )
            .with_location(loc));
        }
        Ok(Box::new(ItemsIter::new(out)))
    }
}

fn sort_and_dedupe<N: XdmNode>(
    items: Vec<Item<N>>,
    loc: Location,
) -> Result<Vec<Item<N>>, Error> {
    let mut nodes: Vec<N> = items
        .into_iter()
        .filter_map(|i| match i {
            Item::Node(n) => Some(n),
            Item::Atomic(_) => None,
        })
        .collect();
    let mut failure: Option<Error> = None;
    nodes.sort_by(|a, b| match a.compare_document_order(b) {
        Ok(o) => o,
        Err(e) => {
            failure.get_or_insert(e);
            Ordering::Equal
        }
    });
    if let Some(e) = failure {
        return Err(e.maybe_with_location(loc));
    }
    nodes.dedup();
    Ok(nodes.into_iter().map(Item::Node).collect())
}

/// A two-step path whose origin is statically at most one node and whose
/// step is a plain axis step. The origin is evaluated as a singleton and
/// the axis iterated from it directly; a forward axis from one origin is
/// already in document order, so no sort pass runs.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleStepExpr<N: XdmNode> {
    pub start: Box<Expr<N>>,
    pub step: Box<Expr<N>>,
}

impl<N: XdmNode> SimpleStepExpr<N> {
    pub fn new(start: Expr<N>, step: Expr<N>) -> Self {
        Self {
            start: Box::new(start),
            step: Box::new(step),
        }
    }

    pub fn into_expr(self) -> Expr<N> {
        Expr::new(ExprKind::SimpleStep(self))
    }

    /// The general path form of the same composition.
    fn demote(self, loc: Location) -> Expr<N> {
        Expr::new(ExprKind::Slash(SlashExpr {
            lhs: self.start,
            rhs: self.step,
        }))
        .at(loc)
    }

    pub(super) fn simplify(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.start = Box::new(self.start.simplify(visitor)?);
        self.step = Box::new(self.step.simplify(visitor)?);
        if self.start.as_literal().is_some_and(|v| v.is_empty()) {
            return Ok(Expr::empty().at(loc));
        }
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn type_check(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.start = Box::new(self.start.type_check(visitor, context_info)?);
        let start_type = self.start.item_type();
        let relation = visitor
            .type_hierarchy()
            .relationship(&start_type, &ItemType::ANY_NODE);
        if relation == Relationship::Disjoint && start_type != ItemType::Nothing {
            return Err(Error::type_err(
                ErrorCode::XPTY0019,
                format!(
                    "the origin of a path step has item type {start_type}, which is not a node type"
                ),
            )
            .with_location(loc));
        }
        // The origin is evaluated as a singleton; when the tree was built
        // directly rather than specialized out of a path, that is not yet
        // proven and becomes a run-time check.
        if self.start.cardinality().allows_many() {
            let start_loc = self.start.loc;
            self.start = Box::new(
                Expr::new(ExprKind::CardinalityCheck(CardinalityCheckExpr {
                    operand: self.start,
                    required: Cardinality::ZeroOrOne,
                }))
                .at(start_loc),
            );
        }
        let step_info = ContextItemStaticInfo::new(start_type);
        self.step = Box::new(self.step.type_check(visitor, &step_info)?);
        if self.start.as_literal().is_some_and(|v| v.is_empty())
            || self.step.as_literal().is_some_and(|v| v.is_empty())
        {
            return Ok(Expr::empty().at(loc));
        }
        // A rewrite may have replaced the plain axis step; the general form
        // handles whatever stands in its place now.
        if !matches!(self.step.kind, ExprKind::Axis(_)) {
            return Ok(self.demote(loc));
        }
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn optimize(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.start = Box::new(self.start.optimize(visitor, context_info)?);
        let step_info = ContextItemStaticInfo::new(self.start.item_type());
        self.step = Box::new(self.step.optimize(visitor, &step_info)?);
        if !matches!(self.step.kind, ExprKind::Axis(_)) {
            return Ok(self.demote(loc));
        }
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn special_properties(&self) -> SpecialProperties {
        let mut props = self.step.special_properties();
        if !self
            .start
            .special_properties()
            .contains(SpecialProperties::CONTEXT_DOCUMENT)
        {
            props -= SpecialProperties::CONTEXT_DOCUMENT;
        }
        props
    }

    pub(super) fn iterate<'a>(
        &'a self,
        ctx: &DynamicContext<N>,
        loc: Location,
    ) -> Result<BoxIter<'a, N>, Error> {
        let Some(origin) = self.start.evaluate_item(ctx)? else {
            return Ok(Box::new(SingletonIter::new(None)));
        };
        if !origin.is_node() {
            return Err(Error::dynamic_type(
                ErrorCode::XPTY0019,
                "a path step was applied to an atomic value",
            )
            .with_location(loc));
        }
        let step_ctx = ctx.with_focus(origin, 1, 1);
        self.step.iterate(&step_ctx)
    }
}

/// Keep only the first delivered item, closing the input early.
#[derive(Debug, Clone, PartialEq)]
pub struct FirstItemExpr<N: XdmNode> {
    pub base: Box<Expr<N>>,
}

impl<N: XdmNode> FirstItemExpr<N> {
    pub fn new(base: Expr<N>) -> Self {
        Self {
            base: Box::new(base),
        }
    }

    pub fn into_expr(self) -> Expr<N> {
        Expr::new(ExprKind::FirstItem(self))
    }

    pub(super) fn simplify(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.base = Box::new(self.base.simplify(visitor)?);
        if let Some(v) = self.base.as_literal() {
            let first = v.head().cloned();
            return Ok(Expr::literal(first.into_iter().collect()).at(loc));
        }
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn type_check(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.base = Box::new(self.base.type_check(visitor, context_info)?);
        // Re-checking the base may re-derive this very wrapper from the
        // schema; one layer is enough.
        if matches!(self.base.kind, ExprKind::FirstItem(_)) {
            return Ok(*self.base);
        }
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn optimize(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.base = Box::new(self.base.optimize(visitor, context_info)?);
        if !self.base.cardinality().allows_many() {
            return Ok(*self.base);
        }
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn iterate<'a>(
        &'a self,
        ctx: &DynamicContext<N>,
        _loc: Location,
    ) -> Result<BoxIter<'a, N>, Error> {
        Ok(Box::new(FirstMatchIter::new(self.base.iterate(ctx)?)))
    }
}

/// `base[n]` with a numeric subscript evaluated in the outer focus.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptExpr<N: XdmNode> {
    pub base: Box<Expr<N>>,
    pub subscript: Box<Expr<N>>,
}

impl<N: XdmNode> SubscriptExpr<N> {
    pub fn new(base: Expr<N>, subscript: Expr<N>) -> Self {
        Self {
            base: Box::new(base),
            subscript: Box::new(subscript),
        }
    }

    pub fn into_expr(self) -> Expr<N> {
        Expr::new(ExprKind::Subscript(self))
    }

    pub(super) fn simplify(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.base = Box::new(self.base.simplify(visitor)?);
        self.subscript = Box::new(self.subscript.simplify(visitor)?);
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn type_check(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.base = Box::new(self.base.type_check(visitor, context_info)?);
        self.subscript = Box::new(self.subscript.type_check(visitor, context_info)?);
        Ok(self.into_expr().at(loc))
    }

    /// The constant value of the subscript, when it folded to an integer.
    fn constant_subscript(&self) -> Option<i64> {
        match self.subscript.as_literal()?.items() {
            [Item::Atomic(a)] => {
                let d = a.as_double()?;
                (d.fract() == 0.0).then_some(d as i64)
            }
            _ => None,
        }
    }

    pub(super) fn optimize(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.base = Box::new(self.base.optimize(visitor, context_info)?);
        self.subscript = Box::new(self.subscript.optimize(visitor, context_info)?);
        if let Some(k) = self.constant_subscript() {
            if k < 1 {
                visitor.warn("a subscript below 1 selects nothing", loc);
                return Ok(Expr::empty().at(loc));
            }
            if let ExprKind::Axis(a) = &self.base.kind {
                if a.known_max.is_some_and(|max| (k as usize) > max) {
                    visitor.warn(
                        "the subscript exceeds the number of nodes the step can select",
                        loc,
                    );
                    return Ok(Expr::empty().at(loc));
                }
            }
            if k == 1 {
                return Ok(FirstItemExpr { base: self.base }.into_expr().at(loc));
            }
        }
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn iterate<'a>(
        &'a self,
        ctx: &DynamicContext<N>,
        loc: Location,
    ) -> Result<BoxIter<'a, N>, Error> {
        let Some(sub) = self.subscript.evaluate_item(ctx)? else {
            return Ok(Box::new(SingletonIter::new(None)));
        };
        let n = match sub.atomize() {
            a if a.is_numeric() => match a.as_double() {
                Some(d) if d.fract() == 0.0 => d as i64,
                _ => return Ok(Box::new(SingletonIter::new(None))),
            },
            AtomicValue::UntypedAtomic(s) => match s.trim().parse::<i64>() {
                Ok(n) => n,
                Err(_) => {
                    return Err(Error::dynamic(
                        ErrorCode::FORG0001,
                        format!("cannot use '{s}' as a numeric subscript"),
                    )
                    .with_location(loc));
                }
            },
            other => {
                return Err(Error::dynamic_type(
                    ErrorCode::XPTY0004,
                    format!("subscript must be numeric, found {}", other.type_label()),
                )
                .with_location(loc));
            }
        };
        if n < 1 {
            return Ok(Box::new(SingletonIter::new(None)));
        }
        let mut base = self.base.iterate(ctx)?;
        let mut remaining = n;
        loop {
            match base.next_item() {
                Ok(Some(item)) => {
                    remaining -= 1;
                    if remaining == 0 {
                        base.close();
                        return Ok(Box::new(SingletonIter::new(Some(item))));
                    }
                }
                Ok(None) => return Ok(Box::new(SingletonIter::new(None))),
                Err(e) => {
                    base.close();
                    return Err(e);
                }
            }
        }
    }
}

/// Reverses the delivered order of its operand. Wrapping a reverse-ordered
/// step turns it into an ordered one.
#[derive(Debug, Clone, PartialEq)]
pub struct ReverseExpr<N: XdmNode> {
    pub base: Box<Expr<N>>,
}

impl<N: XdmNode> ReverseExpr<N> {
    pub fn new(base: Expr<N>) -> Self {
        Self {
            base: Box::new(base),
        }
    }

    pub fn into_expr(self) -> Expr<N> {
        Expr::new(ExprKind::Reverse(self))
    }

    pub(super) fn simplify(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.base = Box::new(self.base.simplify(visitor)?);
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn type_check(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.base = Box::new(self.base.type_check(visitor, context_info)?);
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn optimize(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.base = Box::new(self.base.optimize(visitor, context_info)?);
        if !self.base.cardinality().allows_many() {
            return Ok(*self.base);
        }
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn iterate<'a>(
        &'a self,
        ctx: &DynamicContext<N>,
        _loc: Location,
    ) -> Result<BoxIter<'a, N>, Error> {
        Ok(Box::new(ReverseIter::new(self.base.iterate(ctx)?)))
    }
}
