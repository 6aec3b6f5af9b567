//! The expression tree and its analysis/evaluation surface.
//!
//! An [`Expr`] is one node of the tree produced by an external parser. It
//! goes through three analysis phases, each of which consumes the node and
//! returns a possibly different one:
//!
//! 1. [`Expr::simplify`] performs context-free cleanup and obvious constant
//!    folding.
//! 2. [`Expr::type_check`] proves or refutes type constraints against the
//!    static context, inserting run-time check wrappers where a constraint
//!    can only be decided with actual values.
//! 3. [`Expr::optimize`] rewrites for cost, never for meaning.
//!
//! After analysis a tree is immutable and may be evaluated against any
//! number of dynamic contexts, in pull mode ([`Expr::iterate`]), as a
//! materialized value ([`Expr::evaluate`]), as a single optional item
//! ([`Expr::evaluate_item`]), or in push mode ([`Expr::process`]).

mod axis;
mod binding;
mod check;
mod compare;
mod literal;
mod path;
mod try_catch;
mod unary;

pub use axis::{Axis, AxisExpr};
pub use binding::{BindingRefExpr, LocalRefExpr};
pub use check::{CardinalityCheckExpr, CheckSubject, ItemCheckExpr};
pub use compare::{CastableToListExpr, EquivalenceExpr, InstanceOfExpr};
pub use path::{
    ContextItemExpr, FirstItemExpr, ReverseExpr, RootExpr, SimpleStepExpr, SlashExpr,
    SubscriptExpr,
};
pub use try_catch::{CatchClause, QNameTest, TryCatchExpr};
pub use unary::NegateExpr;

use crate::context::{
    ContextItemStaticInfo, DynamicContext, ExpressionVisitor, Receiver, StaticContext,
};
use crate::error::{Error, Location, Warning};
use crate::explain::ExplainNode;
use crate::iter::{BoxIter, ValueIter, materialize};
use crate::model::XdmNode;
use crate::types::{Cardinality, ItemType, SequenceType};
use crate::xdm::{Item, Value};
use smallvec::SmallVec;

bitflags::bitflags! {
    /// Parts of the dynamic context an expression reads. Computed bottom-up
    /// on demand; a subtree with no focus dependencies can be lifted out of
    /// a loop or evaluated without any focus at all.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Dependencies: u8 {
        const CONTEXT_ITEM = 1;
        const POSITION = 1 << 1;
        const LAST = 1 << 2;
        const LOCAL_VARIABLES = 1 << 3;
        const COMPONENT_BINDINGS = 1 << 4;
        const CAUGHT_ERROR = 1 << 5;

        const FOCUS = Self::CONTEXT_ITEM.bits()
            | Self::POSITION.bits()
            | Self::LAST.bits();
    }
}

bitflags::bitflags! {
    /// Statically proven facts about a node-valued result, used to skip
    /// sorting and deduplication on path composition.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SpecialProperties: u8 {
        /// Delivered in document order, duplicate-free.
        const ORDERED_NODESET = 1;
        /// Delivered in reverse document order, duplicate-free.
        const REVERSE_ORDERED = 1 << 1;
        /// No delivered node is an ancestor of another.
        const PEER_NODESET = 1 << 2;
        /// Every delivered node lies in the subtree of the origin node.
        const SUBTREE_NODESET = 1 << 3;
        /// Only attribute or namespace nodes are delivered.
        const ATTRIBUTE_NODESET = 1 << 4;
        /// All delivered nodes come from the document of the context node.
        const CONTEXT_DOCUMENT = 1 << 5;
    }
}

/// How an operand's results relate to the focus of its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandRole {
    /// Evaluated with the same focus as the parent.
    SameFocus,
    /// Evaluated once per item of a sibling operand; its focus dependencies
    /// are satisfied by the parent and do not propagate outward.
    FocusControlled,
    /// Inspected statically, never evaluated by the parent directly.
    Inspection,
}

/// A child edge of the expression tree.
pub struct Operand<'a, N: XdmNode> {
    pub child: &'a Expr<N>,
    pub role: OperandRole,
}

impl<'a, N: XdmNode> Operand<'a, N> {
    pub fn new(child: &'a Expr<N>, role: OperandRole) -> Self {
        Self { child, role }
    }
}

pub type Operands<'a, N> = SmallVec<[Operand<'a, N>; 2]>;

/// The closed set of expression forms.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind<N: XdmNode> {
    Literal(Value<N>),
    ContextItem(ContextItemExpr),
    Root(RootExpr),
    Axis(AxisExpr),
    Slash(SlashExpr<N>),
    SimpleStep(SimpleStepExpr<N>),
    FirstItem(FirstItemExpr<N>),
    Subscript(SubscriptExpr<N>),
    Reverse(ReverseExpr<N>),
    Negate(NegateExpr<N>),
    Equivalence(EquivalenceExpr<N>),
    InstanceOf(InstanceOfExpr<N>),
    CastableToList(CastableToListExpr<N>),
    ItemCheck(ItemCheckExpr<N>),
    CardinalityCheck(CardinalityCheckExpr<N>),
    TryCatch(TryCatchExpr<N>),
    BindingRef(BindingRefExpr),
    LocalRef(LocalRefExpr),
}

/// One node of the expression tree: a form plus a source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr<N: XdmNode> {
    pub kind: ExprKind<N>,
    pub loc: Location,
}

impl<N: XdmNode> Expr<N> {
    pub fn new(kind: ExprKind<N>) -> Self {
        Self {
            kind,
            loc: Location::UNKNOWN,
        }
    }

    #[must_use]
    pub fn at(mut self, loc: Location) -> Self {
        self.loc = loc;
        self
    }

    pub fn literal(value: Value<N>) -> Self {
        Self::new(ExprKind::Literal(value))
    }

    /// The canonical provably-empty expression.
    pub fn empty() -> Self {
        Self::literal(Value::Empty)
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Literal(_))
    }

    pub fn as_literal(&self) -> Option<&Value<N>> {
        match &self.kind {
            ExprKind::Literal(v) => Some(v),
            _ => None,
        }
    }

    /// The child edges of this node, with their focus roles.
    pub fn operands(&self) -> Operands<'_, N> {
        use ExprKind::*;
        let mut ops = Operands::new();
        match &self.kind {
            Literal(_) | ContextItem(_) | Root(_) | Axis(_) | BindingRef(_)
            | LocalRef(_) => {}
            Slash(s) => {
                ops.push(Operand::new(&s.lhs, OperandRole::SameFocus));
                ops.push(Operand::new(&s.rhs, OperandRole::FocusControlled));
            }
            SimpleStep(s) => {
                ops.push(Operand::new(&s.start, OperandRole::SameFocus));
                ops.push(Operand::new(&s.step, OperandRole::FocusControlled));
            }
            FirstItem(f) => ops.push(Operand::new(&f.base, OperandRole::SameFocus)),
            Subscript(s) => {
                ops.push(Operand::new(&s.base, OperandRole::SameFocus));
                ops.push(Operand::new(&s.subscript, OperandRole::SameFocus));
            }
            Reverse(r) => ops.push(Operand::new(&r.base, OperandRole::SameFocus)),
            Negate(n) => ops.push(Operand::new(&n.operand, OperandRole::SameFocus)),
            Equivalence(e) => {
                ops.push(Operand::new(&e.lhs, OperandRole::SameFocus));
                ops.push(Operand::new(&e.rhs, OperandRole::SameFocus));
            }
            InstanceOf(i) => ops.push(Operand::new(&i.operand, OperandRole::SameFocus)),
            CastableToList(c) => {
                ops.push(Operand::new(&c.operand, OperandRole::SameFocus));
            }
            ItemCheck(c) => ops.push(Operand::new(&c.operand, OperandRole::SameFocus)),
            CardinalityCheck(c) => {
                ops.push(Operand::new(&c.operand, OperandRole::SameFocus));
            }
            TryCatch(t) => {
                ops.push(Operand::new(&t.try_expr, OperandRole::SameFocus));
                for clause in &t.clauses {
                    ops.push(Operand::new(&clause.body, OperandRole::SameFocus));
                }
            }
        }
        ops
    }

    // ----- analysis phases ------------------------------------------------

    /// Phase 1: context-free cleanup.
    pub fn simplify(self, visitor: &mut ExpressionVisitor<'_>) -> Result<Self, Error> {
        let loc = self.loc;
        let out = match self.kind {
            ExprKind::Slash(e) => e.simplify(visitor, loc)?,
            ExprKind::SimpleStep(e) => e.simplify(visitor, loc)?,
            ExprKind::FirstItem(e) => e.simplify(visitor, loc)?,
            ExprKind::Subscript(e) => e.simplify(visitor, loc)?,
            ExprKind::Reverse(e) => e.simplify(visitor, loc)?,
            ExprKind::Negate(e) => e.simplify(visitor, loc)?,
            ExprKind::Equivalence(e) => e.simplify(visitor, loc)?,
            ExprKind::InstanceOf(e) => e.simplify(visitor, loc)?,
            ExprKind::CastableToList(e) => e.simplify(visitor, loc)?,
            ExprKind::ItemCheck(e) => e.simplify(visitor, loc)?,
            ExprKind::CardinalityCheck(e) => e.simplify(visitor, loc)?,
            ExprKind::TryCatch(e) => e.simplify(visitor, loc)?,
            kind => Expr { kind, loc },
        };
        Ok(out)
    }

    /// Phase 2: static typing. Proven violations become errors, possible
    /// violations become run-time check wrappers, proven facts become
    /// rewrites.
    pub fn type_check(
        self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
    ) -> Result<Self, Error> {
        let loc = self.loc;
        let out = match self.kind {
            ExprKind::ContextItem(e) => e.type_check(visitor, context_info, loc)?,
            ExprKind::Root(e) => e.type_check(visitor, context_info, loc)?,
            ExprKind::Axis(e) => e.type_check(visitor, context_info, loc)?,
            ExprKind::Slash(e) => e.type_check(visitor, context_info, loc)?,
            ExprKind::SimpleStep(e) => e.type_check(visitor, context_info, loc)?,
            ExprKind::FirstItem(e) => e.type_check(visitor, context_info, loc)?,
            ExprKind::Subscript(e) => e.type_check(visitor, context_info, loc)?,
            ExprKind::Reverse(e) => e.type_check(visitor, context_info, loc)?,
            ExprKind::Negate(e) => e.type_check(visitor, context_info, loc)?,
            ExprKind::Equivalence(e) => e.type_check(visitor, context_info, loc)?,
            ExprKind::InstanceOf(e) => e.type_check(visitor, context_info, loc)?,
            ExprKind::CastableToList(e) => e.type_check(visitor, context_info, loc)?,
            ExprKind::ItemCheck(e) => e.type_check(visitor, context_info, loc)?,
            ExprKind::CardinalityCheck(e) => e.type_check(visitor, context_info, loc)?,
            ExprKind::TryCatch(e) => e.type_check(visitor, context_info, loc)?,
            kind => Expr { kind, loc },
        };
        Ok(out)
    }

    /// Phase 3: cost rewrites and constant folding of closed subtrees.
    pub fn optimize(
        self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
    ) -> Result<Self, Error> {
        let loc = self.loc;
        let out = match self.kind {
            ExprKind::Slash(e) => e.optimize(visitor, context_info, loc)?,
            ExprKind::SimpleStep(e) => e.optimize(visitor, context_info, loc)?,
            ExprKind::FirstItem(e) => e.optimize(visitor, context_info, loc)?,
            ExprKind::Subscript(e) => e.optimize(visitor, context_info, loc)?,
            ExprKind::Reverse(e) => e.optimize(visitor, context_info, loc)?,
            ExprKind::Negate(e) => e.optimize(visitor, context_info, loc)?,
            ExprKind::Equivalence(e) => e.optimize(visitor, context_info, loc)?,
            ExprKind::InstanceOf(e) => e.optimize(visitor, context_info, loc)?,
            ExprKind::CastableToList(e) => e.optimize(visitor, context_info, loc)?,
            ExprKind::ItemCheck(e) => e.optimize(visitor, context_info, loc)?,
            ExprKind::CardinalityCheck(e) => e.optimize(visitor, context_info, loc)?,
            ExprKind::TryCatch(e) => e.optimize(visitor, context_info, loc)?,
            kind => Expr { kind, loc },
        };
        Ok(out)
    }

    // ----- static properties ----------------------------------------------

    /// Statically inferred bound on result length. Recomputed on each call
    /// from the current shape of the tree.
    pub fn cardinality(&self) -> Cardinality {
        use ExprKind::*;
        match &self.kind {
            Literal(v) => match v.len() {
                0 => Cardinality::Empty,
                1 => Cardinality::ExactlyOne,
                _ => Cardinality::OneOrMore,
            },
            ContextItem(_) | Root(_) => Cardinality::ExactlyOne,
            Axis(a) => a.cardinality(),
            Slash(s) => s.lhs.cardinality().product(s.rhs.cardinality()),
            SimpleStep(s) => s.start.cardinality().product(s.step.cardinality()),
            FirstItem(f) => {
                if f.base.cardinality().allows_zero() {
                    Cardinality::ZeroOrOne
                } else {
                    Cardinality::ExactlyOne
                }
            }
            Subscript(_) => Cardinality::ZeroOrOne,
            Reverse(r) => r.base.cardinality(),
            Negate(n) => {
                if n.operand.cardinality().allows_zero() {
                    Cardinality::ZeroOrOne
                } else {
                    Cardinality::ExactlyOne
                }
            }
            Equivalence(_) | InstanceOf(_) | CastableToList(_) => Cardinality::ExactlyOne,
            ItemCheck(c) => c.operand.cardinality(),
            CardinalityCheck(c) => c.required,
            TryCatch(t) => t
                .clauses
                .iter()
                .fold(t.try_expr.cardinality(), |acc, clause| {
                    acc.union(clause.body.cardinality())
                }),
            BindingRef(b) => b.static_cardinality(),
            LocalRef(l) => l.declared_type.cardinality,
        }
    }

    /// Statically inferred type of each result item.
    pub fn item_type(&self) -> ItemType {
        use ExprKind::*;
        match &self.kind {
            Literal(v) => literal::literal_item_type(v),
            ContextItem(c) => c.static_type.clone(),
            Root(_) => ItemType::document_node(),
            Axis(a) => a.item_type(),
            Slash(s) => s.rhs.item_type(),
            SimpleStep(s) => s.step.item_type(),
            FirstItem(f) => f.base.item_type(),
            Subscript(s) => s.base.item_type(),
            Reverse(r) => r.base.item_type(),
            Negate(_) => ItemType::Atomic(crate::types::AtomicType::Numeric),
            Equivalence(_) | InstanceOf(_) | CastableToList(_) => {
                ItemType::Atomic(crate::types::AtomicType::Boolean)
            }
            ItemCheck(c) => c.required.clone(),
            CardinalityCheck(c) => c.operand.item_type(),
            TryCatch(t) => {
                // The common supertype across branches; anything more precise
                // needs a lattice join this core does not carry.
                let first = t.try_expr.item_type();
                if t.clauses.iter().all(|c| c.body.item_type() == first) {
                    first
                } else {
                    ItemType::AnyItem
                }
            }
            BindingRef(b) => b.static_item_type(),
            LocalRef(l) => l.declared_type.item_type.clone(),
        }
    }

    pub fn static_type(&self) -> SequenceType {
        SequenceType::new(self.item_type(), self.cardinality())
    }

    /// Which parts of the dynamic context this subtree reads.
    pub fn dependencies(&self) -> Dependencies {
        use ExprKind::*;
        let own = match &self.kind {
            Literal(_) => Dependencies::empty(),
            ContextItem(_) | Root(_) | Axis(_) => Dependencies::CONTEXT_ITEM,
            BindingRef(_) => Dependencies::COMPONENT_BINDINGS,
            LocalRef(_) => Dependencies::LOCAL_VARIABLES,
            _ => Dependencies::empty(),
        };
        self.operands().iter().fold(own, |acc, op| {
            let child = op.child.dependencies();
            match op.role {
                OperandRole::FocusControlled => acc | (child - Dependencies::FOCUS),
                _ => acc | child,
            }
        })
    }

    /// Order/duplication facts about a node-valued result.
    pub fn special_properties(&self) -> SpecialProperties {
        use ExprKind::*;
        match &self.kind {
            Literal(v) => {
                if v.len() <= 1 {
                    SpecialProperties::ORDERED_NODESET
                        | SpecialProperties::REVERSE_ORDERED
                        | SpecialProperties::PEER_NODESET
                } else {
                    SpecialProperties::empty()
                }
            }
            ContextItem(_) | Root(_) => {
                SpecialProperties::ORDERED_NODESET
                    | SpecialProperties::REVERSE_ORDERED
                    | SpecialProperties::PEER_NODESET
                    | SpecialProperties::CONTEXT_DOCUMENT
            }
            Axis(a) => a.special_properties(),
            Slash(s) => s.special_properties(),
            SimpleStep(s) => s.special_properties(),
            FirstItem(f) => f.base.special_properties(),
            Subscript(s) => s.base.special_properties(),
            Reverse(r) => {
                let base = r.base.special_properties();
                let mut out = base
                    - SpecialProperties::ORDERED_NODESET
                    - SpecialProperties::REVERSE_ORDERED;
                if base.contains(SpecialProperties::REVERSE_ORDERED) {
                    out |= SpecialProperties::ORDERED_NODESET;
                }
                if base.contains(SpecialProperties::ORDERED_NODESET) {
                    out |= SpecialProperties::REVERSE_ORDERED;
                }
                out
            }
            ItemCheck(c) => c.operand.special_properties(),
            CardinalityCheck(c) => c.operand.special_properties(),
            _ => SpecialProperties::empty(),
        }
    }

    // ----- evaluation -----------------------------------------------------

    /// Pull-mode evaluation: a fresh iterator over the result sequence.
    pub fn iterate<'a>(
        &'a self,
        ctx: &DynamicContext<N>,
    ) -> Result<BoxIter<'a, N>, Error> {
        use ExprKind::*;
        let iter: BoxIter<'a, N> = match &self.kind {
            Literal(v) => Box::new(ValueIter::new(v.clone())),
            ContextItem(e) => e.iterate(ctx, self.loc)?,
            Root(e) => e.iterate(ctx, self.loc)?,
            Axis(e) => e.iterate(ctx, self.loc)?,
            Slash(e) => e.iterate(ctx, self.loc)?,
            SimpleStep(e) => e.iterate(ctx, self.loc)?,
            FirstItem(e) => e.iterate(ctx, self.loc)?,
            Subscript(e) => e.iterate(ctx, self.loc)?,
            Reverse(e) => e.iterate(ctx, self.loc)?,
            Negate(e) => e.iterate(ctx, self.loc)?,
            Equivalence(e) => e.iterate(ctx, self.loc)?,
            InstanceOf(e) => e.iterate(ctx, self.loc)?,
            CastableToList(e) => e.iterate(ctx, self.loc)?,
            ItemCheck(e) => e.iterate(ctx, self.loc)?,
            CardinalityCheck(e) => e.iterate(ctx, self.loc)?,
            TryCatch(e) => e.iterate(ctx, self.loc)?,
            BindingRef(e) => e.iterate(ctx, self.loc)?,
            LocalRef(e) => e.iterate(ctx, self.loc)?,
        };
        Ok(iter)
    }

    /// Materialize the whole result.
    pub fn evaluate(&self, ctx: &DynamicContext<N>) -> Result<Value<N>, Error> {
        materialize(self.iterate(ctx)?).map_err(|e| e.maybe_with_location(self.loc))
    }

    /// Evaluate an expression statically known to deliver at most one item.
    pub fn evaluate_item(&self, ctx: &DynamicContext<N>) -> Result<Option<Item<N>>, Error> {
        let value = self.evaluate(ctx)?;
        Ok(value.as_optional_item()?.cloned())
    }

    pub fn effective_boolean_value(&self, ctx: &DynamicContext<N>) -> Result<bool, Error> {
        self.evaluate(ctx)?
            .effective_boolean_value()
            .map_err(|e| e.maybe_with_location(self.loc))
    }

    /// Push-mode evaluation: forward every result item to the receiver.
    pub fn process(
        &self,
        ctx: &DynamicContext<N>,
        out: &mut dyn Receiver<N>,
    ) -> Result<(), Error> {
        let mut iter = self.iterate(ctx)?;
        loop {
            match iter.next_item() {
                Ok(Some(item)) => out.append(item)?,
                Ok(None) => break,
                Err(e) => {
                    iter.close();
                    return Err(e.maybe_with_location(self.loc));
                }
            }
        }
        out.close()
    }

    // ----- diagnostics ----------------------------------------------------

    /// Structured dump of the tree shape for diagnostics.
    pub fn explain(&self) -> ExplainNode {
        use ExprKind::*;
        match &self.kind {
            Literal(v) => literal::explain_literal(v),
            ContextItem(_) => ExplainNode::new("context-item"),
            Root(_) => ExplainNode::new("root"),
            Axis(a) => a.explain(),
            Slash(s) => ExplainNode::new("slash")
                .child(s.lhs.explain())
                .child(s.rhs.explain()),
            SimpleStep(s) => ExplainNode::new("simple-step")
                .child(s.start.explain())
                .child(s.step.explain()),
            FirstItem(f) => ExplainNode::new("first-item").child(f.base.explain()),
            Subscript(s) => ExplainNode::new("subscript")
                .child(s.base.explain())
                .child(s.subscript.explain()),
            Reverse(r) => ExplainNode::new("reverse").child(r.base.explain()),
            Negate(n) => ExplainNode::new("negate").child(n.operand.explain()),
            Equivalence(e) => ExplainNode::new("equivalent")
                .child(e.lhs.explain())
                .child(e.rhs.explain()),
            InstanceOf(i) => ExplainNode::new("instance-of")
                .attr("of", &i.target)
                .child(i.operand.explain()),
            CastableToList(c) => ExplainNode::new("castable-to-list")
                .attr("member", c.member_type)
                .child(c.operand.explain()),
            ItemCheck(c) => ExplainNode::new("item-check")
                .attr("required", &c.required)
                .attr("subject", c.subject)
                .child(c.operand.explain()),
            CardinalityCheck(c) => ExplainNode::new("cardinality-check")
                .attr("required", c.required.occurrence_indicator())
                .child(c.operand.explain()),
            TryCatch(t) => {
                let mut node = ExplainNode::new("try-catch").child(t.try_expr.explain());
                for clause in &t.clauses {
                    node = node.child(clause.explain());
                }
                node
            }
            BindingRef(b) => ExplainNode::new("binding-ref")
                .attr("slot", b.slot)
                .attr("name", &b.name),
            LocalRef(l) => ExplainNode::new("local-ref")
                .attr("slot", l.slot)
                .attr("name", &l.name),
        }
    }
}

/// Run the full analysis pipeline over a tree and hand back the rewritten
/// tree together with the advisory warnings raised along the way.
pub fn analyze<N: XdmNode>(
    expr: Expr<N>,
    static_context: &StaticContext,
    context_info: &ContextItemStaticInfo,
) -> Result<(Expr<N>, Vec<Warning>), Error> {
    let mut visitor = ExpressionVisitor::new(static_context);
    tracing::debug!(target: "xpath_expr::analysis", "analysis starting");
    let expr = expr.simplify(&mut visitor)?;
    let expr = expr.type_check(&mut visitor, context_info)?;
    let expr = expr.optimize(&mut visitor, context_info)?;
    tracing::debug!(
        target: "xpath_expr::analysis",
        warnings = visitor.warnings().len(),
        "analysis complete"
    );
    Ok((expr, visitor.take_warnings()))
}
