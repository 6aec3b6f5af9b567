//! Axis steps.
//!
//! An axis step selects nodes reachable from the context node along one of
//! the thirteen XPath axes, filtered by a node test. The axis fixes the
//! topology of the result (direction, peerness, subtree containment), which
//! feeds the order/duplication properties the path optimizer relies on.
//!
//! Type checking of an axis step does most of the static work of this crate:
//! it proves the context is a node (or arranges a run-time check), folds
//! provably empty steps to the empty literal with an advisory warning, and
//! uses the schema content model to bound or decompose the step.

use crate::context::{ContextItemStaticInfo, DynamicContext, ExpressionVisitor};
use crate::error::{Error, ErrorCode, Location};
use crate::explain::ExplainNode;
use crate::expr::literal::fold_to_empty;
use crate::expr::{
    CheckSubject, Expr, ExprKind, ItemCheckExpr, SlashExpr, SpecialProperties,
};
use crate::iter::{BoxIter, ItemsIter};
use crate::model::{ExpandedName, NodeKind, XdmNode};
use crate::types::{Cardinality, ItemType, NodeTest, Relationship};
use crate::xdm::Item;

/// The thirteen XPath axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Attribute,
    Namespace,
    SelfAxis,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
}

impl Axis {
    pub fn name(&self) -> &'static str {
        use Axis::*;
        match self {
            Child => "child",
            Descendant => "descendant",
            DescendantOrSelf => "descendant-or-self",
            Attribute => "attribute",
            Namespace => "namespace",
            SelfAxis => "self",
            Parent => "parent",
            Ancestor => "ancestor",
            AncestorOrSelf => "ancestor-or-self",
            FollowingSibling => "following-sibling",
            PrecedingSibling => "preceding-sibling",
            Following => "following",
            Preceding => "preceding",
        }
    }

    /// Reverse axes deliver nearest-first, which is reverse document order.
    pub fn is_reverse(&self) -> bool {
        use Axis::*;
        matches!(
            self,
            Parent | Ancestor | AncestorOrSelf | PrecedingSibling | Preceding
        )
    }

    pub fn is_forward(&self) -> bool {
        !self.is_reverse()
    }

    /// No node delivered by a peer axis is an ancestor of another.
    pub fn is_peer(&self) -> bool {
        use Axis::*;
        matches!(
            self,
            Child | Attribute | Namespace | SelfAxis | Parent | FollowingSibling
                | PrecedingSibling
        )
    }

    /// Every node delivered lies within the subtree rooted at the origin.
    pub fn is_subtree(&self) -> bool {
        use Axis::*;
        matches!(
            self,
            SelfAxis | Child | Descendant | DescendantOrSelf | Attribute | Namespace
        )
    }

    /// Delivers at most one node regardless of the tree.
    pub fn at_most_one(&self) -> bool {
        matches!(self, Axis::SelfAxis | Axis::Parent)
    }

    /// The node kind selected by a name test on this axis when the test does
    /// not say otherwise.
    pub fn principal_node_kind(&self) -> NodeKind {
        match self {
            Axis::Attribute => NodeKind::Attribute,
            Axis::Namespace => NodeKind::Namespace,
            _ => NodeKind::Element,
        }
    }

    /// Can this axis deliver anything at all from an origin of this kind?
    pub fn yields_from(&self, origin: NodeKind) -> bool {
        match self {
            Axis::SelfAxis | Axis::DescendantOrSelf | Axis::AncestorOrSelf => true,
            Axis::Child | Axis::Descendant => {
                matches!(origin, NodeKind::Document | NodeKind::Element)
            }
            Axis::Attribute | Axis::Namespace => origin == NodeKind::Element,
            Axis::Parent | Axis::Ancestor => origin != NodeKind::Document,
            Axis::FollowingSibling | Axis::PrecedingSibling => !matches!(
                origin,
                NodeKind::Document | NodeKind::Attribute | NodeKind::Namespace
            ),
            Axis::Following | Axis::Preceding => origin != NodeKind::Document,
        }
    }

    /// Can this axis ever deliver a node of the given kind?
    pub fn delivers(&self, target: NodeKind) -> bool {
        let in_child_set = matches!(
            target,
            NodeKind::Element
                | NodeKind::Text
                | NodeKind::Comment
                | NodeKind::ProcessingInstruction
        );
        match self {
            Axis::SelfAxis | Axis::DescendantOrSelf | Axis::AncestorOrSelf => true,
            Axis::Child
            | Axis::Descendant
            | Axis::FollowingSibling
            | Axis::PrecedingSibling
            | Axis::Following
            | Axis::Preceding => in_child_set,
            Axis::Attribute => target == NodeKind::Attribute,
            Axis::Namespace => target == NodeKind::Namespace,
            Axis::Parent | Axis::Ancestor => {
                matches!(target, NodeKind::Document | NodeKind::Element)
            }
        }
    }
}

impl core::fmt::Display for Axis {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single axis step.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisExpr {
    pub axis: Axis,
    pub test: NodeTest,
    /// Upper bound on the result size proven by the content model, when the
    /// schema gave one.
    pub known_max: Option<usize>,
    /// Set on steps produced by schema-driven decomposition so they are not
    /// decomposed again.
    pub narrowed: bool,
}

impl AxisExpr {
    pub fn new(axis: Axis, test: NodeTest) -> Self {
        Self {
            axis,
            test,
            known_max: None,
            narrowed: false,
        }
    }

    pub fn into_expr<N: XdmNode>(self) -> Expr<N> {
        Expr::new(ExprKind::Axis(self))
    }

    pub(super) fn cardinality(&self) -> Cardinality {
        match self.known_max {
            Some(0) => Cardinality::Empty,
            Some(1) => Cardinality::ZeroOrOne,
            _ if self.axis.at_most_one() => Cardinality::ZeroOrOne,
            _ => Cardinality::ZeroOrMore,
        }
    }

    pub(super) fn item_type(&self) -> ItemType {
        ItemType::Node(self.test.clone())
    }

    pub(super) fn special_properties(&self) -> SpecialProperties {
        let mut props = SpecialProperties::CONTEXT_DOCUMENT;
        if self.axis.is_forward() || self.axis.at_most_one() {
            props |= SpecialProperties::ORDERED_NODESET;
        }
        if self.axis.is_reverse() {
            props |= SpecialProperties::REVERSE_ORDERED;
        }
        if self.axis.is_peer() {
            props |= SpecialProperties::PEER_NODESET;
        }
        if self.axis.is_subtree() {
            props |= SpecialProperties::SUBTREE_NODESET;
        }
        if matches!(self.axis, Axis::Attribute | Axis::Namespace) {
            props |= SpecialProperties::ATTRIBUTE_NODESET;
        }
        props
    }

    pub(super) fn type_check<N: XdmNode>(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        if context_info.absent {
            return Err(Error::static_err(
                ErrorCode::XPDY0002,
                format!("axis step {self} requires a context item, but none is defined"),
            )
            .with_location(loc));
        }

        let th = visitor.type_hierarchy();
        let relation = th.relationship(&context_info.item_type, &ItemType::ANY_NODE);
        let needs_node_check = match relation {
            Relationship::Disjoint => {
                return Err(Error::type_err(
                    ErrorCode::XPTY0020,
                    format!("the context item for {self} can never be a node"),
                )
                .with_location(loc));
            }
            Relationship::Same | Relationship::SubsumedBy => false,
            Relationship::Subsumes | Relationship::Overlaps => true,
        };

        // Combinations that are legal but can never select anything.
        let origin_kind = match &context_info.item_type {
            ItemType::Node(t) => t.node_kind(),
            _ => None,
        };
        if let Some(k) = origin_kind {
            if !self.axis.yields_from(k) {
                return Ok(fold_to_empty(
                    visitor,
                    loc,
                    format!("the {} axis starting at a {k} node selects nothing", self.axis),
                ));
            }
        }
        if let Some(target) = self.test.node_kind() {
            if !self.axis.delivers(target) {
                return Ok(fold_to_empty(
                    visitor,
                    loc,
                    format!("the {} axis will never select a {target} node", self.axis),
                ));
            }
        }

        // Content-model narrowing, when the schema knows the context element.
        if let (Some(schema), Some(parent)) =
            (visitor.schema(), context_info.item_type.element_name().cloned())
        {
            if self.axis == Axis::Child {
                if let Some(child) = named_element(&self.test).cloned() {
                    match schema.child_occurrence(&parent, &child) {
                        Some(m) if m.max == Some(0) => {
                            return Ok(fold_to_empty(
                                visitor,
                                loc,
                                format!("element {parent} has no {child} children"),
                            ));
                        }
                        Some(m) if m.max == Some(1) => {
                            // An instance may violate the schema's bound, so
                            // the wrapper enforces it at run time. The step
                            // keeps its general cardinality; a zero-or-one
                            // claim on the step itself would let a later
                            // phase unwrap the enforcement.
                            let step = self.into_expr().at(loc);
                            return Ok(Expr::new(ExprKind::FirstItem(
                                super::FirstItemExpr {
                                    base: Box::new(step),
                                },
                            ))
                            .at(loc));
                        }
                        Some(m) => {
                            self.known_max = m.max;
                        }
                        None => {
                            if let Some(permitted) = schema.permitted_children(&parent) {
                                if !permitted.contains(&child) {
                                    return Ok(fold_to_empty(
                                        visitor,
                                        loc,
                                        format!(
                                            "element {child} is not permitted as a child of {parent}"
                                        ),
                                    ));
                                }
                            }
                        }
                    }
                }
            } else if self.axis == Axis::Descendant && !self.narrowed {
                if let Some(target) = named_element(&self.test).cloned() {
                    if let Some(routes) = schema.children_containing(&parent, &target) {
                        if routes.is_empty() {
                            return Ok(fold_to_empty(
                                visitor,
                                loc,
                                format!("no descendant of {parent} can be a {target} element"),
                            ));
                        }
                        if let Some(permitted) = schema.permitted_children(&parent) {
                            if routes.len() < permitted.len() {
                                let first = AxisExpr {
                                    axis: Axis::Child,
                                    test: NodeTest::OneOf {
                                        kind: NodeKind::Element,
                                        names: routes,
                                    },
                                    known_max: None,
                                    narrowed: true,
                                };
                                let rest = AxisExpr {
                                    axis: Axis::DescendantOrSelf,
                                    test: self.test.clone(),
                                    known_max: None,
                                    narrowed: true,
                                };
                                let slash = SlashExpr {
                                    lhs: Box::new(first.into_expr().at(loc)),
                                    rhs: Box::new(rest.into_expr().at(loc)),
                                };
                                return slash.type_check(visitor, context_info, loc);
                            }
                        }
                    }
                }
            }
        }

        let step = self.into_expr().at(loc);
        if needs_node_check {
            Ok(Expr::new(ExprKind::ItemCheck(ItemCheckExpr {
                operand: Box::new(step),
                required: ItemType::ANY_NODE,
                subject: CheckSubject::ContextItem,
            }))
            .at(loc))
        } else {
            Ok(step)
        }
    }

    pub(super) fn iterate<'a, N: XdmNode>(
        &'a self,
        ctx: &DynamicContext<N>,
        loc: Location,
    ) -> Result<BoxIter<'a, N>, Error> {
        let origin = ctx
            .require_context_node()
            .map_err(|e| e.maybe_with_location(loc))?;
        let selected = collect_axis(origin, self.axis)
            .into_iter()
            .filter(|n| self.test.matches(n))
            .map(Item::Node)
            .collect();
        Ok(Box::new(ItemsIter::new(selected)))
    }

    pub(super) fn explain(&self) -> ExplainNode {
        let mut node = ExplainNode::new("axis")
            .attr("axis", self.axis)
            .attr("test", &self.test);
        if let Some(max) = self.known_max {
            node = node.attr("known-max", max);
        }
        node
    }
}

impl core::fmt::Display for AxisExpr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}::{}", self.axis, self.test)
    }
}

fn named_element(test: &NodeTest) -> Option<&ExpandedName> {
    match test {
        NodeTest::Name {
            kind: NodeKind::Element,
            name,
            ..
        } => Some(name),
        _ => None,
    }
}

/// Nodes reachable along the axis, in axis order (reverse axes nearest
/// first), before the node test is applied.
pub fn collect_axis<N: XdmNode>(origin: &N, axis: Axis) -> Vec<N> {
    use Axis::*;
    match axis {
        SelfAxis => vec![origin.clone()],
        Child => origin.children(),
        Attribute => origin.attributes(),
        Namespace => origin.namespaces(),
        Parent => origin.parent().into_iter().collect(),
        Ancestor => ancestors(origin),
        AncestorOrSelf => {
            let mut out = vec![origin.clone()];
            out.extend(ancestors(origin));
            out
        }
        Descendant => {
            let mut out = Vec::new();
            for c in origin.children() {
                push_subtree(&c, &mut out);
            }
            out
        }
        DescendantOrSelf => {
            let mut out = Vec::new();
            push_subtree(origin, &mut out);
            out
        }
        FollowingSibling => siblings_after(origin),
        PrecedingSibling => {
            let mut out = siblings_before(origin);
            out.reverse();
            out
        }
        Following => {
            let mut out = Vec::new();
            let mut cur = origin.clone();
            loop {
                for s in siblings_after(&cur) {
                    push_subtree(&s, &mut out);
                }
                match cur.parent() {
                    Some(p) => cur = p,
                    None => break,
                }
            }
            out
        }
        Preceding => {
            let mut out = Vec::new();
            let mut cur = origin.clone();
            loop {
                for s in siblings_before(&cur).into_iter().rev() {
                    let mut sub = Vec::new();
                    push_subtree(&s, &mut sub);
                    sub.reverse();
                    out.extend(sub);
                }
                match cur.parent() {
                    Some(p) => cur = p,
                    None => break,
                }
            }
            out
        }
    }
}

fn ancestors<N: XdmNode>(n: &N) -> Vec<N> {
    let mut out = Vec::new();
    let mut cur = n.clone();
    while let Some(p) = cur.parent() {
        out.push(p.clone());
        cur = p;
    }
    out
}

fn push_subtree<N: XdmNode>(n: &N, out: &mut Vec<N>) {
    out.push(n.clone());
    for c in n.children() {
        push_subtree(&c, out);
    }
}

fn siblings_after<N: XdmNode>(n: &N) -> Vec<N> {
    let Some(parent) = n.parent() else {
        return Vec::new();
    };
    let sibs = parent.children();
    match sibs.iter().position(|s| s == n) {
        Some(i) => sibs[i + 1..].to_vec(),
        None => Vec::new(),
    }
}

fn siblings_before<N: XdmNode>(n: &N) -> Vec<N> {
    let Some(parent) = n.parent() else {
        return Vec::new();
    };
    let sibs = parent.children();
    match sibs.iter().position(|s| s == n) {
        Some(i) => sibs[..i].to_vec(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simple_node::{SimpleNode, doc, elem};
    use rstest::rstest;

    fn tree() -> SimpleNode {
        // doc > a > (b > d, c)
        doc()
            .child(
                elem("a")
                    .child(elem("b").child(elem("d")))
                    .child(elem("c")),
            )
            .build()
    }

    fn names(nodes: &[SimpleNode]) -> Vec<String> {
        use crate::model::XdmNode;
        nodes
            .iter()
            .map(|n| {
                n.name()
                    .map(|q| q.local)
                    .unwrap_or_else(|| n.kind().name().to_string())
            })
            .collect()
    }

    #[test]
    fn descendant_is_preorder() {
        use crate::model::XdmNode;
        let d = tree();
        let out = collect_axis(&d, Axis::Descendant);
        assert_eq!(names(&out), ["a", "b", "d", "c"]);
        let a = d.children()[0].clone();
        assert_eq!(names(&collect_axis(&a, Axis::DescendantOrSelf)), [
            "a", "b", "d", "c"
        ]);
    }

    #[test]
    fn ancestor_axis_is_nearest_first() {
        use crate::model::XdmNode;
        let doc_node = tree();
        let a = doc_node.children()[0].clone();
        let b = a.children()[0].clone();
        let d = b.children()[0].clone();
        assert_eq!(names(&collect_axis(&d, Axis::Ancestor)), [
            "b",
            "a",
            "document-node"
        ]);
    }

    #[test]
    fn following_and_preceding_partition_the_rest() {
        use crate::model::XdmNode;
        let doc_node = tree();
        let a = doc_node.children()[0].clone();
        let b = a.children()[0].clone();
        let d = b.children()[0].clone();
        assert_eq!(names(&collect_axis(&d, Axis::Following)), ["c"]);
        let c = a.children()[1].clone();
        // Nearest first: d then b.
        assert_eq!(names(&collect_axis(&c, Axis::Preceding)), ["d", "b"]);
    }

    #[rstest]
    #[case(Axis::Child, true, true, true)]
    #[case(Axis::Descendant, true, false, true)]
    #[case(Axis::Ancestor, false, false, false)]
    #[case(Axis::Attribute, true, true, true)]
    #[case(Axis::PrecedingSibling, false, true, false)]
    fn axis_topology(
        #[case] axis: Axis,
        #[case] forward: bool,
        #[case] peer: bool,
        #[case] subtree: bool,
    ) {
        assert_eq!(axis.is_forward(), forward);
        assert_eq!(axis.is_peer(), peer);
        assert_eq!(axis.is_subtree(), subtree);
    }

    #[rstest]
    #[case(Axis::Child, NodeKind::Attribute, false)]
    #[case(Axis::Attribute, NodeKind::Element, false)]
    #[case(Axis::Parent, NodeKind::Text, false)]
    #[case(Axis::Child, NodeKind::Text, true)]
    fn axis_delivery(#[case] axis: Axis, #[case] kind: NodeKind, #[case] ok: bool) {
        assert_eq!(axis.delivers(kind), ok);
    }
}
