//! Static types: cardinalities, item types, node tests, and the oracles
//! (type hierarchy, schema content model) the analyzer consults.
//!
//! The deep structural logic of a schema processor is out of scope; what
//! lives here is the algebra the expression rewriter needs: a five-valued
//! type relationship, cardinality union/product, and a content-model lookup
//! interface with a simple table-backed implementation for tests.

use crate::model::{ExpandedName, NodeKind, XdmNode};
use crate::xdm::{AtomicValue, Item};
use core::fmt;
use std::collections::HashMap;

/// Statically inferred bound on sequence length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    Empty,
    ExactlyOne,
    ZeroOrOne,
    OneOrMore,
    ZeroOrMore,
}

impl Cardinality {
    pub fn allows_zero(&self) -> bool {
        matches!(
            self,
            Cardinality::Empty | Cardinality::ZeroOrOne | Cardinality::ZeroOrMore
        )
    }

    pub fn allows_many(&self) -> bool {
        matches!(self, Cardinality::OneOrMore | Cardinality::ZeroOrMore)
    }

    fn bounds(&self) -> (usize, Option<usize>) {
        match self {
            Cardinality::Empty => (0, Some(0)),
            Cardinality::ExactlyOne => (1, Some(1)),
            Cardinality::ZeroOrOne => (0, Some(1)),
            Cardinality::OneOrMore => (1, None),
            Cardinality::ZeroOrMore => (0, None),
        }
    }

    pub fn from_bounds(min: usize, max: Option<usize>) -> Self {
        match (min, max) {
            (_, Some(0)) => Cardinality::Empty,
            (0, Some(1)) => Cardinality::ZeroOrOne,
            (min, Some(1)) if min >= 1 => Cardinality::ExactlyOne,
            (0, _) => Cardinality::ZeroOrMore,
            (_, _) => Cardinality::OneOrMore,
        }
    }

    /// Either-branch combination (if/else, try/catch).
    pub fn union(&self, other: Cardinality) -> Cardinality {
        let (amin, amax) = self.bounds();
        let (bmin, bmax) = other.bounds();
        let min = amin.min(bmin);
        let max = match (amax, bmax) {
            (Some(a), Some(b)) => Some(a.max(b)),
            _ => None,
        };
        Cardinality::from_bounds(min, max)
    }

    /// Per-item composition (a path step evaluated for each input item).
    pub fn product(&self, other: Cardinality) -> Cardinality {
        let (amin, amax) = self.bounds();
        let (bmin, bmax) = other.bounds();
        let min = amin.saturating_mul(bmin);
        let max = match (amax, bmax) {
            (Some(a), Some(b)) => Some(a.saturating_mul(b)),
            _ => None,
        };
        Cardinality::from_bounds(min, max)
    }

    /// True when every sequence length permitted by `other` is also
    /// permitted by `self`.
    pub fn subsumes(&self, other: Cardinality) -> bool {
        let (amin, amax) = self.bounds();
        let (bmin, bmax) = other.bounds();
        let max_ok = match (amax, bmax) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) => b <= a,
        };
        amin <= bmin && max_ok
    }

    /// Count consistent with this cardinality?
    pub fn admits(&self, count: usize) -> bool {
        let (min, max) = self.bounds();
        count >= min && max.is_none_or(|m| count <= m)
    }

    pub fn occurrence_indicator(&self) -> &'static str {
        match self {
            Cardinality::Empty => "0",
            Cardinality::ExactlyOne => "",
            Cardinality::ZeroOrOne => "?",
            Cardinality::OneOrMore => "+",
            Cardinality::ZeroOrMore => "*",
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.occurrence_indicator())
    }
}

/// Built-in atomic types (the subset carried by [`AtomicValue`], plus the
/// `numeric` union and the `anyAtomicType` root used during analysis).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicType {
    AnyAtomic,
    Numeric,
    Boolean,
    String,
    UntypedAtomic,
    AnyUri,
    Decimal,
    Integer,
    Long,
    Int,
    Short,
    Byte,
    Double,
    Float,
    QName,
}

impl AtomicType {
    pub fn is_numeric(&self) -> bool {
        use AtomicType::*;
        matches!(
            self,
            Numeric | Decimal | Integer | Long | Int | Short | Byte | Double | Float
        )
    }

    /// Nearest ancestor in the built-in derivation chain, or None at a root.
    fn base(&self) -> Option<AtomicType> {
        use AtomicType::*;
        match self {
            AnyAtomic => None,
            Numeric => Some(AnyAtomic),
            Boolean | String | UntypedAtomic | AnyUri | QName => Some(AnyAtomic),
            Decimal | Double | Float => Some(Numeric),
            Integer => Some(Decimal),
            Long => Some(Integer),
            Int => Some(Long),
            Short => Some(Int),
            Byte => Some(Short),
        }
    }

    fn derives_from(&self, ancestor: AtomicType) -> bool {
        let mut cur = Some(*self);
        while let Some(t) = cur {
            if t == ancestor {
                return true;
            }
            cur = t.base();
        }
        false
    }

    pub fn relationship(&self, other: AtomicType) -> Relationship {
        if *self == other {
            Relationship::Same
        } else if other.derives_from(*self) {
            Relationship::Subsumes
        } else if self.derives_from(other) {
            Relationship::SubsumedBy
        } else {
            Relationship::Disjoint
        }
    }

    /// Comparability class used by equivalence comparison: values compare
    /// only within a class; untypedAtomic compares via its string form.
    pub fn comparison_class(&self) -> ComparisonClass {
        use AtomicType::*;
        match self {
            Boolean => ComparisonClass::Boolean,
            String | AnyUri | UntypedAtomic => ComparisonClass::Stringlike,
            QName => ComparisonClass::QName,
            AnyAtomic => ComparisonClass::Any,
            _ => ComparisonClass::Numeric,
        }
    }

    pub fn matches(&self, v: &AtomicValue) -> bool {
        v.type_label().derives_from(*self)
    }

    /// Probe whether a lexical token is castable to this type. Used by the
    /// castable-to-list test; failures are answers, not errors.
    pub fn accepts_lexical(&self, s: &str) -> bool {
        use AtomicType::*;
        let s = s.trim();
        match self {
            AnyAtomic | String | UntypedAtomic | AnyUri => true,
            Boolean => matches!(s, "true" | "false" | "1" | "0"),
            Integer | Long => s.parse::<i64>().is_ok(),
            Int => s.parse::<i32>().is_ok(),
            Short => s.parse::<i16>().is_ok(),
            Byte => s.parse::<i8>().is_ok(),
            Decimal => !s.contains(['e', 'E']) && s.parse::<f64>().is_ok(),
            Double | Float | Numeric => {
                s.parse::<f64>().is_ok() || matches!(s, "INF" | "-INF" | "NaN")
            }
            QName => !s.is_empty() && s.split(':').all(|p| !p.is_empty()) && s.matches(':').count() <= 1,
        }
    }

    pub fn name(&self) -> &'static str {
        use AtomicType::*;
        match self {
            AnyAtomic => "xs:anyAtomicType",
            Numeric => "xs:numeric",
            Boolean => "xs:boolean",
            String => "xs:string",
            UntypedAtomic => "xs:untypedAtomic",
            AnyUri => "xs:anyURI",
            Decimal => "xs:decimal",
            Integer => "xs:integer",
            Long => "xs:long",
            Int => "xs:int",
            Short => "xs:short",
            Byte => "xs:byte",
            Double => "xs:double",
            Float => "xs:float",
            QName => "xs:QName",
        }
    }
}

impl fmt::Display for AtomicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classes within which atomic values are mutually comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonClass {
    Numeric,
    Stringlike,
    Boolean,
    QName,
    Any,
}

impl ComparisonClass {
    pub fn comparable_with(&self, other: ComparisonClass) -> bool {
        use ComparisonClass::*;
        matches!((self, other), (Any, _) | (_, Any)) || *self == other
    }
}

/// Predicate over nodes: by kind, by name, by a name out of a fixed set
/// (produced by schema-driven step decomposition), optionally qualified by a
/// schema content type.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    AnyKind,
    Kind(NodeKind),
    Name {
        kind: NodeKind,
        name: ExpandedName,
        content_type: Option<ExpandedName>,
    },
    OneOf {
        kind: NodeKind,
        names: Vec<ExpandedName>,
    },
}

impl NodeTest {
    pub fn name(kind: NodeKind, name: ExpandedName) -> Self {
        NodeTest::Name {
            kind,
            name,
            content_type: None,
        }
    }

    pub fn element(local: &str) -> Self {
        Self::name(NodeKind::Element, ExpandedName::local_only(local))
    }

    /// The single node kind this test can match, when it is kind-restricted.
    pub fn node_kind(&self) -> Option<NodeKind> {
        match self {
            NodeTest::AnyKind => None,
            NodeTest::Kind(k) => Some(*k),
            NodeTest::Name { kind, .. } => Some(*kind),
            NodeTest::OneOf { kind, .. } => Some(*kind),
        }
    }

    pub fn matches<N: XdmNode>(&self, node: &N) -> bool {
        match self {
            NodeTest::AnyKind => true,
            NodeTest::Kind(k) => node.kind() == *k,
            NodeTest::Name { kind, name, .. } => {
                node.kind() == *kind
                    && node.name().is_some_and(|q| {
                        q.local == name.local && q.ns_uri == name.ns_uri
                    })
            }
            NodeTest::OneOf { kind, names } => {
                node.kind() == *kind
                    && node.name().is_some_and(|q| {
                        let en = q.expanded();
                        names.contains(&en)
                    })
            }
        }
    }
}

impl fmt::Display for NodeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeTest::AnyKind => f.write_str("node()"),
            NodeTest::Kind(k) => write!(f, "{k}()"),
            NodeTest::Name { kind, name, .. } => match kind {
                NodeKind::Element => write!(f, "{name}"),
                NodeKind::Attribute => write!(f, "@{name}"),
                k => write!(f, "{k}({name})"),
            },
            NodeTest::OneOf { names, .. } => {
                write!(f, "(")?;
                for (i, n) in names.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    write!(f, "{n}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// The static type of a single item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemType {
    AnyItem,
    Node(NodeTest),
    Atomic(AtomicType),
    /// The type with no instances; the item type of a provably empty
    /// expression.
    Nothing,
}

impl ItemType {
    pub const ANY_NODE: ItemType = ItemType::Node(NodeTest::AnyKind);

    pub fn document_node() -> ItemType {
        ItemType::Node(NodeTest::Kind(NodeKind::Document))
    }

    pub fn element(local: &str) -> ItemType {
        ItemType::Node(NodeTest::element(local))
    }

    pub fn matches_item<N: XdmNode>(&self, item: &Item<N>) -> bool {
        match (self, item) {
            (ItemType::AnyItem, _) => true,
            (ItemType::Nothing, _) => false,
            (ItemType::Node(test), Item::Node(n)) => test.matches(n),
            (ItemType::Node(_), Item::Atomic(_)) => false,
            (ItemType::Atomic(t), Item::Atomic(a)) => t.matches(a),
            (ItemType::Atomic(_), Item::Node(_)) => false,
        }
    }

    /// The statically known element name of this type, when it is a named
    /// element test. Drives content-model narrowing of axis steps.
    pub fn element_name(&self) -> Option<&ExpandedName> {
        match self {
            ItemType::Node(NodeTest::Name {
                kind: NodeKind::Element,
                name,
                ..
            }) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::AnyItem => f.write_str("item()"),
            ItemType::Node(t) => write!(f, "{t}"),
            ItemType::Atomic(t) => write!(f, "{t}"),
            ItemType::Nothing => f.write_str("empty-sequence()"),
        }
    }
}

/// (item type, cardinality) pair: the static type of an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceType {
    pub item_type: ItemType,
    pub cardinality: Cardinality,
}

impl SequenceType {
    pub const EMPTY: SequenceType = SequenceType {
        item_type: ItemType::Nothing,
        cardinality: Cardinality::Empty,
    };

    pub fn new(item_type: ItemType, cardinality: Cardinality) -> Self {
        Self {
            item_type,
            cardinality,
        }
    }

    pub fn single(item_type: ItemType) -> Self {
        Self::new(item_type, Cardinality::ExactlyOne)
    }

    pub fn optional(item_type: ItemType) -> Self {
        Self::new(item_type, Cardinality::ZeroOrOne)
    }

    pub fn zero_or_more(item_type: ItemType) -> Self {
        Self::new(item_type, Cardinality::ZeroOrMore)
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.item_type, self.cardinality)
    }
}

/// Result of comparing two item types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    Same,
    Subsumes,
    SubsumedBy,
    Overlaps,
    Disjoint,
}

/// Read-only oracle answering type-relationship queries. Schema-aware
/// environments supply an implementation that understands user-defined
/// types; [`BuiltinTypeHierarchy`] covers the built-in lattice.
pub trait TypeHierarchy: Send + Sync + fmt::Debug {
    fn relationship(&self, a: &ItemType, b: &ItemType) -> Relationship;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinTypeHierarchy;

impl TypeHierarchy for BuiltinTypeHierarchy {
    fn relationship(&self, a: &ItemType, b: &ItemType) -> Relationship {
        use ItemType::*;
        match (a, b) {
            (Nothing, Nothing) => Relationship::Same,
            (Nothing, _) | (_, Nothing) => Relationship::Disjoint,
            (AnyItem, AnyItem) => Relationship::Same,
            (AnyItem, _) => Relationship::Subsumes,
            (_, AnyItem) => Relationship::SubsumedBy,
            (Node(_), Atomic(_)) | (Atomic(_), Node(_)) => Relationship::Disjoint,
            (Atomic(x), Atomic(y)) => x.relationship(*y),
            (Node(x), Node(y)) => node_test_relationship(x, y),
        }
    }
}

fn node_test_relationship(a: &NodeTest, b: &NodeTest) -> Relationship {
    use NodeTest::*;
    match (a, b) {
        (AnyKind, AnyKind) => Relationship::Same,
        (AnyKind, _) => Relationship::Subsumes,
        (_, AnyKind) => Relationship::SubsumedBy,
        _ if a.node_kind() != b.node_kind() => Relationship::Disjoint,
        (Kind(_), Kind(_)) => Relationship::Same,
        (Kind(_), _) => Relationship::Subsumes,
        (_, Kind(_)) => Relationship::SubsumedBy,
        (Name { name: na, .. }, Name { name: nb, .. }) => {
            if na == nb {
                Relationship::Same
            } else {
                Relationship::Disjoint
            }
        }
        (OneOf { names, .. }, Name { name, .. }) => {
            if names.contains(name) {
                Relationship::Subsumes
            } else {
                Relationship::Disjoint
            }
        }
        (Name { name, .. }, OneOf { names, .. }) => {
            if names.contains(name) {
                Relationship::SubsumedBy
            } else {
                Relationship::Disjoint
            }
        }
        (OneOf { names: xs, .. }, OneOf { names: ys, .. }) => {
            let shared = xs.iter().any(|n| ys.contains(n));
            if xs == ys {
                Relationship::Same
            } else if shared {
                Relationship::Overlaps
            } else {
                Relationship::Disjoint
            }
        }
    }
}

/// Occurrence bound of a child particle within a content model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Multiplicity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Multiplicity {
    pub fn new(min: usize, max: Option<usize>) -> Self {
        Self { min, max }
    }

    pub fn cardinality(&self) -> Cardinality {
        Cardinality::from_bounds(self.min, self.max)
    }
}

/// Content-model lookup interface consumed during schema-aware axis
/// narrowing. All queries answer `None` when nothing is known, which
/// disables narrowing for that step.
pub trait SchemaOracle: Send + Sync + fmt::Debug {
    /// How often a named child element may occur under an element of the
    /// given (statically known) name.
    fn child_occurrence(
        &self,
        parent: &ExpandedName,
        child: &ExpandedName,
    ) -> Option<Multiplicity>;

    /// The complete set of element names permitted as direct children.
    fn permitted_children(&self, parent: &ExpandedName) -> Option<Vec<ExpandedName>>;

    /// The complete set of element names reachable anywhere below.
    fn permitted_descendants(&self, parent: &ExpandedName) -> Option<Vec<ExpandedName>>;

    /// The subset of direct children whose subtrees can contain `target`.
    fn children_containing(
        &self,
        parent: &ExpandedName,
        target: &ExpandedName,
    ) -> Option<Vec<ExpandedName>>;
}

/// Table-backed content model: parent element name to ordered child
/// particles. Enough schema awareness for narrowing and for tests; a real
/// schema processor would sit behind the same trait.
#[derive(Debug, Default, Clone)]
pub struct ContentModelTable {
    children: HashMap<ExpandedName, Vec<(ExpandedName, Multiplicity)>>,
}

impl ContentModelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(
        &mut self,
        parent: ExpandedName,
        child: ExpandedName,
        occurrence: Multiplicity,
    ) -> &mut Self {
        self.children
            .entry(parent)
            .or_default()
            .push((child, occurrence));
        self
    }

    fn descendants_of(&self, parent: &ExpandedName, acc: &mut Vec<ExpandedName>) {
        let Some(kids) = self.children.get(parent) else {
            return;
        };
        for (name, _) in kids {
            if !acc.contains(name) {
                acc.push(name.clone());
                self.descendants_of(name, acc);
            }
        }
    }
}

impl SchemaOracle for ContentModelTable {
    fn child_occurrence(
        &self,
        parent: &ExpandedName,
        child: &ExpandedName,
    ) -> Option<Multiplicity> {
        let kids = self.children.get(parent)?;
        kids.iter()
            .find(|(name, _)| name == child)
            .map(|(_, m)| *m)
    }

    fn permitted_children(&self, parent: &ExpandedName) -> Option<Vec<ExpandedName>> {
        self.children
            .get(parent)
            .map(|kids| kids.iter().map(|(n, _)| n.clone()).collect())
    }

    fn permitted_descendants(&self, parent: &ExpandedName) -> Option<Vec<ExpandedName>> {
        if !self.children.contains_key(parent) {
            return None;
        }
        let mut acc = Vec::new();
        self.descendants_of(parent, &mut acc);
        Some(acc)
    }

    fn children_containing(
        &self,
        parent: &ExpandedName,
        target: &ExpandedName,
    ) -> Option<Vec<ExpandedName>> {
        let kids = self.permitted_children(parent)?;
        Some(
            kids.into_iter()
                .filter(|kid| {
                    kid == target
                        || self
                            .permitted_descendants(kid)
                            .is_some_and(|d| d.contains(target))
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Cardinality::ExactlyOne, Cardinality::ZeroOrOne, Cardinality::ZeroOrOne)]
    #[case(Cardinality::OneOrMore, Cardinality::Empty, Cardinality::ZeroOrMore)]
    #[case(Cardinality::ExactlyOne, Cardinality::ExactlyOne, Cardinality::ExactlyOne)]
    fn cardinality_union(
        #[case] a: Cardinality,
        #[case] b: Cardinality,
        #[case] expected: Cardinality,
    ) {
        assert_eq!(a.union(b), expected);
    }

    #[rstest]
    #[case(Cardinality::ExactlyOne, Cardinality::ZeroOrMore, Cardinality::ZeroOrMore)]
    #[case(Cardinality::ZeroOrOne, Cardinality::ExactlyOne, Cardinality::ZeroOrOne)]
    #[case(Cardinality::OneOrMore, Cardinality::OneOrMore, Cardinality::OneOrMore)]
    #[case(Cardinality::Empty, Cardinality::OneOrMore, Cardinality::Empty)]
    fn cardinality_product(
        #[case] a: Cardinality,
        #[case] b: Cardinality,
        #[case] expected: Cardinality,
    ) {
        assert_eq!(a.product(b), expected);
    }

    #[test]
    fn cardinality_subsumption() {
        assert!(Cardinality::ZeroOrMore.subsumes(Cardinality::ExactlyOne));
        assert!(Cardinality::ZeroOrOne.subsumes(Cardinality::Empty));
        assert!(!Cardinality::ExactlyOne.subsumes(Cardinality::ZeroOrOne));
        assert!(!Cardinality::ZeroOrOne.subsumes(Cardinality::OneOrMore));
    }

    #[test]
    fn integer_chain_subsumed_by_decimal() {
        assert_eq!(
            AtomicType::Decimal.relationship(AtomicType::Short),
            Relationship::Subsumes
        );
        assert_eq!(
            AtomicType::Byte.relationship(AtomicType::Integer),
            Relationship::SubsumedBy
        );
        assert_eq!(
            AtomicType::Boolean.relationship(AtomicType::String),
            Relationship::Disjoint
        );
    }

    #[test]
    fn node_and_atomic_are_disjoint() {
        let th = BuiltinTypeHierarchy;
        assert_eq!(
            th.relationship(
                &ItemType::ANY_NODE,
                &ItemType::Atomic(AtomicType::String)
            ),
            Relationship::Disjoint
        );
    }

    #[test]
    fn named_element_subsumed_by_element_kind() {
        let th = BuiltinTypeHierarchy;
        assert_eq!(
            th.relationship(
                &ItemType::Node(NodeTest::Kind(NodeKind::Element)),
                &ItemType::element("book"),
            ),
            Relationship::Subsumes
        );
    }

    #[rstest]
    #[case(NodeTest::AnyKind, NodeTest::AnyKind, Relationship::Same)]
    #[case(NodeTest::AnyKind, NodeTest::element("a"), Relationship::Subsumes)]
    #[case(NodeTest::element("a"), NodeTest::AnyKind, Relationship::SubsumedBy)]
    #[case(NodeTest::Kind(NodeKind::Element), NodeTest::Kind(NodeKind::Text), Relationship::Disjoint)]
    #[case(
        NodeTest::element("a"),
        NodeTest::name(NodeKind::Attribute, ExpandedName::local_only("a")),
        Relationship::Disjoint
    )]
    #[case(NodeTest::element("a"), NodeTest::element("a"), Relationship::Same)]
    fn node_test_relationships(
        #[case] a: NodeTest,
        #[case] b: NodeTest,
        #[case] expected: Relationship,
    ) {
        assert_eq!(node_test_relationship(&a, &b), expected);
    }

    #[test]
    fn content_model_descendant_closure() {
        let mut t = ContentModelTable::new();
        let lib = ExpandedName::local_only("library");
        let shelf = ExpandedName::local_only("shelf");
        let book = ExpandedName::local_only("book");
        t.declare(lib.clone(), shelf.clone(), Multiplicity::new(0, None));
        t.declare(shelf.clone(), book.clone(), Multiplicity::new(0, Some(2)));

        let desc = t.permitted_descendants(&lib).unwrap();
        assert!(desc.contains(&shelf) && desc.contains(&book));
        assert_eq!(t.children_containing(&lib, &book).unwrap(), vec![shelf]);
        assert_eq!(
            t.child_occurrence(&lib, &book), // not a direct child
            None
        );
    }

    #[rstest]
    #[case(AtomicType::Integer, "42", true)]
    #[case(AtomicType::Integer, "4.2", false)]
    #[case(AtomicType::Boolean, "true", true)]
    #[case(AtomicType::Boolean, "yes", false)]
    #[case(AtomicType::Decimal, "3.14", true)]
    #[case(AtomicType::Decimal, "3e1", false)]
    #[case(AtomicType::Double, "3e1", true)]
    fn lexical_cast_probe(#[case] ty: AtomicType, #[case] s: &str, #[case] ok: bool) {
        assert_eq!(ty.accepts_lexical(s), ok);
    }
}
