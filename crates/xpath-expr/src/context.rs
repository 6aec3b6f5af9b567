//! Static and dynamic contexts.
//!
//! The static context is an immutable snapshot consumed read-only by every
//! expression during analysis; the dynamic context carries the focus
//! (context item, position, size), variable slots and the binding vector
//! during evaluation. Both are produced through builders.

use crate::component::BindingVector;
use crate::error::{Error, ErrorCode, Warning};
use crate::model::{ExpandedName, XdmNode};
use crate::types::{
    BuiltinTypeHierarchy, Cardinality, ItemType, SchemaOracle, SequenceType, TypeHierarchy,
};
use crate::xdm::{Item, Value};
use core::cmp::Ordering;
use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

/// URI of the Unicode codepoint collation, the default everywhere.
pub const CODEPOINT_URI: &str =
    "http://www.w3.org/2005/xpath-functions/collation/codepoint";

/// String comparison strategy used by value comparisons.
pub trait Collation: Send + Sync + fmt::Debug {
    fn uri(&self) -> &str;
    fn compare(&self, a: &str, b: &str) -> Ordering;

    fn equal(&self, a: &str, b: &str) -> bool {
        self.compare(a, b) == Ordering::Equal
    }
}

/// Codepoint-by-codepoint comparison.
#[derive(Debug, Default, Clone, Copy)]
pub struct CodepointCollation;

impl Collation for CodepointCollation {
    fn uri(&self) -> &str {
        CODEPOINT_URI
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        a.cmp(b)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NamespaceBindings {
    pub by_prefix: HashMap<String, String>,
}

/// A variable visible to the analyzer: the slot the driver allocated for it
/// and its declared static type.
#[derive(Debug, Clone)]
pub struct VariableBinding {
    pub slot: usize,
    pub declared_type: SequenceType,
}

/// Immutable static environment for analysis.
#[derive(Debug, Clone)]
pub struct StaticContext {
    pub base_uri: Option<String>,
    pub namespaces: NamespaceBindings,
    pub default_collation: Arc<dyn Collation>,
    pub schema_aware: bool,
    pub type_hierarchy: Arc<dyn TypeHierarchy>,
    pub schema: Option<Arc<dyn SchemaOracle>>,
    pub variables: HashMap<ExpandedName, VariableBinding>,
}

impl Default for StaticContext {
    fn default() -> Self {
        let mut ns = NamespaceBindings::default();
        // The xml prefix is implicitly bound and cannot be overridden.
        ns.by_prefix.insert(
            "xml".to_string(),
            "http://www.w3.org/XML/1998/namespace".to_string(),
        );
        Self {
            base_uri: None,
            namespaces: ns,
            default_collation: Arc::new(CodepointCollation),
            schema_aware: false,
            type_hierarchy: Arc::new(BuiltinTypeHierarchy),
            schema: None,
            variables: HashMap::new(),
        }
    }
}

impl StaticContext {
    pub fn namespace_uri_for_prefix(&self, prefix: &str) -> Result<&str, Error> {
        self.namespaces
            .by_prefix
            .get(prefix)
            .map(String::as_str)
            .ok_or_else(|| {
                Error::static_err(
                    ErrorCode::XPST0003,
                    format!("undeclared namespace prefix '{prefix}'"),
                )
            })
    }

    pub fn variable_binding(&self, name: &ExpandedName) -> Option<&VariableBinding> {
        self.variables.get(name)
    }
}

pub struct StaticContextBuilder {
    ctx: StaticContext,
}

impl Default for StaticContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticContextBuilder {
    pub fn new() -> Self {
        Self {
            ctx: StaticContext::default(),
        }
    }

    pub fn with_base_uri(mut self, uri: impl Into<String>) -> Self {
        self.ctx.base_uri = Some(uri.into());
        self
    }

    /// Register a namespace prefix. Attempts to override the reserved `xml`
    /// prefix are ignored.
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        let p = prefix.into();
        if p == "xml" {
            return self;
        }
        self.ctx.namespaces.by_prefix.insert(p, uri.into());
        self
    }

    pub fn with_default_collation(mut self, collation: Arc<dyn Collation>) -> Self {
        self.ctx.default_collation = collation;
        self
    }

    pub fn with_type_hierarchy(mut self, th: Arc<dyn TypeHierarchy>) -> Self {
        self.ctx.type_hierarchy = th;
        self
    }

    /// Supply a content-model oracle; this also flips the schema-aware flag.
    pub fn with_schema(mut self, schema: Arc<dyn SchemaOracle>) -> Self {
        self.ctx.schema = Some(schema);
        self.ctx.schema_aware = true;
        self
    }

    pub fn with_variable(
        mut self,
        name: ExpandedName,
        slot: usize,
        declared_type: SequenceType,
    ) -> Self {
        self.ctx.variables.insert(
            name,
            VariableBinding {
                slot,
                declared_type,
            },
        );
        self
    }

    pub fn build(self) -> StaticContext {
        self.ctx
    }
}

/// Statically known information about the context item at some point in the
/// tree: its type, and whether it may be (or definitely is) absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextItemStaticInfo {
    pub item_type: ItemType,
    /// The context item is definitely absent here (top level of a function
    /// body, for example). Focus-dependent expressions are static errors.
    pub absent: bool,
    /// The context item may be absent at run time even though a type is
    /// known for it when present.
    pub maybe_absent: bool,
}

impl ContextItemStaticInfo {
    pub fn new(item_type: ItemType) -> Self {
        Self {
            item_type,
            absent: false,
            maybe_absent: false,
        }
    }

    pub fn absent() -> Self {
        Self {
            item_type: ItemType::AnyItem,
            absent: true,
            maybe_absent: true,
        }
    }

    /// No static knowledge: any item, possibly absent.
    pub fn unknown() -> Self {
        Self {
            item_type: ItemType::AnyItem,
            absent: false,
            maybe_absent: true,
        }
    }
}

impl Default for ContextItemStaticInfo {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Push-mode output target. `process` forwards each result item here
/// instead of materializing the sequence.
pub trait Receiver<N: XdmNode> {
    fn append(&mut self, item: Item<N>) -> Result<(), Error>;

    /// Called once the producing expression has delivered everything.
    fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// Receiver that materializes everything it is given. Useful in tests and
/// as the boundary adapter between push and pull.
#[derive(Debug, Default)]
pub struct SequenceCollector<N: XdmNode> {
    pub items: Vec<Item<N>>,
}

impl<N: XdmNode> SequenceCollector<N> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn into_value(self) -> Value<N> {
        Value::from_items(self.items)
    }
}

impl<N: XdmNode> Receiver<N> for SequenceCollector<N> {
    fn append(&mut self, item: Item<N>) -> Result<(), Error> {
        self.items.push(item);
        Ok(())
    }
}

/// The dynamic evaluation environment: focus, variable slots, bindings.
///
/// Cloning is cheap (shared slot and binding storage); a minor context is a
/// clone with some fields replaced. The expression tree itself is never
/// mutated during evaluation, so one analyzed tree may be evaluated against
/// many contexts concurrently.
#[derive(Debug, Clone)]
pub struct DynamicContext<N: XdmNode> {
    pub context_item: Option<Item<N>>,
    /// 1-based position of the context item within the focus sequence.
    pub position: usize,
    pub size: usize,
    slots: Arc<Vec<Value<N>>>,
    bindings: Arc<BindingVector<N>>,
    caught_error: Option<Arc<Error>>,
    pub collation: Arc<dyn Collation>,
}

impl<N: XdmNode> Default for DynamicContext<N> {
    fn default() -> Self {
        Self {
            context_item: None,
            position: 0,
            size: 0,
            slots: Arc::new(Vec::new()),
            bindings: Arc::new(BindingVector::new()),
            caught_error: None,
            collation: Arc::new(CodepointCollation),
        }
    }
}

impl<N: XdmNode> DynamicContext<N> {
    pub fn context_item(&self) -> Option<&Item<N>> {
        self.context_item.as_ref()
    }

    /// The context item, required to be present (`err:XPDY0002` otherwise).
    pub fn require_context_item(&self) -> Result<&Item<N>, Error> {
        self.context_item().ok_or_else(|| {
            Error::dynamic(ErrorCode::XPDY0002, "the context item is absent")
        })
    }

    /// The context item, required to be a node (`err:XPTY0020` otherwise).
    pub fn require_context_node(&self) -> Result<&N, Error> {
        match self.require_context_item()? {
            Item::Node(n) => Ok(n),
            Item::Atomic(_) => Err(Error::dynamic_type(
                ErrorCode::XPTY0020,
                "the context item for an axis step is not a node",
            )),
        }
    }

    pub fn local_slot(&self, n: usize) -> Option<&Value<N>> {
        self.slots.get(n)
    }

    pub fn bindings(&self) -> &BindingVector<N> {
        &self.bindings
    }

    pub fn caught_error(&self) -> Option<&Arc<Error>> {
        self.caught_error.as_ref()
    }

    /// A minor context: same bindings and slots, same focus. Constructs that
    /// merely need an isolated frame (try/catch) start from here.
    #[must_use]
    pub fn new_minor_context(&self) -> Self {
        self.clone()
    }

    /// A context with a fresh focus.
    #[must_use]
    pub fn with_focus(&self, item: Item<N>, position: usize, size: usize) -> Self {
        Self {
            context_item: Some(item),
            position,
            size,
            ..self.clone()
        }
    }

    /// A context with no focus at all (component bodies evaluate here).
    #[must_use]
    pub fn without_focus(&self) -> Self {
        Self {
            context_item: None,
            position: 0,
            size: 0,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_caught_error(&self, err: Arc<Error>) -> Self {
        Self {
            caught_error: Some(err),
            ..self.clone()
        }
    }
}

pub struct DynamicContextBuilder<N: XdmNode> {
    ctx: DynamicContext<N>,
}

impl<N: XdmNode> Default for DynamicContextBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: XdmNode> DynamicContextBuilder<N> {
    pub fn new() -> Self {
        Self {
            ctx: DynamicContext::default(),
        }
    }

    pub fn with_context_item(mut self, item: impl Into<Item<N>>) -> Self {
        self.ctx.context_item = Some(item.into());
        self.ctx.position = 1;
        self.ctx.size = 1;
        self
    }

    pub fn with_context_node(self, node: N) -> Self {
        self.with_context_item(Item::Node(node))
    }

    pub fn with_slots(mut self, slots: Vec<Value<N>>) -> Self {
        self.ctx.slots = Arc::new(slots);
        self
    }

    pub fn with_bindings(mut self, bindings: Arc<BindingVector<N>>) -> Self {
        self.ctx.bindings = bindings;
        self
    }

    pub fn with_collation(mut self, collation: Arc<dyn Collation>) -> Self {
        self.ctx.collation = collation;
        self
    }

    pub fn build(self) -> DynamicContext<N> {
        self.ctx
    }
}

/// Carries the static context through the analysis phases and collects
/// advisory warnings raised along the way.
#[derive(Debug)]
pub struct ExpressionVisitor<'a> {
    static_context: &'a StaticContext,
    warnings: Vec<Warning>,
}

impl<'a> ExpressionVisitor<'a> {
    pub fn new(static_context: &'a StaticContext) -> Self {
        Self {
            static_context,
            warnings: Vec::new(),
        }
    }

    pub fn static_context(&self) -> &StaticContext {
        self.static_context
    }

    pub fn type_hierarchy(&self) -> &dyn TypeHierarchy {
        self.static_context.type_hierarchy.as_ref()
    }

    pub fn schema(&self) -> Option<&dyn SchemaOracle> {
        if self.static_context.schema_aware {
            self.static_context.schema.as_deref()
        } else {
            None
        }
    }

    pub fn warn(&mut self, message: impl Into<String>, location: crate::error::Location) {
        let w = Warning::new(message, location);
        tracing::warn!(target: "xpath_expr::analysis", "{w}");
        self.warnings.push(w);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }
}

/// Convenience for declared types of the commonest shape.
pub fn optional_atomic(ty: crate::types::AtomicType) -> SequenceType {
    SequenceType::new(ItemType::Atomic(ty), Cardinality::ZeroOrOne)
}
