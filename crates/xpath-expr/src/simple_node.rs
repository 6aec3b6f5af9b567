//! Simple in-memory tree implementing [`XdmNode`], for tests and demos.
//!
//! Equality is node identity (pointer equality on the shared allocation),
//! which is exactly what the expression core requires of a node handle.
//!
//! ```
//! use xpath_expr::simple_node::{doc, elem, attr};
//! use xpath_expr::model::XdmNode;
//!
//! let document = doc()
//!     .child(elem("root").attr(attr("id", "r")).child_text("Hello"))
//!     .build();
//! let root = document.children()[0].clone();
//! assert_eq!(root.string_value(), "Hello");
//! ```

use crate::model::{NodeKind, QName, XdmNode};
use core::fmt;
use std::sync::{Arc, RwLock, Weak};

#[derive(Debug)]
struct Inner {
    kind: NodeKind,
    name: Option<QName>,
    value: Option<String>,
    parent: RwLock<Option<Weak<Inner>>>,
    attributes: RwLock<Vec<SimpleNode>>,
    namespaces: RwLock<Vec<SimpleNode>>,
    children: RwLock<Vec<SimpleNode>>,
}

/// An Arc-backed node handle.
#[derive(Clone)]
pub struct SimpleNode(Arc<Inner>);

impl PartialEq for SimpleNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for SimpleNode {}

impl std::hash::Hash for SimpleNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for SimpleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleNode")
            .field("kind", &self.0.kind)
            .field("name", &self.0.name)
            .field("value", &self.0.value)
            .finish()
    }
}

impl SimpleNode {
    fn new(kind: NodeKind, name: Option<QName>, value: Option<String>) -> Self {
        SimpleNode(Arc::new(Inner {
            kind,
            name,
            value,
            parent: RwLock::new(None),
            attributes: RwLock::new(Vec::new()),
            namespaces: RwLock::new(Vec::new()),
            children: RwLock::new(Vec::new()),
        }))
    }
}

pub struct SimpleNodeBuilder {
    node: SimpleNode,
    pending_children: Vec<SimpleNode>,
    pending_attrs: Vec<SimpleNode>,
    pending_ns: Vec<SimpleNode>,
}

impl SimpleNodeBuilder {
    fn new(kind: NodeKind, name: Option<QName>) -> Self {
        Self {
            node: SimpleNode::new(kind, name, None),
            pending_children: Vec::new(),
            pending_attrs: Vec::new(),
            pending_ns: Vec::new(),
        }
    }

    pub fn child(mut self, child: impl Into<SimpleNodeOrBuilder>) -> Self {
        match child.into() {
            SimpleNodeOrBuilder::Built(n) => self.pending_children.push(n),
            SimpleNodeOrBuilder::Builder(b) => self.pending_children.push(b.build()),
        }
        self
    }

    /// Shorthand for a text-node child.
    pub fn child_text(self, v: &str) -> Self {
        self.child(text(v))
    }

    pub fn attr(mut self, attribute: SimpleNode) -> Self {
        debug_assert!(attribute.kind() == NodeKind::Attribute);
        self.pending_attrs.push(attribute);
        self
    }

    pub fn namespace(mut self, namespace: SimpleNode) -> Self {
        debug_assert!(namespace.kind() == NodeKind::Namespace);
        self.pending_ns.push(namespace);
        self
    }

    pub fn build(self) -> SimpleNode {
        let down = Arc::downgrade(&self.node.0);
        {
            let mut attrs = self.node.0.attributes.write().unwrap();
            for a in &self.pending_attrs {
                *a.0.parent.write().unwrap() = Some(down.clone());
            }
            attrs.extend(self.pending_attrs);
        }
        {
            let mut nss = self.node.0.namespaces.write().unwrap();
            for n in &self.pending_ns {
                *n.0.parent.write().unwrap() = Some(down.clone());
            }
            nss.extend(self.pending_ns);
        }
        {
            let mut ch = self.node.0.children.write().unwrap();
            for c in &self.pending_children {
                *c.0.parent.write().unwrap() = Some(down.clone());
            }
            ch.extend(self.pending_children);
        }
        self.node
    }
}

pub enum SimpleNodeOrBuilder {
    Built(SimpleNode),
    Builder(SimpleNodeBuilder),
}

impl From<SimpleNode> for SimpleNodeOrBuilder {
    fn from(n: SimpleNode) -> Self {
        SimpleNodeOrBuilder::Built(n)
    }
}

impl From<SimpleNodeBuilder> for SimpleNodeOrBuilder {
    fn from(b: SimpleNodeBuilder) -> Self {
        SimpleNodeOrBuilder::Builder(b)
    }
}

pub fn doc() -> SimpleNodeBuilder {
    SimpleNodeBuilder::new(NodeKind::Document, None)
}

pub fn elem(name: &str) -> SimpleNodeBuilder {
    SimpleNodeBuilder::new(NodeKind::Element, Some(QName::local(name)))
}

pub fn text(v: &str) -> SimpleNode {
    SimpleNode::new(NodeKind::Text, None, Some(v.to_string()))
}

pub fn attr(name: &str, v: &str) -> SimpleNode {
    SimpleNode::new(
        NodeKind::Attribute,
        Some(QName::local(name)),
        Some(v.to_string()),
    )
}

pub fn comment(v: &str) -> SimpleNode {
    SimpleNode::new(NodeKind::Comment, None, Some(v.to_string()))
}

pub fn pi(target: &str, data: &str) -> SimpleNode {
    SimpleNode::new(
        NodeKind::ProcessingInstruction,
        Some(QName::local(target)),
        Some(data.to_string()),
    )
}

pub fn ns(prefix: &str, uri: &str) -> SimpleNode {
    SimpleNode::new(
        NodeKind::Namespace,
        Some(QName {
            prefix: Some(prefix.to_string()),
            local: prefix.to_string(),
            ns_uri: Some(uri.to_string()),
        }),
        Some(uri.to_string()),
    )
}

impl XdmNode for SimpleNode {
    fn kind(&self) -> NodeKind {
        self.0.kind
    }

    fn name(&self) -> Option<QName> {
        self.0.name.clone()
    }

    fn string_value(&self) -> String {
        match self.kind() {
            NodeKind::Text
            | NodeKind::Attribute
            | NodeKind::Comment
            | NodeKind::ProcessingInstruction
            | NodeKind::Namespace => self.0.value.clone().unwrap_or_default(),
            NodeKind::Element | NodeKind::Document => {
                fn dfs(n: &SimpleNode, out: &mut String) {
                    if n.kind() == NodeKind::Text {
                        if let Some(v) = &n.0.value {
                            out.push_str(v);
                        }
                    }
                    for c in n.children() {
                        dfs(&c, out);
                    }
                }
                let mut out = String::new();
                dfs(self, &mut out);
                out
            }
        }
    }

    fn parent(&self) -> Option<Self> {
        self.0
            .parent
            .read()
            .ok()?
            .as_ref()
            .and_then(Weak::upgrade)
            .map(SimpleNode)
    }

    fn children(&self) -> Vec<Self> {
        self.0.children.read().map(|v| v.clone()).unwrap_or_default()
    }

    fn attributes(&self) -> Vec<Self> {
        self.0
            .attributes
            .read()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    fn namespaces(&self) -> Vec<Self> {
        self.0
            .namespaces
            .read()
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_equality() {
        let a = elem("x").build();
        let b = elem("x").build();
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn parent_links_are_wired_by_build() {
        let d = doc().child(elem("r").child(elem("c"))).build();
        let r = d.children()[0].clone();
        let c = r.children()[0].clone();
        assert_eq!(c.parent(), Some(r.clone()));
        assert_eq!(r.parent(), Some(d.clone()));
        assert_eq!(c.document_root(), d);
    }

    #[test]
    fn attributes_precede_children_in_document_order() {
        let r = elem("r").attr(attr("a", "1")).child(elem("c")).build();
        let a = r.attributes()[0].clone();
        let c = r.children()[0].clone();
        assert_eq!(
            a.compare_document_order(&c).unwrap(),
            core::cmp::Ordering::Less
        );
    }
}
