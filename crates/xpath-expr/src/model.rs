//! Node-navigation collaborator interface.
//!
//! The expression core never owns a tree representation; it consumes nodes
//! through [`XdmNode`]. Implementations must provide identity-based equality
//! (two handles are equal iff they denote the same node in the same tree).

use crate::error::{Error, ErrorCode};
use core::cmp::Ordering;
use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
    Namespace,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Document => "document-node",
            NodeKind::Element => "element",
            NodeKind::Attribute => "attribute",
            NodeKind::Text => "text",
            NodeKind::Comment => "comment",
            NodeKind::ProcessingInstruction => "processing-instruction",
            NodeKind::Namespace => "namespace-node",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lexical QName as carried by nodes (prefix retained for diagnostics).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub ns_uri: Option<String>,
}

impl QName {
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: name.into(),
            ns_uri: None,
        }
    }

    pub fn expanded(&self) -> ExpandedName {
        ExpandedName {
            ns_uri: self.ns_uri.clone(),
            local: self.local.clone(),
        }
    }
}

/// Prefix-free name used wherever names are compared: node tests, variable
/// and component references, error-code matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedName {
    pub ns_uri: Option<String>,
    pub local: String,
}

impl ExpandedName {
    pub fn new(ns_uri: Option<String>, local: impl Into<String>) -> Self {
        Self {
            ns_uri,
            local: local.into(),
        }
    }

    pub fn local_only(local: impl Into<String>) -> Self {
        Self::new(None, local)
    }
}

impl fmt::Display for ExpandedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns_uri {
            Some(ns) => write!(f, "Q{{{}}}{}", ns, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Read-only navigation interface over a concrete tree implementation.
///
/// Equality is node identity, not structural equality; the expression core
/// relies on this for node-set semantics and literal comparison.
pub trait XdmNode: Clone + Eq + fmt::Debug + Send + Sync + 'static {
    fn kind(&self) -> NodeKind;
    fn name(&self) -> Option<QName>;
    fn string_value(&self) -> String;
    fn base_uri(&self) -> Option<String> {
        None
    }

    fn parent(&self) -> Option<Self>;
    fn children(&self) -> Vec<Self>;
    fn attributes(&self) -> Vec<Self>;
    fn namespaces(&self) -> Vec<Self>;

    /// The root ancestor of this node (the node itself if parentless).
    fn document_root(&self) -> Self {
        let mut cur = self.clone();
        while let Some(p) = cur.parent() {
            cur = p;
        }
        cur
    }

    /// Default document order comparison uses ancestry and sibling order.
    /// Adapters with multi-root trees or cheap order keys should override.
    fn compare_document_order(&self, other: &Self) -> Result<Ordering, Error> {
        try_compare_by_ancestry(self, other)
    }
}

/// Fallback comparator for document order based on ancestry and stable
/// sibling ordering.
///
/// - If one node is an ancestor of the other, the ancestor precedes it.
/// - Among siblings, attributes come first, then namespaces, then children;
///   within each group the adapter's order is preserved.
/// - Nodes under different roots cannot be ordered and raise `err:FOER0000`.
pub fn try_compare_by_ancestry<N: XdmNode>(a: &N, b: &N) -> Result<Ordering, Error> {
    if a == b {
        return Ok(Ordering::Equal);
    }
    fn path_to_root<N: XdmNode>(mut n: N) -> Vec<N> {
        let mut p = vec![n.clone()];
        while let Some(parent) = n.parent() {
            p.push(parent.clone());
            n = parent;
        }
        p.reverse();
        p
    }
    let pa = path_to_root(a.clone());
    let pb = path_to_root(b.clone());
    let mut i = 0usize;
    let len = core::cmp::min(pa.len(), pb.len());
    while i < len && pa[i] == pb[i] {
        i += 1;
    }
    if i == len {
        // One path is a prefix of the other: the shorter is the ancestor.
        return Ok(if pa.len() < pb.len() {
            Ordering::Less
        } else {
            Ordering::Greater
        });
    }
    if i == 0 {
        return Err(Error::dynamic(
            ErrorCode::FOER0000,
            "document order is undefined across different roots",
        ));
    }
    let parent = &pa[i - 1];
    let mut sibs: Vec<N> = Vec::new();
    sibs.extend(parent.attributes());
    sibs.extend(parent.namespaces());
    sibs.extend(parent.children());
    let posa = sibs.iter().position(|n| n == &pa[i]);
    let posb = sibs.iter().position(|n| n == &pb[i]);
    Ok(match (posa, posb) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => Ordering::Equal,
    })
}
