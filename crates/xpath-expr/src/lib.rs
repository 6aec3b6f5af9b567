//! Static analysis and evaluation core for XPath expression trees.
//!
//! An external parser produces an [`expr::Expr`] tree; [`expr::analyze`]
//! runs the three-phase pipeline (simplify, type check, optimize) against a
//! [`context::StaticContext`], and the resulting tree evaluates against any
//! number of [`context::DynamicContext`] values, in pull, single-item, or
//! push mode. Trees are generic over the node implementation through
//! [`model::XdmNode`]; [`simple_node::SimpleNode`] is a ready-made in-memory
//! implementation for tests and small tools.

pub mod component;
pub mod context;
pub mod error;
pub mod explain;
pub mod expr;
pub mod iter;
pub mod model;
pub mod simple_node;
pub mod types;
pub mod xdm;

pub use component::{BindingVector, Component, ComponentKind, SymbolicName, Visibility};
pub use context::{
    ContextItemStaticInfo, DynamicContext, DynamicContextBuilder, Receiver,
    SequenceCollector, StaticContext, StaticContextBuilder,
};
pub use error::{Error, ErrorCode, ErrorKind, Location, Warning};
pub use expr::{Axis, Expr, ExprKind, analyze};
pub use model::{ExpandedName, NodeKind, QName, XdmNode};
pub use simple_node::{SimpleNode, SimpleNodeBuilder, attr, doc, elem, ns, text};
pub use types::{Cardinality, ItemType, NodeTest, SequenceType};
pub use xdm::{AtomicValue, Item, Value};
