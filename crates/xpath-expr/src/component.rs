//! Components and binding slots.
//!
//! A [`Component`] wraps a compiled callable or variable body together with
//! its visibility and the package that declared it. Call sites never point
//! at a component directly; they hold a slot number into a
//! [`BindingVector`], so a package override can swap the target of a slot
//! without recompiling any referencing expression.

use crate::error::{Error, ErrorCode};
use crate::expr::Expr;
use crate::model::{ExpandedName, XdmNode};
use crate::types::SequenceType;
use core::fmt;
use std::sync::Arc;

/// Kind of thing a symbolic name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Variable,
    Function,
    Template,
}

/// Declared visibility of a component within its package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
    Final,
    Abstract,
}

/// Reference key: name plus kind plus (for functions) arity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolicName {
    pub kind: ComponentKind,
    pub name: ExpandedName,
    pub arity: Option<usize>,
}

impl SymbolicName {
    pub fn variable(name: ExpandedName) -> Self {
        Self {
            kind: ComponentKind::Variable,
            name,
            arity: None,
        }
    }

    pub fn function(name: ExpandedName, arity: usize) -> Self {
        Self {
            kind: ComponentKind::Function,
            name,
            arity: Some(arity),
        }
    }
}

impl fmt::Display for SymbolicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arity {
            Some(a) => write!(f, "{}#{a}", self.name),
            None => write!(f, "${}", self.name),
        }
    }
}

/// Identity of the package that declared or owns a component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageId {
    pub name: String,
}

impl PackageId {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A compiled callable or variable body plus its declaration metadata.
#[derive(Debug, Clone)]
pub struct Component<N: XdmNode> {
    pub symbolic_name: SymbolicName,
    pub body: Expr<N>,
    pub declared_type: Option<SequenceType>,
    pub visibility: Visibility,
    pub declaring_package: PackageId,
}

impl<N: XdmNode> Component<N> {
    pub fn variable(
        name: ExpandedName,
        body: Expr<N>,
        declaring_package: PackageId,
    ) -> Self {
        Self {
            symbolic_name: SymbolicName::variable(name),
            body,
            declared_type: None,
            visibility: Visibility::Public,
            declaring_package,
        }
    }

    #[must_use]
    pub fn with_declared_type(mut self, ty: SequenceType) -> Self {
        self.declared_type = Some(ty);
        self
    }

    #[must_use]
    pub fn with_visibility(mut self, v: Visibility) -> Self {
        self.visibility = v;
        self
    }
}

/// One slot of the binding vector: the symbolic name it was compiled
/// against, whether it may still be overridden, and the current target.
#[derive(Debug, Clone)]
pub struct ComponentBinding<N: XdmNode> {
    pub symbolic_name: SymbolicName,
    pub is_final: bool,
    target: Arc<Component<N>>,
}

impl<N: XdmNode> ComponentBinding<N> {
    pub fn target(&self) -> &Arc<Component<N>> {
        &self.target
    }
}

/// The per-compiled-unit vector of resolved bindings. Slot numbers are
/// assigned once at resolution time and embedded in referencing
/// expressions; thereafter only the targets may change.
#[derive(Debug, Clone, Default)]
pub struct BindingVector<N: XdmNode> {
    slots: Vec<ComponentBinding<N>>,
}

impl<N: XdmNode> BindingVector<N> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Resolve a symbolic name to a component, returning the slot number
    /// the call site should embed.
    pub fn bind(&mut self, target: Arc<Component<N>>, is_final: bool) -> usize {
        let slot = self.slots.len();
        self.slots.push(ComponentBinding {
            symbolic_name: target.symbolic_name.clone(),
            is_final,
            target,
        });
        slot
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, slot: usize) -> Result<&ComponentBinding<N>, Error> {
        self.slots.get(slot).ok_or_else(|| {
            Error::dynamic(
                ErrorCode::XPST0017,
                format!("no component bound at slot {slot}"),
            )
        })
    }

    /// Replace the target of a slot (package override). The referencing
    /// expressions are untouched; rebinding a final slot is refused.
    pub fn rebind(
        &mut self,
        slot: usize,
        new_target: Arc<Component<N>>,
    ) -> Result<(), Error> {
        let binding = self.slots.get_mut(slot).ok_or_else(|| {
            Error::static_err(
                ErrorCode::XPST0017,
                format!("no component bound at slot {slot}"),
            )
        })?;
        if binding.is_final {
            return Err(Error::static_err(
                ErrorCode::XPST0017,
                format!("binding for {} is final", binding.symbolic_name),
            ));
        }
        binding.target = new_target;
        Ok(())
    }
}
