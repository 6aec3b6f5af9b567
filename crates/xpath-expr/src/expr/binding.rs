//! References to bound components and local variables.
//!
//! A component reference holds a slot number into the binding vector, never
//! a direct pointer, so package overrides can retarget the slot without
//! touching compiled expressions. Component bodies are evaluated with no
//! focus; a failure while computing a variable's value is flagged as a
//! global-initialization error so no local try/catch absorbs it.

use crate::component::ComponentKind;
use crate::context::DynamicContext;
use crate::error::{Error, ErrorCode, Location};
use crate::expr::{Expr, ExprKind};
use crate::iter::{BoxIter, ValueIter};
use crate::model::{ExpandedName, XdmNode};
use crate::types::{Cardinality, ItemType, SequenceType};

/// A reference to a component through its binding slot.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingRefExpr {
    pub slot: usize,
    pub name: crate::component::SymbolicName,
    pub declared_type: Option<SequenceType>,
}

impl BindingRefExpr {
    pub fn new(slot: usize, name: crate::component::SymbolicName) -> Self {
        Self {
            slot,
            name,
            declared_type: None,
        }
    }

    #[must_use]
    pub fn with_declared_type(mut self, ty: SequenceType) -> Self {
        self.declared_type = Some(ty);
        self
    }

    pub fn into_expr<N: XdmNode>(self) -> Expr<N> {
        Expr::new(ExprKind::BindingRef(self))
    }

    pub(super) fn static_cardinality(&self) -> Cardinality {
        self.declared_type
            .as_ref()
            .map_or(Cardinality::ZeroOrMore, |t| t.cardinality)
    }

    pub(super) fn static_item_type(&self) -> ItemType {
        self.declared_type
            .as_ref()
            .map_or(ItemType::AnyItem, |t| t.item_type.clone())
    }

    pub(super) fn iterate<'a, N: XdmNode>(
        &'a self,
        ctx: &DynamicContext<N>,
        loc: Location,
    ) -> Result<BoxIter<'a, N>, Error> {
        let binding = ctx
            .bindings()
            .get(self.slot)
            .map_err(|e| e.maybe_with_location(loc))?;
        let component = binding.target().clone();
        let is_variable = component.symbolic_name.kind == ComponentKind::Variable;
        let value = component
            .body
            .evaluate(&ctx.without_focus())
            .map_err(|e| {
                let e = e.maybe_with_location(loc);
                if is_variable { e.as_global() } else { e }
            })?;
        if let Some(declared) = &component.declared_type {
            if !declared.cardinality.admits(value.len()) {
                return Err(Error::dynamic_type(
                    ErrorCode::XPTY0004,
                    format!(
                        "the value of {} does not satisfy its declared type {declared}",
                        component.symbolic_name
                    ),
                )
                .with_location(loc));
            }
        }
        Ok(Box::new(ValueIter::new(value)))
    }
}

/// A reference to a local variable slot in the dynamic context.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalRefExpr {
    pub slot: usize,
    pub name: ExpandedName,
    pub declared_type: SequenceType,
}

impl LocalRefExpr {
    pub fn new(slot: usize, name: ExpandedName, declared_type: SequenceType) -> Self {
        Self {
            slot,
            name,
            declared_type,
        }
    }

    pub fn into_expr<N: XdmNode>(self) -> Expr<N> {
        Expr::new(ExprKind::LocalRef(self))
    }

    pub(super) fn iterate<'a, N: XdmNode>(
        &'a self,
        ctx: &DynamicContext<N>,
        loc: Location,
    ) -> Result<BoxIter<'a, N>, Error> {
        match ctx.local_slot(self.slot) {
            Some(value) => Ok(Box::new(ValueIter::new(value.clone()))),
            None => Err(Error::dynamic(
                ErrorCode::XPST0017,
                format!("no value is bound for ${}", self.name),
            )
            .with_location(loc)),
        }
    }
}
