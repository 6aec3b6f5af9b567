//! try/catch over dynamic errors.
//!
//! The protected expression is evaluated eagerly: errors must not escape
//! the construct by being deferred into a lazy iterator a consumer pulls
//! later. Only dynamic errors are catchable. Errors raised while a global
//! component was being initialized pass through the first try/catch
//! untouched apart from losing their global flag.

use crate::context::{ContextItemStaticInfo, DynamicContext, ExpressionVisitor};
use crate::error::{Error, ErrorKind, Location};
use crate::explain::ExplainNode;
use crate::expr::{Expr, ExprKind};
use crate::iter::{BoxIter, ValueIter};
use crate::model::{ExpandedName, XdmNode};
use core::fmt;
use itertools::Itertools;
use std::sync::Arc;

/// A name test over error codes, as written in a catch clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QNameTest {
    /// `*`
    Any,
    /// A fully qualified name.
    Name(ExpandedName),
    /// `prefix:*`, any local name within one namespace.
    AnyInNamespace(String),
    /// `*:local`, one local name in any namespace.
    AnyLocal(String),
}

impl QNameTest {
    pub fn matches(&self, name: &ExpandedName) -> bool {
        match self {
            QNameTest::Any => true,
            QNameTest::Name(n) => n == name,
            QNameTest::AnyInNamespace(ns) => name.ns_uri.as_deref() == Some(ns.as_str()),
            QNameTest::AnyLocal(local) => name.local == *local,
        }
    }
}

impl fmt::Display for QNameTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QNameTest::Any => f.write_str("*"),
            QNameTest::Name(n) => write!(f, "{n}"),
            QNameTest::AnyInNamespace(ns) => write!(f, "Q{{{ns}}}*"),
            QNameTest::AnyLocal(local) => write!(f, "*:{local}"),
        }
    }
}

/// One catch clause: the error-code tests it covers and its handler body.
#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause<N: XdmNode> {
    pub tests: Vec<QNameTest>,
    pub body: Box<Expr<N>>,
}

impl<N: XdmNode> CatchClause<N> {
    pub fn new(tests: Vec<QNameTest>, body: Expr<N>) -> Self {
        Self {
            tests,
            body: Box::new(body),
        }
    }

    /// Catch everything.
    pub fn catch_all(body: Expr<N>) -> Self {
        Self::new(vec![QNameTest::Any], body)
    }

    pub fn matches(&self, code: &ExpandedName) -> bool {
        self.tests.iter().any(|t| t.matches(code))
    }

    pub(super) fn explain(&self) -> ExplainNode {
        let codes = self.tests.iter().map(ToString::to_string).join(" ");
        ExplainNode::new("catch")
            .attr("errors", codes)
            .child(self.body.explain())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryCatchExpr<N: XdmNode> {
    pub try_expr: Box<Expr<N>>,
    pub clauses: Vec<CatchClause<N>>,
}

impl<N: XdmNode> TryCatchExpr<N> {
    pub fn new(try_expr: Expr<N>, clauses: Vec<CatchClause<N>>) -> Self {
        Self {
            try_expr: Box::new(try_expr),
            clauses,
        }
    }

    pub fn into_expr(self) -> Expr<N> {
        Expr::new(ExprKind::TryCatch(self))
    }

    pub(super) fn simplify(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.try_expr = Box::new(self.try_expr.simplify(visitor)?);
        for clause in &mut self.clauses {
            let body = std::mem::replace(&mut *clause.body, Expr::empty());
            *clause.body = body.simplify(visitor)?;
        }
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn type_check(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.try_expr = Box::new(self.try_expr.type_check(visitor, context_info)?);
        for clause in &mut self.clauses {
            let body = std::mem::replace(&mut *clause.body, Expr::empty());
            *clause.body = body.type_check(visitor, context_info)?;
        }
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn optimize(
        mut self,
        visitor: &mut ExpressionVisitor<'_>,
        context_info: &ContextItemStaticInfo,
        loc: Location,
    ) -> Result<Expr<N>, Error> {
        self.try_expr = Box::new(self.try_expr.optimize(visitor, context_info)?);
        for clause in &mut self.clauses {
            let body = std::mem::replace(&mut *clause.body, Expr::empty());
            *clause.body = body.optimize(visitor, context_info)?;
        }
        // A literal cannot raise anything; the handlers are dead.
        if self.try_expr.is_literal() {
            return Ok(*self.try_expr);
        }
        Ok(self.into_expr().at(loc))
    }

    pub(super) fn iterate<'a>(
        &'a self,
        ctx: &DynamicContext<N>,
        loc: Location,
    ) -> Result<BoxIter<'a, N>, Error> {
        // Eager evaluation: a deferred error inside a lazy iterator would
        // escape the catch scope.
        match self.try_expr.evaluate(&ctx.new_minor_context()) {
            Ok(value) => Ok(Box::new(ValueIter::new(value))),
            Err(e) if e.global => Err(e.as_local()),
            Err(e) if e.kind == ErrorKind::Static => Err(e),
            Err(e) => {
                let code = e.code_qname();
                for clause in &self.clauses {
                    if clause.matches(&code) {
                        let handler_ctx = ctx.with_caught_error(Arc::new(e));
                        let value = clause
                            .body
                            .evaluate(&handler_ctx)
                            .map_err(|err| err.maybe_with_location(loc))?;
                        return Ok(Box::new(ValueIter::new(value)));
                    }
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ERR_NS, ErrorCode};

    #[test]
    fn name_tests_match_error_codes() {
        let code = ErrorCode::FORG0001.as_qname();
        assert!(QNameTest::Any.matches(&code));
        assert!(QNameTest::Name(code.clone()).matches(&code));
        assert!(QNameTest::AnyInNamespace(ERR_NS.to_string()).matches(&code));
        assert!(QNameTest::AnyLocal("FORG0001".to_string()).matches(&code));
        assert!(!QNameTest::AnyLocal("FORG0006".to_string()).matches(&code));
    }
}
