//! Structured static/dynamic errors and advisory warnings.
//!
//! Every failure raised by analysis or evaluation carries a stable W3C-style
//! error code, a static/dynamic classification, and a source location. The
//! driver owns error reporting; `Error` values themselves are immutable and
//! carry no reporting state.

use crate::model::ExpandedName;
use core::fmt;

/// Namespace that qualifies error codes when they are matched as QNames
/// (for example by a try/catch name test).
pub const ERR_NS: &str = "http://www.w3.org/2005/xqt-errors";

/// Canonicalized set of XPath/XQuery error codes this crate emits.
///
/// Expansion strategy follows the usual rule: introduce variants when first
/// needed, keep `Unknown` as a safe fallback for codes produced elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// General type error.
    XPTY0004,
    /// Path result mixes nodes and atomic values.
    XPTY0018,
    /// Path step applied to an atomic-valued sequence.
    XPTY0019,
    /// Axis step where the context item is not a node.
    XPTY0020,
    /// Context item is absent.
    XPDY0002,
    /// Root step ("/") in a tree whose root is not a document node.
    XPDY0050,
    /// Static syntax/grammar error (raised by the external parser).
    XPST0003,
    /// Expression can only ever evaluate to the empty sequence.
    XPST0005,
    /// Unknown function or component reference.
    XPST0017,
    /// Invalid lexical value for a cast.
    FORG0001,
    /// Effective boolean value undefined for the sequence.
    FORG0006,
    /// Division by zero.
    FOAR0001,
    /// Numeric overflow.
    FOAR0002,
    /// Item has no typed value (atomization failure).
    FOTY0012,
    /// Unidentified error (fn:error default).
    FOER0000,
    /// Fallback for codes not produced by this crate.
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        use ErrorCode::*;
        match self {
            XPTY0004 => "err:XPTY0004",
            XPTY0018 => "err:XPTY0018",
            XPTY0019 => "err:XPTY0019",
            XPTY0020 => "err:XPTY0020",
            XPDY0002 => "err:XPDY0002",
            XPDY0050 => "err:XPDY0050",
            XPST0003 => "err:XPST0003",
            XPST0005 => "err:XPST0005",
            XPST0017 => "err:XPST0017",
            FORG0001 => "err:FORG0001",
            FORG0006 => "err:FORG0006",
            FOAR0001 => "err:FOAR0001",
            FOAR0002 => "err:FOAR0002",
            FOTY0012 => "err:FOTY0012",
            FOER0000 => "err:FOER0000",
            Unknown => "err:UNKNOWN",
        }
    }

    /// Local part of the code, without the `err:` prefix.
    pub fn local_name(&self) -> &'static str {
        let s = self.as_str();
        &s[4..]
    }

    /// The code expressed as an expanded QName in the xqt-errors namespace,
    /// which is how try/catch name tests match it.
    pub fn as_qname(&self) -> ExpandedName {
        ExpandedName::new(Some(ERR_NS.to_string()), self.local_name())
    }

    pub fn from_code(s: &str) -> Self {
        use ErrorCode::*;
        match s {
            "err:XPTY0004" | "XPTY0004" => XPTY0004,
            "err:XPTY0018" | "XPTY0018" => XPTY0018,
            "err:XPTY0019" | "XPTY0019" => XPTY0019,
            "err:XPTY0020" | "XPTY0020" => XPTY0020,
            "err:XPDY0002" | "XPDY0002" => XPDY0002,
            "err:XPDY0050" | "XPDY0050" => XPDY0050,
            "err:XPST0003" | "XPST0003" => XPST0003,
            "err:XPST0005" | "XPST0005" => XPST0005,
            "err:XPST0017" | "XPST0017" => XPST0017,
            "err:FORG0001" | "FORG0001" => FORG0001,
            "err:FORG0006" | "FORG0006" => FORG0006,
            "err:FOAR0001" | "FOAR0001" => FOAR0001,
            "err:FOAR0002" | "FOAR0002" => FOAR0002,
            "err:FOTY0012" | "FOTY0012" => FOTY0012,
            "err:FOER0000" | "FOER0000" => FOER0000,
            _ => Unknown,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an error was provable at analysis time or only surfaced during
/// evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Static,
    Dynamic,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Static => "static",
            ErrorKind::Dynamic => "dynamic",
        })
    }
}

/// Source position of an expression, resolved against the original query
/// text by the (external) parser. Zeroes mean unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub const UNKNOWN: Location = Location { line: 0, column: 0 };

    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            f.write_str("?:?")
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// A structured analysis or evaluation failure.
///
/// `global` marks errors raised while initializing a global component
/// (typically a global variable); such errors must not be absorbed by a
/// local try/catch and are stripped of the flag when they pass one.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} error {code}: {message} at {location}")]
pub struct Error {
    pub code: ErrorCode,
    pub kind: ErrorKind,
    pub is_type_error: bool,
    pub message: String,
    pub location: Location,
    pub global: bool,
}

impl Error {
    pub fn static_err(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            kind: ErrorKind::Static,
            is_type_error: false,
            message: message.into(),
            location: Location::UNKNOWN,
            global: false,
        }
    }

    /// A static error that is additionally a type error (XPTY/XPDY family
    /// detected during type checking).
    pub fn type_err(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            is_type_error: true,
            ..Self::static_err(code, message)
        }
    }

    pub fn dynamic(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            kind: ErrorKind::Dynamic,
            is_type_error: false,
            message: message.into(),
            location: Location::UNKNOWN,
            global: false,
        }
    }

    /// A dynamic error that is also classified as a type error.
    pub fn dynamic_type(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            is_type_error: true,
            ..Self::dynamic(code, message)
        }
    }

    pub fn is_static_error(&self) -> bool {
        self.kind == ErrorKind::Static
    }

    /// Attach a location unless one is already present. Frames enrich errors
    /// on the way out but never overwrite an earlier, more precise position.
    #[must_use]
    pub fn maybe_with_location(mut self, loc: Location) -> Self {
        if self.location.is_unknown() {
            self.location = loc;
        }
        self
    }

    #[must_use]
    pub fn with_location(mut self, loc: Location) -> Self {
        self.location = loc;
        self
    }

    /// Flag this error as arising from global-component initialization.
    #[must_use]
    pub fn as_global(mut self) -> Self {
        self.global = true;
        self
    }

    /// Strip the global flag (done by the first try/catch the error passes).
    #[must_use]
    pub fn as_local(mut self) -> Self {
        self.global = false;
        self
    }

    /// The error code as a qualified name, for catch-clause matching.
    pub fn code_qname(&self) -> ExpandedName {
        self.code.as_qname()
    }
}

/// An advisory diagnostic: the expression is permitted but provably useless
/// (dead axis step, comparison that can never succeed). Warnings never abort
/// analysis and never change semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub message: String,
    pub location: Location,
}

impl Warning {
    pub fn new(message: impl Into<String>, location: Location) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning: {} at {}", self.message, self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trips_through_string_form() {
        for code in [
            ErrorCode::XPTY0020,
            ErrorCode::XPDY0002,
            ErrorCode::FORG0001,
        ] {
            assert_eq!(ErrorCode::from_code(code.as_str()), code);
        }
    }

    #[test]
    fn code_qname_lives_in_error_namespace() {
        let q = ErrorCode::XPDY0050.as_qname();
        assert_eq!(q.ns_uri.as_deref(), Some(ERR_NS));
        assert_eq!(q.local, "XPDY0050");
    }

    #[test]
    fn location_enrichment_does_not_overwrite() {
        let e = Error::dynamic(ErrorCode::XPDY0002, "context absent")
            .with_location(Location::new(3, 14))
            .maybe_with_location(Location::new(9, 9));
        assert_eq!(e.location, Location::new(3, 14));
    }

    #[test]
    fn global_flag_strips() {
        let e = Error::dynamic(ErrorCode::FOER0000, "boom").as_global();
        assert!(e.global);
        assert!(!e.as_local().global);
    }
}
