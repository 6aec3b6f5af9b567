//! The value domain: atomic values, items, and reduced sequences.
//!
//! A [`Value`] is the canonical, immutable result of evaluating an
//! expression: empty, a single item stored without wrapper overhead, or a
//! shared vector of items. This is the fixed point literals wrap.

use crate::error::{Error, ErrorCode};
use crate::model::{ExpandedName, XdmNode};
use crate::types::AtomicType;
use core::fmt;
use std::sync::Arc;

/// Subset of the XDM atomic type universe carried by this core.
///
/// Numeric subtypes are stored distinctly so that instance-of and literal
/// equality can be precise without lossy coercion; the type annotation of a
/// value is its variant.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomicValue {
    Boolean(bool),
    String(String),
    UntypedAtomic(String),
    AnyUri(String),
    Integer(i64),
    Long(i64),
    Int(i32),
    Short(i16),
    Byte(i8),
    Decimal(f64),
    Double(f64),
    Float(f32),
    QName {
        ns_uri: Option<String>,
        prefix: Option<String>,
        local: String,
    },
}

impl AtomicValue {
    pub fn type_label(&self) -> AtomicType {
        use AtomicValue::*;
        match self {
            Boolean(_) => AtomicType::Boolean,
            String(_) => AtomicType::String,
            UntypedAtomic(_) => AtomicType::UntypedAtomic,
            AnyUri(_) => AtomicType::AnyUri,
            Integer(_) => AtomicType::Integer,
            Long(_) => AtomicType::Long,
            Int(_) => AtomicType::Int,
            Short(_) => AtomicType::Short,
            Byte(_) => AtomicType::Byte,
            Decimal(_) => AtomicType::Decimal,
            Double(_) => AtomicType::Double,
            Float(_) => AtomicType::Float,
            QName { .. } => AtomicType::QName,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.type_label().is_numeric()
    }

    /// Numeric value widened to double, when the value is numeric.
    pub fn as_double(&self) -> Option<f64> {
        use AtomicValue::*;
        match self {
            Integer(i) | Long(i) => Some(*i as f64),
            Int(i) => Some(f64::from(*i)),
            Short(i) => Some(f64::from(*i)),
            Byte(i) => Some(f64::from(*i)),
            Decimal(d) | Double(d) => Some(*d),
            Float(f) => Some(f64::from(*f)),
            _ => None,
        }
    }

    /// Lexical (string) form of the value.
    pub fn string_value(&self) -> String {
        use AtomicValue::*;
        match self {
            Boolean(b) => b.to_string(),
            String(s) | UntypedAtomic(s) | AnyUri(s) => s.clone(),
            Integer(i) | Long(i) => i.to_string(),
            Int(i) => i.to_string(),
            Short(i) => i.to_string(),
            Byte(i) => i.to_string(),
            Decimal(d) | Double(d) => format_double(*d),
            Float(f) => format_double(f64::from(*f)),
            QName { prefix, local, .. } => match prefix {
                Some(p) => format!("{p}:{local}"),
                None => local.clone(),
            },
        }
    }

    /// Expanded-name view of a QName value, if this is one.
    pub fn as_qname(&self) -> Option<ExpandedName> {
        match self {
            AtomicValue::QName { ns_uri, local, .. } => {
                Some(ExpandedName::new(ns_uri.clone(), local.clone()))
            }
            _ => None,
        }
    }
}

fn format_double(d: f64) -> String {
    if d == d.trunc() && d.is_finite() && d.abs() < 1e15 {
        format!("{}", d as i64)
    } else {
        format!("{d}")
    }
}

impl fmt::Display for AtomicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string_value())
    }
}

/// An item is either a node or an atomic value.
#[derive(Debug, Clone, PartialEq)]
pub enum Item<N> {
    Node(N),
    Atomic(AtomicValue),
}

impl<N> From<AtomicValue> for Item<N> {
    fn from(a: AtomicValue) -> Self {
        Item::Atomic(a)
    }
}

impl<N: XdmNode> Item<N> {
    pub fn is_node(&self) -> bool {
        matches!(self, Item::Node(_))
    }

    pub fn string_value(&self) -> String {
        match self {
            Item::Node(n) => n.string_value(),
            Item::Atomic(a) => a.string_value(),
        }
    }

    /// XPath atomization: nodes yield their typed value; with no schema in
    /// play that is untypedAtomic over the string value.
    pub fn atomize(&self) -> AtomicValue {
        match self {
            Item::Node(n) => AtomicValue::UntypedAtomic(n.string_value()),
            Item::Atomic(a) => a.clone(),
        }
    }
}

/// A reduced, immutable sequence of items.
///
/// Invariants: `One` never holds what should be `Empty`; `Many` always holds
/// at least two items. Construct through [`Value::from_items`] to maintain
/// this canonical form.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<N> {
    Empty,
    One(Item<N>),
    Many(Arc<Vec<Item<N>>>),
}

impl<N: XdmNode> Value<N> {
    pub fn from_items(mut items: Vec<Item<N>>) -> Self {
        match items.len() {
            0 => Value::Empty,
            1 => Value::One(items.remove(0)),
            _ => Value::Many(Arc::new(items)),
        }
    }

    pub fn one(item: impl Into<Item<N>>) -> Self {
        Value::One(item.into())
    }

    pub fn boolean(b: bool) -> Self {
        Value::One(Item::Atomic(AtomicValue::Boolean(b)))
    }

    pub fn len(&self) -> usize {
        match self {
            Value::Empty => 0,
            Value::One(_) => 1,
            Value::Many(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    pub fn items(&self) -> &[Item<N>] {
        match self {
            Value::Empty => &[],
            Value::One(item) => core::slice::from_ref(item),
            Value::Many(v) => v.as_slice(),
        }
    }

    /// First item, if any.
    pub fn head(&self) -> Option<&Item<N>> {
        self.items().first()
    }

    /// The single item of a zero-or-one valued sequence.
    /// Errors with `err:XPTY0004` when more than one item is present.
    pub fn as_optional_item(&self) -> Result<Option<&Item<N>>, Error> {
        match self {
            Value::Empty => Ok(None),
            Value::One(item) => Ok(Some(item)),
            Value::Many(_) => Err(Error::dynamic_type(
                ErrorCode::XPTY0004,
                "a sequence of more than one item is not allowed here",
            )),
        }
    }

    /// Effective boolean value per the XPath rules: empty is false, a single
    /// node is true, singleton booleans/strings/numbers by their content, and
    /// any other sequence is an error (`err:FORG0006`).
    pub fn effective_boolean_value(&self) -> Result<bool, Error> {
        let items = self.items();
        match items {
            [] => Ok(false),
            [Item::Node(_), ..] => Ok(true),
            [Item::Atomic(a)] => {
                use AtomicValue::*;
                match a {
                    Boolean(b) => Ok(*b),
                    String(s) | UntypedAtomic(s) | AnyUri(s) => Ok(!s.is_empty()),
                    _ => match a.as_double() {
                        Some(d) => Ok(d != 0.0 && !d.is_nan()),
                        None => Err(Error::dynamic(
                            ErrorCode::FORG0006,
                            "effective boolean value is undefined for this value",
                        )),
                    },
                }
            }
            _ => Err(Error::dynamic(
                ErrorCode::FORG0006,
                "effective boolean value is undefined for a multi-item atomic sequence",
            )),
        }
    }
}

impl<N: XdmNode> FromIterator<Item<N>> for Value<N> {
    fn from_iter<T: IntoIterator<Item = Item<N>>>(iter: T) -> Self {
        Value::from_items(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simple_node::{SimpleNode, elem};

    #[test]
    fn value_reduces_to_canonical_form() {
        let v: Value<SimpleNode> = Value::from_items(vec![]);
        assert!(matches!(v, Value::Empty));
        let v: Value<SimpleNode> =
            Value::from_items(vec![Item::Atomic(AtomicValue::Integer(1))]);
        assert!(matches!(v, Value::One(_)));
        let v: Value<SimpleNode> = Value::from_items(vec![
            Item::Atomic(AtomicValue::Integer(1)),
            Item::Atomic(AtomicValue::Integer(2)),
        ]);
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn ebv_of_node_is_true() {
        let n = elem("a").build();
        let v = Value::one(Item::Node(n));
        assert!(v.effective_boolean_value().unwrap());
    }

    #[test]
    fn ebv_of_multi_atomic_is_an_error() {
        let v: Value<SimpleNode> = Value::from_items(vec![
            Item::Atomic(AtomicValue::Integer(1)),
            Item::Atomic(AtomicValue::Integer(2)),
        ]);
        let err = v.effective_boolean_value().unwrap_err();
        assert_eq!(err.code, ErrorCode::FORG0006);
    }

    #[test]
    fn atomizing_a_node_yields_untyped_atomic() {
        let n = elem("a").child_text("42").build();
        let a = Item::Node(n).atomize();
        assert_eq!(a, AtomicValue::UntypedAtomic("42".into()));
    }

    #[test]
    fn integer_and_short_carry_distinct_type_labels() {
        assert_ne!(
            AtomicValue::Integer(3).type_label(),
            AtomicValue::Short(3).type_label()
        );
        assert_eq!(
            AtomicValue::Integer(3).string_value(),
            AtomicValue::Short(3).string_value()
        );
    }
}
