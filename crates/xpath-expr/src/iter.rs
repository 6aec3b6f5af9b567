//! Pull-mode sequence iteration.
//!
//! Iterators are restartable only by asking the expression for a fresh one;
//! an exhausted iterator stays exhausted. Consumers abandoning an iterator
//! early should call [`SequenceIter::close`] so underlying resources can be
//! released; this is cooperative, not enforced.

use crate::error::Error;
use crate::model::XdmNode;
use crate::xdm::{Item, Value};

pub trait SequenceIter<N: XdmNode> {
    /// Deliver the next item, `None` at the end, or a dynamic error.
    /// Bounded, non-blocking work per call; not reentrant.
    fn next_item(&mut self) -> Result<Option<Item<N>>, Error>;

    /// Release underlying resources when abandoning iteration early.
    fn close(&mut self) {}
}

/// Owned boxed iterator, possibly borrowing the expression tree it came from.
pub type BoxIter<'a, N> = Box<dyn SequenceIter<N> + 'a>;

/// At most one item.
pub struct SingletonIter<N: XdmNode>(Option<Item<N>>);

impl<N: XdmNode> SingletonIter<N> {
    pub fn new(item: Option<Item<N>>) -> Self {
        Self(item)
    }
}

impl<N: XdmNode> SequenceIter<N> for SingletonIter<N> {
    fn next_item(&mut self) -> Result<Option<Item<N>>, Error> {
        Ok(self.0.take())
    }
}

/// Iterates a materialized [`Value`].
pub struct ValueIter<N: XdmNode> {
    value: Value<N>,
    pos: usize,
}

impl<N: XdmNode> ValueIter<N> {
    pub fn new(value: Value<N>) -> Self {
        Self { value, pos: 0 }
    }
}

impl<N: XdmNode> SequenceIter<N> for ValueIter<N> {
    fn next_item(&mut self) -> Result<Option<Item<N>>, Error> {
        let item = self.value.items().get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        Ok(item)
    }
}

/// Iterates a vector of already-computed items.
pub struct ItemsIter<N: XdmNode> {
    items: std::vec::IntoIter<Item<N>>,
}

impl<N: XdmNode> ItemsIter<N> {
    pub fn new(items: Vec<Item<N>>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }
}

impl<N: XdmNode> SequenceIter<N> for ItemsIter<N> {
    fn next_item(&mut self) -> Result<Option<Item<N>>, Error> {
        Ok(self.items.next())
    }
}

/// Yields the underlying items in reverse. Materializes the input on the
/// first call; an error anywhere in the input surfaces immediately.
pub struct ReverseIter<'a, N: XdmNode> {
    input: Option<BoxIter<'a, N>>,
    buffered: Vec<Item<N>>,
}

impl<'a, N: XdmNode> ReverseIter<'a, N> {
    pub fn new(input: BoxIter<'a, N>) -> Self {
        Self {
            input: Some(input),
            buffered: Vec::new(),
        }
    }
}

impl<'a, N: XdmNode> SequenceIter<N> for ReverseIter<'a, N> {
    fn next_item(&mut self) -> Result<Option<Item<N>>, Error> {
        if let Some(mut input) = self.input.take() {
            while let Some(item) = input.next_item()? {
                self.buffered.push(item);
            }
        }
        Ok(self.buffered.pop())
    }

    fn close(&mut self) {
        if let Some(input) = self.input.as_mut() {
            input.close();
        }
    }
}

/// Yields at most the first item of the input, then closes it so the
/// producer can stop early.
pub struct FirstMatchIter<'a, N: XdmNode> {
    input: Option<BoxIter<'a, N>>,
}

impl<'a, N: XdmNode> FirstMatchIter<'a, N> {
    pub fn new(input: BoxIter<'a, N>) -> Self {
        Self { input: Some(input) }
    }
}

impl<'a, N: XdmNode> SequenceIter<N> for FirstMatchIter<'a, N> {
    fn next_item(&mut self) -> Result<Option<Item<N>>, Error> {
        match self.input.take() {
            Some(mut input) => {
                let item = input.next_item()?;
                input.close();
                Ok(item)
            }
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        if let Some(input) = self.input.as_mut() {
            input.close();
        }
    }
}

/// Drain an iterator into a reduced value, closing it on error.
pub fn materialize<N: XdmNode>(mut iter: BoxIter<'_, N>) -> Result<Value<N>, Error> {
    let mut items = Vec::new();
    loop {
        match iter.next_item() {
            Ok(Some(item)) => items.push(item),
            Ok(None) => break,
            Err(e) => {
                iter.close();
                return Err(e);
            }
        }
    }
    Ok(Value::from_items(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simple_node::SimpleNode;
    use crate::xdm::AtomicValue;

    fn ints(ns: &[i64]) -> Vec<Item<SimpleNode>> {
        ns.iter()
            .map(|n| Item::Atomic(AtomicValue::Integer(*n)))
            .collect()
    }

    #[test]
    fn reverse_iter_reverses() {
        let inner: BoxIter<'_, SimpleNode> = Box::new(ItemsIter::new(ints(&[1, 2, 3])));
        let mut rev = ReverseIter::new(inner);
        let mut out = Vec::new();
        while let Some(item) = rev.next_item().unwrap() {
            out.push(item);
        }
        assert_eq!(out, ints(&[3, 2, 1]));
    }

    #[test]
    fn first_match_takes_one_and_stops() {
        let inner: BoxIter<'_, SimpleNode> = Box::new(ItemsIter::new(ints(&[7, 8])));
        let mut first = FirstMatchIter::new(inner);
        assert_eq!(
            first.next_item().unwrap(),
            Some(Item::Atomic(AtomicValue::Integer(7)))
        );
        assert_eq!(first.next_item().unwrap(), None);
    }

    #[test]
    fn materialize_reduces() {
        let inner: BoxIter<'_, SimpleNode> = Box::new(ItemsIter::new(ints(&[5])));
        let v = materialize(inner).unwrap();
        assert!(matches!(v, Value::One(_)));
    }
}
