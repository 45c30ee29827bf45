//! Ordered, suspendable iteration over a [`crate::VebMap`].
//!
//! The iterator's state is exactly `(map, current_key)`: each `next()` call
//! is one `successor` lookup against the vEB index, so the sequence it
//! yields is always strictly ascending by key. Because the map is
//! immutable, an `Iter` can be paused (dropped or simply not polled) and
//! resumed later without any risk of missing or repeating a key: nothing
//! about the map it points at can change underneath it.

use crate::veb::Key;
use crate::VebMap;

/// A cursor over a [`VebMap`]'s entries in ascending key order.
///
/// Borrows the map for its lifetime; build one with [`VebMap::iter`].
pub struct Iter<'a, V> {
    map: &'a VebMap<V>,
    cursor: Option<Key>,
    started: bool,
}

impl<'a, V> Iter<'a, V> {
    pub(crate) fn new(map: &'a VebMap<V>) -> Self {
        Iter { map, cursor: None, started: false }
    }

    /// Advance the cursor by one element. Equivalent to `next()`, exposed
    /// under the name used by the suspend/resume protocol this iterator
    /// implements: call it, inspect the result, and stop calling whenever
    /// you like.
    pub fn advance(&mut self) -> Option<(Key, V)>
    where
        V: Clone,
    {
        self.next()
    }
}

impl<'a, V: Clone> Iterator for Iter<'a, V> {
    type Item = (Key, V);

    fn next(&mut self) -> Option<Self::Item> {
        let next_key = if !self.started {
            self.started = true;
            self.map.veb().min()
        } else {
            self.cursor.and_then(|k| self.map.veb().successor(k))
        };
        self.cursor = next_key;
        next_key.map(|k| {
            let v = self
                .map
                .raw_map()
                .get(&k)
                .cloned()
                .expect("coupling invariant: every veb key has a map value");
            (k, v)
        })
    }
}

impl<'a, V: Clone> IntoIterator for &'a VebMap<V> {
    type Item = (Key, V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
