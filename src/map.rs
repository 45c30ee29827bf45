//! The `VebMap` combiner: pairs a vEB tree (`crate::veb::Veb`), which
//! indexes the key set for O(log log U) order queries, with a persistent
//! key->value associative container, which answers point lookups in
//! expected O(1). The two are kept in lockstep by construction (every
//! operation below that touches one touches the other), so `keys(map) ==
//! S(veb)` always holds.
//!
//! Every method takes `&self` and returns a new `VebMap`; nothing here
//! mutates in place. `Veb::clone` and `HashTrieMap::clone` are both O(1)
//! (they share structure via `Rc` and the trie's own persistent nodes
//! respectively), so a `VebMap` is cheap to clone and cheap to fork.

use std::collections::HashSet;
use std::fmt;

use rpds::HashTrieMap;

use crate::error::VebError;
use crate::iter::Iter;
use crate::veb::{Key, ListMode, SizeMode, Veb};

/// A persistent, ordered, integer-keyed associative container.
///
/// `V` need only be `Clone`; the map never requires `V: Copy` or `V:
/// Default`.
#[derive(Debug, Clone)]
pub struct VebMap<V> {
    veb: Veb,
    map: HashTrieMap<Key, V>,
}

impl<V> VebMap<V> {
    /// Build an empty map whose universe is derived from `mode`.
    pub fn new(mode: SizeMode) -> Result<VebMap<V>, VebError> {
        Ok(VebMap { veb: Veb::new(mode)?, map: HashTrieMap::new() })
    }

    fn empty_like(&self) -> VebMap<V> {
        VebMap { veb: Veb::new(SizeMode::ByLogU(self.veb.log_u())).expect("log_u already valid"), map: HashTrieMap::new() }
    }

    /// `2^log_u`, the size of the key universe.
    pub fn capacity(&self) -> u128 {
        self.veb.capacity()
    }

    /// The bit-width of the universe.
    pub fn log_u(&self) -> u32 {
        self.veb.log_u()
    }

    /// Number of entries, in O(1).
    pub fn len(&self) -> usize {
        self.map.size()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Constant-time membership test via the hash index. Never consults
    /// the vEB.
    pub fn has_key(&self, k: Key) -> bool {
        self.map.contains_key(&k)
    }

    pub(crate) fn veb(&self) -> &Veb {
        &self.veb
    }

    pub(crate) fn raw_map(&self) -> &HashTrieMap<Key, V> {
        &self.map
    }

    /// `vebmap[(k)]` without consulting the vEB: `map[k]` if present, else
    /// `default`.
    pub fn get(&self, k: Key, default: V) -> V
    where
        V: Clone,
    {
        self.map.get(&k).cloned().unwrap_or(default)
    }

    /// Same as [`Self::get`] but without requiring a default value.
    pub fn fetch(&self, k: Key) -> Option<V>
    where
        V: Clone,
    {
        self.map.get(&k).cloned()
    }

    /// Like [`Self::fetch`], but fails on a missing key instead of
    /// returning `None`.
    pub fn fetch_strict(&self, k: Key) -> Result<V, VebError>
    where
        V: Clone,
    {
        self.fetch(k).ok_or(VebError::MissingKey(k))
    }

    /// Insert or overwrite `k -> v`. Fails with [`VebError::OutOfRange`]
    /// if `k >= capacity()`; does not expand the universe. Idempotent: if
    /// `k` is already present, the vEB index is unchanged and only the
    /// map value is updated.
    pub fn put(&self, k: Key, v: V) -> Result<VebMap<V>, VebError>
    where
        V: Clone,
    {
        if k as u128 >= self.veb.capacity() {
            return Err(VebError::OutOfRange { key: k, capacity: self.veb.capacity() });
        }
        Ok(VebMap { veb: self.veb.insert(k), map: self.map.insert(k, v) })
    }

    /// Replace the value at `k`, without changing the key set. Absence is
    /// not an error: a missing `k` leaves the map unchanged (this is a
    /// non-strict, total operation, like [`Self::fetch`]).
    pub fn replace(&self, k: Key, v: V) -> VebMap<V>
    where
        V: Clone,
    {
        if !self.has_key(k) {
            return self.clone();
        }
        self.put(k, v).expect("k already validated by has_key")
    }

    /// Like [`Self::replace`], but fails with [`VebError::MissingKey`]
    /// instead of returning the map unchanged when `k` is absent.
    pub fn replace_strict(&self, k: Key, v: V) -> Result<VebMap<V>, VebError>
    where
        V: Clone,
    {
        if !self.has_key(k) {
            return Err(VebError::MissingKey(k));
        }
        self.put(k, v)
    }

    /// Apply `f` to the current value at `k`, replacing it in place.
    /// Absence is not an error: a missing `k` leaves the map unchanged
    /// (this is a non-strict, total operation, like [`Self::fetch`]).
    pub fn update<F>(&self, k: Key, f: F) -> VebMap<V>
    where
        V: Clone,
        F: FnOnce(&V) -> V,
    {
        match self.fetch(k) {
            Some(current) => self.put(k, f(&current)).expect("k already validated by fetch"),
            None => self.clone(),
        }
    }

    /// Like [`Self::update`], but fails with [`VebError::MissingKey`]
    /// instead of returning the map unchanged when `k` is absent.
    pub fn update_strict<F>(&self, k: Key, f: F) -> Result<VebMap<V>, VebError>
    where
        V: Clone,
        F: FnOnce(&V) -> V,
    {
        let current = self.fetch(k).ok_or(VebError::MissingKey(k))?;
        self.put(k, f(&current))
    }

    /// Remove `k`. A no-op (returns an equal map) if `k` is absent.
    pub fn delete(&self, k: Key) -> VebMap<V>
    where
        V: Clone,
    {
        if !self.has_key(k) {
            return self.clone();
        }
        VebMap { veb: self.veb.delete(k), map: self.map.remove(&k) }
    }

    /// Remove every key in `ks`. Equivalent to folding [`Self::delete`].
    pub fn drop_keys(&self, ks: impl IntoIterator<Item = Key>) -> VebMap<V>
    where
        V: Clone,
    {
        ks.into_iter().fold(self.clone(), |m, k| m.delete(k))
    }

    /// Remove `k`, returning its value (or `default` if absent) alongside
    /// the resulting map.
    pub fn pop(&self, k: Key, default: V) -> (V, VebMap<V>)
    where
        V: Clone,
    {
        let value = self.get(k, default);
        (value, self.delete(k))
    }

    /// Like [`Self::pop`], but the default is computed lazily, only if
    /// `k` is absent.
    pub fn pop_lazy<F>(&self, k: Key, default: F) -> (V, VebMap<V>)
    where
        V: Clone,
        F: FnOnce() -> V,
    {
        match self.fetch(k) {
            Some(v) => (v, self.delete(k)),
            None => (default(), self.clone()),
        }
    }

    /// Apply `f` to the current value (or `None` if absent); `f` returns
    /// the new value to store, or `None` to delete the key. Returns the
    /// value `f` observed (before the update) and the resulting map.
    pub fn get_and_update<F>(&self, k: Key, f: F) -> (Option<V>, VebMap<V>)
    where
        V: Clone,
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        let current = self.fetch(k);
        match f(current.as_ref()) {
            Some(new_value) => (current, self.put(k, new_value).expect("k already validated by prior fetch/put")),
            None => (current, self.delete(k)),
        }
    }

    /// Merge `other` into `self`; `other`'s values win on key conflicts.
    /// Resulting `log_u = max(self.log_u(), other.log_u())`.
    pub fn merge(&self, other: &VebMap<V>) -> VebMap<V>
    where
        V: Clone,
    {
        self.merge_with(other, |_k, _mine, theirs| theirs.clone())
    }

    /// Like [`Self::merge`], but conflicts are resolved by `resolve(key,
    /// mine, theirs)`.
    pub fn merge_with<F>(&self, other: &VebMap<V>, mut resolve: F) -> VebMap<V>
    where
        V: Clone,
        F: FnMut(Key, &V, &V) -> V,
    {
        let (base_veb, extra_keys) = if self.veb.log_u() >= other.veb.log_u() {
            (self.veb.clone(), other.veb.to_vec())
        } else {
            (other.veb.clone(), self.veb.to_vec())
        };
        let veb = extra_keys.into_iter().fold(base_veb, |acc, k| acc.insert(k));

        let mut map = self.map.clone();
        for (k, their_v) in other.map.iter() {
            let merged = match self.map.get(k) {
                Some(my_v) => resolve(*k, my_v, their_v),
                None => their_v.clone(),
            };
            map = map.insert(*k, merged);
        }
        VebMap { veb, map }
    }

    /// Partition into `(keys in ks, keys not in ks)`. Both share `self`'s
    /// `log_u`.
    pub fn split(&self, ks: impl IntoIterator<Item = Key>) -> (VebMap<V>, VebMap<V>)
    where
        V: Clone,
    {
        let ks: HashSet<Key> = ks.into_iter().collect();
        let mut with = self.empty_like();
        let mut without = self.empty_like();
        for (k, v) in self.iter() {
            if ks.contains(&k) {
                with = with.put(k, v).expect("k within self's capacity");
            } else {
                without = without.put(k, v).expect("k within self's capacity");
            }
        }
        (with, without)
    }

    /// Keep only the keys present in `ks`.
    pub fn take(&self, ks: impl IntoIterator<Item = Key>) -> VebMap<V>
    where
        V: Clone,
    {
        let ks: HashSet<Key> = ks.into_iter().collect();
        let mut out = self.empty_like();
        for (k, v) in self.iter() {
            if ks.contains(&k) {
                out = out.put(k, v).expect("k within self's capacity");
            }
        }
        out
    }

    /// Rebuild the index at a larger universe, leaving the map untouched.
    /// Fails if `new_limit` would shrink capacity below the current size.
    pub fn upgrade_capacity(&self, new_limit: u64) -> Result<VebMap<V>, VebError>
    where
        V: Clone,
    {
        let candidate = Veb::new(SizeMode::ByMax(new_limit))?;
        if candidate.capacity() < self.veb.capacity() {
            return Err(VebError::WouldShrink { new_limit, current: self.veb.capacity() });
        }
        let veb = self.veb.to_vec().into_iter().fold(candidate, |acc, k| acc.insert(k));
        Ok(VebMap { veb, map: self.map.clone() })
    }

    pub fn min_key(&self) -> Option<Key> {
        self.veb.min()
    }

    pub fn max_key(&self) -> Option<Key> {
        self.veb.max()
    }

    pub fn pred_key(&self, k: Key) -> Option<Key> {
        self.veb.predecessor(k)
    }

    pub fn succ_key(&self, k: Key) -> Option<Key> {
        self.veb.successor(k)
    }

    /// Ordered entries, ascending by key. See [`crate::iter::Iter`] for
    /// the suspend/resume contract.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter::new(self)
    }

    /// Collect the ordered entries into a `Vec`.
    pub fn to_vec(&self) -> Vec<(Key, V)>
    where
        V: Clone,
    {
        self.iter().collect()
    }

    /// Skip the first `start` ordered entries, then take up to `count`,
    /// returning them as a new map sharing `self`'s `log_u`.
    pub fn slice(&self, start: usize, count: usize) -> VebMap<V>
    where
        V: Clone,
    {
        let mut out = self.empty_like();
        for (k, v) in self.iter().skip(start).take(count) {
            out = out.put(k, v).expect("k within self's capacity");
        }
        out
    }

    /// Build a map by building from `mode` and folding [`Self::put`] over
    /// `pairs`. Fails on the first out-of-range key.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Key, V)>, mode: ListMode) -> Result<VebMap<V>, VebError>
    where
        V: Clone,
    {
        let pairs: Vec<(Key, V)> = pairs.into_iter().collect();
        let size_mode = match mode {
            ListMode::Sized(m) => m,
            ListMode::Auto => SizeMode::ByMax(pairs.iter().map(|(k, _)| *k).max().unwrap_or(0)),
        };
        let mut m = VebMap::new(size_mode)?;
        for (k, v) in pairs {
            m = m.put(k, v)?;
        }
        Ok(m)
    }

    /// Collectable: fold a stream of `(k, v)` pairs into `start` via
    /// successive `put`s.
    pub fn collect_into(start: VebMap<V>, pairs: impl IntoIterator<Item = (Key, V)>) -> Result<VebMap<V>, VebError>
    where
        V: Clone,
    {
        pairs.into_iter().try_fold(start, |m, (k, v)| m.put(k, v))
    }
}

impl<V: Clone + PartialEq> PartialEq for VebMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.capacity() == other.capacity() && self.to_vec() == other.to_vec()
    }
}

impl<V: Clone + Eq> Eq for VebMap<V> {}

/// `Vebmap[capacity=C, elements=[(k, v), ...]]`, elements in key order.
impl<V: Clone + fmt::Debug> fmt::Display for VebMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vebmap[capacity={}, elements=[", self.capacity())?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "({k:?}, {v:?})")?;
        }
        write!(f, "]]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> VebMap<char> {
        VebMap::new(SizeMode::ByLogU(16)).unwrap()
    }

    #[test]
    fn put_get_has_key() {
        let m = small().put(5, 'a').unwrap();
        assert_eq!(m.get(5, 'z'), 'a');
        assert_eq!(m.get(6, 'z'), 'z');
        assert!(m.has_key(5));
        assert!(!m.has_key(6));
    }

    #[test]
    fn put_is_out_of_range_past_capacity() {
        let m = VebMap::<char>::new(SizeMode::ByLogU(4)).unwrap();
        assert_eq!(m.capacity(), 16);
        let err = m.put(16, 'a').unwrap_err();
        assert!(matches!(err, VebError::OutOfRange { key: 16, capacity: 16 }));
    }

    #[test]
    fn put_overwrites_value_idempotent_on_key_set() {
        let m = small().put(5, 'a').unwrap();
        let m2 = m.put(5, 'b').unwrap();
        assert_eq!(m2.get(5, 'z'), 'b');
        assert_eq!(m2.to_vec(), vec![(5, 'b')]);
    }

    #[test]
    fn delete_absent_is_noop() {
        let m = small().put(5, 'a').unwrap();
        let m2 = m.delete(6);
        assert_eq!(m.to_vec(), m2.to_vec());
    }

    #[test]
    fn capacity_preserved_across_delete() {
        let m = small().put(5, 'a').unwrap();
        assert_eq!(m.delete(5).capacity(), m.capacity());
    }

    #[test]
    fn ordered_iteration_and_pred_succ() {
        let m = small().put(5, 'a').unwrap().put(1, 'b').unwrap().put(9, 'c').unwrap();
        assert_eq!(m.to_vec(), vec![(1, 'b'), (5, 'a'), (9, 'c')]);
        assert_eq!(m.pred_key(5), Some(1));
        assert_eq!(m.succ_key(5), Some(9));
        assert_eq!(m.succ_key(9), None);
        assert_eq!(m.pred_key(1), None);
    }

    #[test]
    fn merge_identity_with_empty() {
        let m = small().put(1, 'a').unwrap().put(2, 'b').unwrap();
        let empty = small();
        assert_eq!(m.merge(&empty).to_vec(), m.to_vec());
        assert_eq!(empty.merge(&m).to_vec(), m.to_vec());
    }

    #[test]
    fn merge_disjoint_universes_takes_larger_log_u() {
        let small_u = VebMap::<char>::new(SizeMode::ByLogU(4)).unwrap().put(3, 'a').unwrap();
        let big_u = VebMap::<char>::new(SizeMode::ByLogU(10)).unwrap().put(500, 'b').unwrap();
        let merged = small_u.merge(&big_u);
        assert_eq!(merged.capacity(), 1024);
        assert_eq!(merged.to_vec(), vec![(3, 'a'), (500, 'b')]);
    }

    #[test]
    fn merge_conflict_prefers_other() {
        let a = small().put(1, 'a').unwrap();
        let b = small().put(1, 'b').unwrap();
        assert_eq!(a.merge(&b).get(1, 'z'), 'b');
        assert_eq!(b.merge(&a).get(1, 'z'), 'a');
    }

    #[test]
    fn merge_with_custom_resolver() {
        let a = small().put(1, 'a').unwrap();
        let b = small().put(1, 'b').unwrap();
        let merged = a.merge_with(&b, |_k, mine, _theirs| *mine);
        assert_eq!(merged.get(1, 'z'), 'a');
    }

    #[test]
    fn split_and_take() {
        let m = small().put(1, 'a').unwrap().put(2, 'b').unwrap().put(3, 'c').unwrap();
        let (with, without) = m.split([1, 3]);
        assert_eq!(with.to_vec(), vec![(1, 'a'), (3, 'c')]);
        assert_eq!(without.to_vec(), vec![(2, 'b')]);
        assert_eq!(with.capacity(), m.capacity());
        assert_eq!(without.capacity(), m.capacity());

        let taken = m.take([2, 3, 99]);
        assert_eq!(taken.to_vec(), vec![(2, 'b'), (3, 'c')]);
    }

    #[test]
    fn upgrade_capacity_grows_but_rejects_shrink() {
        let m = VebMap::<char>::new(SizeMode::ByLogU(4)).unwrap().put(5, 'a').unwrap();
        let grown = m.upgrade_capacity(1_000).unwrap();
        assert_eq!(grown.capacity(), 1024);
        assert_eq!(grown.get(5, 'z'), 'a');

        let err = grown.upgrade_capacity(10).unwrap_err();
        assert!(matches!(err, VebError::WouldShrink { .. }));
    }

    #[test]
    fn slice_builds_contiguous_submap() {
        let m = small().put(5, 'a').unwrap().put(1, 'b').unwrap().put(9, 'c').unwrap().put(20, 'd').unwrap();
        let sliced = m.slice(1, 2);
        assert_eq!(sliced.to_vec(), vec![(5, 'a'), (9, 'c')]);
        assert_eq!(sliced.capacity(), m.capacity());
    }

    #[test]
    fn pop_returns_value_and_removes() {
        let m = small().put(5, 'a').unwrap();
        let (v, m2) = m.pop(5, 'z');
        assert_eq!(v, 'a');
        assert!(!m2.has_key(5));
        let (v2, m3) = m2.pop(5, 'z');
        assert_eq!(v2, 'z');
        assert!(m3.to_vec().is_empty());
    }

    #[test]
    fn fetch_strict_reports_missing_key() {
        let m = small();
        let err = m.fetch_strict(5).unwrap_err();
        assert_eq!(err, VebError::MissingKey(5));
    }

    #[test]
    fn equality_compares_capacity_and_ordered_entries() {
        let a = small().put(1, 'a').unwrap();
        let b = small().put(1, 'a').unwrap();
        assert_eq!(a, b);
        let c = a.put(2, 'b').unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn display_matches_renderable_contract() {
        let m = small().put(1, 'a').unwrap().put(2, 'b').unwrap();
        assert_eq!(format!("{m}"), "Vebmap[capacity=65536, elements=[(1, 'a'), (2, 'b')]]");
    }

    #[test]
    fn from_pairs_auto_picks_capacity_from_max_key() {
        let m = VebMap::from_pairs([(5, "a"), (1, "b"), (9, "c")], ListMode::Auto).unwrap();
        assert_eq!(m.capacity(), 16);
        assert_eq!(m.to_vec(), vec![(1, "b"), (5, "a"), (9, "c")]);
    }

    #[test]
    fn collect_into_folds_puts() {
        let start = small();
        let m = VebMap::collect_into(start, [(1, 'a'), (2, 'b')]).unwrap();
        assert_eq!(m.to_vec(), vec![(1, 'a'), (2, 'b')]);
    }

    #[test]
    fn update_applies_function_to_existing_value() {
        let m = small().put(1, 'a').unwrap();
        let m2 = m.update(1, |_| 'z');
        assert_eq!(m2.get(1, '?'), 'z');
    }

    #[test]
    fn update_is_a_noop_on_a_missing_key() {
        let m = small().put(1, 'a').unwrap();
        let unchanged = m.update(2, |_| 'z');
        assert_eq!(unchanged.to_vec(), m.to_vec());
    }

    #[test]
    fn update_strict_fails_on_a_missing_key() {
        let m = small().put(1, 'a').unwrap();
        let m2 = m.update_strict(1, |_| 'z').unwrap();
        assert_eq!(m2.get(1, '?'), 'z');
        assert!(m.update_strict(2, |_| 'z').is_err());
    }

    #[test]
    fn replace_is_a_noop_on_a_missing_key_but_replace_strict_fails() {
        let m = small().put(1, 'a').unwrap();
        let unchanged = m.replace(2, 'z');
        assert_eq!(unchanged.to_vec(), m.to_vec());

        let replaced = m.replace(1, 'z');
        assert_eq!(replaced.get(1, '?'), 'z');

        assert!(m.replace_strict(2, 'z').is_err());
    }

    #[test]
    fn get_and_update_can_delete_by_returning_none() {
        let m = small().put(1, 'a').unwrap();
        let (old, m2) = m.get_and_update(1, |_| None);
        assert_eq!(old, Some('a'));
        assert!(!m2.has_key(1));
    }
}
