//! The recursive van Emde Boas tree: a persistent ordered set of `u64` keys
//! supporting insert, delete, predecessor, successor, min, max, ordered
//! iteration and bulk construction in O(log log U) per operation, where U is
//! the configured universe.
//!
//! Every operation here takes `&self` and returns a new `Veb`; there is no
//! in-place mutation. Cluster children and the summary subtree are
//! reference-counted so that an update only allocates along the root-to-leaf
//! path it actually touches, sharing the rest of the structure with the
//! input.

use std::rc::Rc;

use rpds::HashTrieMap;

use crate::error::VebError;

/// A single key in the universe. The universe is always `[0, 2^log_u)` for
/// some `log_u <= 64`, so `u64` covers every representable capacity.
pub type Key = u64;

/// How to derive `log_u` when constructing a vEB tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeMode {
    /// `log_u` is given directly.
    ByLogU(u32),
    /// `limit` must be a power of two; `log_u = log2(limit)`.
    ByU(u64),
    /// `log_u` is the smallest integer such that `2^log_u > limit`, with a
    /// minimum of 1.
    ByMax(u64),
}

/// Construction mode for [`Veb::from_list`]: either an explicit [`SizeMode`]
/// or `Auto`, which derives `by_max` from the largest key in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    Sized(SizeMode),
    Auto,
}

const MAX_LOG_U: u32 = 64;

fn ceil_log2_u128(n: u128) -> u32 {
    if n <= 1 {
        0
    } else {
        128 - (n - 1).leading_zeros()
    }
}

fn resolve_log_u(mode: SizeMode) -> Result<u32, VebError> {
    let log_u = match mode {
        SizeMode::ByLogU(l) => l,
        SizeMode::ByU(u) => {
            if u == 0 || !u.is_power_of_two() {
                return Err(VebError::NotPowerOfTwo { limit: u });
            }
            u.trailing_zeros()
        }
        SizeMode::ByMax(limit) => ceil_log2_u128(limit as u128 + 1).max(1),
    };
    if log_u > MAX_LOG_U {
        return Err(VebError::LogUTooLarge(log_u));
    }
    Ok(log_u)
}

/// `log_u` of each cluster child (floor half).
fn child_log_u(log_u: u32) -> u32 {
    log_u / 2
}

/// `log_u` of the summary (ceil half).
fn summary_log_u(log_u: u32) -> u32 {
    log_u - log_u / 2
}

fn low_bits(log_u: u32) -> u32 {
    child_log_u(log_u)
}

fn high(x: Key, log_u: u32) -> Key {
    x >> low_bits(log_u)
}

fn low(x: Key, log_u: u32) -> Key {
    let bits = low_bits(log_u);
    if bits == 0 { 0 } else { x & ((1u64 << bits) - 1) }
}

fn combine(h: Key, l: Key, log_u: u32) -> Key {
    (h << low_bits(log_u)) | l
}

/// A van Emde Boas tree over `[0, 2^log_u)`.
#[derive(Debug, Clone)]
pub struct Veb {
    log_u: u32,
    min: Option<Key>,
    max: Option<Key>,
    summary: Option<Rc<Veb>>,
    clusters: HashTrieMap<Key, Rc<Veb>>,
}

impl Veb {
    /// Build an empty vEB tree whose universe is derived from `mode`.
    pub fn new(mode: SizeMode) -> Result<Veb, VebError> {
        let log_u = resolve_log_u(mode)?;
        Ok(Veb::empty(log_u))
    }

    fn empty(log_u: u32) -> Veb {
        Veb {
            log_u,
            min: None,
            max: None,
            summary: None,
            clusters: HashTrieMap::new(),
        }
    }

    /// Build a vEB tree by repeated insertion. Duplicate keys are
    /// idempotent; a key outside the resolved universe fails the whole
    /// build with [`VebError::OutOfRange`].
    pub fn from_list(keys: impl IntoIterator<Item = Key>, mode: ListMode) -> Result<Veb, VebError> {
        let keys: Vec<Key> = keys.into_iter().collect();
        let size_mode = match mode {
            ListMode::Sized(m) => m,
            ListMode::Auto => SizeMode::ByMax(keys.iter().copied().max().unwrap_or(0)),
        };
        let mut tree = Veb::new(size_mode)?;
        for k in keys {
            if k as u128 >= tree.capacity() {
                return Err(VebError::OutOfRange { key: k, capacity: tree.capacity() });
            }
            tree = tree.insert(k);
        }
        Ok(tree)
    }

    /// `log_u`, the bit-width of the universe.
    pub fn log_u(&self) -> u32 {
        self.log_u
    }

    /// `2^log_u`, the size of the universe. Held as `u128` since `log_u`
    /// may be 64, which does not fit in `u64`.
    pub fn capacity(&self) -> u128 {
        1u128 << self.log_u
    }

    /// True if the tree holds no keys.
    pub fn is_empty(&self) -> bool {
        self.min.is_none()
    }

    /// The smallest key in the tree, in O(1).
    pub fn min(&self) -> Option<Key> {
        self.min
    }

    /// The largest key in the tree, in O(1).
    pub fn max(&self) -> Option<Key> {
        self.max
    }

    /// Insert `x` into the tree, returning a new tree. `x` must be `<
    /// self.capacity()`; callers that need capacity validation with a
    /// recoverable error should go through [`crate::VebMap::put`].
    pub fn insert(&self, mut x: Key) -> Veb {
        #[cfg(any(test, feature = "safety_checks"))]
        assert!((x as u128) < self.capacity(), "key out of universe");

        if self.is_empty() {
            return Veb { min: Some(x), max: Some(x), ..self.clone() };
        }

        let mut next = self.clone();
        let mut min = self.min.expect("non-empty tree has a min");
        if x < min {
            std::mem::swap(&mut x, &mut min);
            next.min = Some(min);
        }

        if self.log_u > 1 {
            let h = high(x, self.log_u);
            let l = low(x, self.log_u);
            let child = next.clusters.get(&h).cloned();
            let child_was_empty = child.as_ref().is_none_or(|c| c.is_empty());
            let child = child.unwrap_or_else(|| Rc::new(Veb::empty(child_log_u(self.log_u))));
            next.clusters = next.clusters.insert(h, Rc::new(child.insert(l)));

            if child_was_empty {
                let summary = next
                    .summary
                    .clone()
                    .unwrap_or_else(|| Rc::new(Veb::empty(summary_log_u(self.log_u))));
                next.summary = Some(Rc::new(summary.insert(h)));
            }
        }

        if x > next.max.expect("non-empty tree has a max") {
            next.max = Some(x);
        }
        next
    }

    /// Remove `x` from the tree, returning a new tree. A no-op (returns an
    /// equal tree) if `x` is absent.
    pub fn delete(&self, x: Key) -> Veb {
        if self.is_empty() {
            return self.clone();
        }
        let (min, max) = (self.min.expect("checked non-empty"), self.max.expect("checked non-empty"));

        if min == max {
            return if x == min { Veb::empty(self.log_u) } else { self.clone() };
        }

        if self.log_u <= 1 {
            let mut next = self.clone();
            if x == min {
                next.min = Some(max);
            } else if x == max {
                next.max = Some(min);
            }
            return next;
        }

        let mut next = self.clone();
        let mut x = x;

        if x == min {
            match next.summary.as_ref().and_then(|s| s.min()) {
                None => {
                    // Only one cluster ever held an element, but max != min
                    // was just ruled out above, so this cannot happen.
                    next.min = Some(max);
                    return next;
                }
                Some(h) => {
                    let cluster = next
                        .clusters
                        .get(&h)
                        .cloned()
                        .expect("summary min names a live cluster");
                    let cluster_min = cluster.min().expect("live cluster has a min");
                    let new_min = combine(h, cluster_min, self.log_u);
                    next.min = Some(new_min);
                    x = new_min;
                }
            }
        }

        let h = high(x, self.log_u);
        if let Some(cluster) = next.clusters.get(&h).cloned() {
            let l = low(x, self.log_u);
            let new_cluster = cluster.delete(l);
            if new_cluster.is_empty() {
                next.clusters = next.clusters.remove(&h);
                if let Some(summary) = next.summary.as_ref() {
                    next.summary = Some(Rc::new(summary.delete(h)));
                }
            } else {
                next.clusters = next.clusters.insert(h, Rc::new(new_cluster));
            }
        }

        if x == max {
            match next.summary.as_ref().and_then(|s| s.max()) {
                None => next.max = next.min,
                Some(h) => {
                    let cluster = next
                        .clusters
                        .get(&h)
                        .expect("summary max names a live cluster");
                    let cluster_max = cluster.max().expect("live cluster has a max");
                    next.max = Some(combine(h, cluster_max, self.log_u));
                }
            }
        }

        next
    }

    /// The smallest key strictly greater than `x`, or `None` if there is
    /// none.
    pub fn successor(&self, x: Key) -> Option<Key> {
        if self.log_u <= 1 {
            if let Some(min) = self.min {
                if x < min {
                    return Some(min);
                }
            }
            if let Some(max) = self.max {
                if x < max {
                    return Some(max);
                }
            }
            return None;
        }

        if let Some(min) = self.min {
            if x < min {
                return Some(min);
            }
        }

        let h = high(x, self.log_u);
        if let Some(cluster) = self.clusters.get(&h) {
            if let Some(cluster_max) = cluster.max() {
                let l = low(x, self.log_u);
                if l < cluster_max {
                    let next_l = cluster
                        .successor(l)
                        .expect("l is below the cluster max, so a successor exists");
                    return Some(combine(h, next_l, self.log_u));
                }
            }
        }

        if let Some(summary) = &self.summary {
            if let Some(next_h) = summary.successor(h) {
                if let Some(next_cluster) = self.clusters.get(&next_h) {
                    if let Some(next_l) = next_cluster.min() {
                        return Some(combine(next_h, next_l, self.log_u));
                    }
                }
            }
        }

        if let Some(max) = self.max {
            if x < max {
                return Some(max);
            }
        }

        None
    }

    /// The largest key strictly less than `x`, or `None` if there is none.
    pub fn predecessor(&self, x: Key) -> Option<Key> {
        if self.log_u <= 1 {
            if let Some(max) = self.max {
                if x > max {
                    return Some(max);
                }
            }
            if let Some(min) = self.min {
                if x > min {
                    return Some(min);
                }
            }
            return None;
        }

        if let Some(max) = self.max {
            if x > max {
                return Some(max);
            }
        }

        let h = high(x, self.log_u);
        if let Some(cluster) = self.clusters.get(&h) {
            if let Some(cluster_min) = cluster.min() {
                let l = low(x, self.log_u);
                if l > cluster_min {
                    let prev_l = cluster
                        .predecessor(l)
                        .expect("l is above the cluster min, so a predecessor exists");
                    return Some(combine(h, prev_l, self.log_u));
                }
            }
        }

        if let Some(summary) = &self.summary {
            if let Some(prev_h) = summary.predecessor(h) {
                if let Some(prev_cluster) = self.clusters.get(&prev_h) {
                    if let Some(prev_l) = prev_cluster.max() {
                        return Some(combine(prev_h, prev_l, self.log_u));
                    }
                }
            }
        }

        if let Some(min) = self.min {
            if x > min {
                return Some(min);
            }
        }

        None
    }

    /// Ordered keys, ascending. O(|S| log log U).
    pub fn to_vec(&self) -> Vec<Key> {
        let mut out = Vec::new();
        let Some(first) = self.min else { return out };
        out.push(first);
        let mut cur = first;
        while let Some(next) = self.successor(cur) {
            out.push(next);
            cur = next;
        }
        out
    }
}
