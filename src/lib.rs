//! An ordered, integer-keyed associative container.
//!
//! A [`VebMap`] augments a persistent hash-style mapping with a recursive
//! van Emde Boas tree (`veb`) index over its key set. The hash side
//! answers point lookups ([`VebMap::get`], [`VebMap::has_key`]) in
//! expected O(1); the vEB side answers ordering queries
//! ([`VebMap::pred_key`], [`VebMap::succ_key`], [`VebMap::min_key`],
//! [`VebMap::max_key`], ordered iteration) in O(log log U), where U is the
//! configured key universe.
//!
//! The whole structure is purely functional: every mutating-looking
//! method (`put`, `delete`, `merge`, `split`, ...) takes `&self` and
//! returns a new `VebMap`. Nothing is ever mutated in place, so a `VebMap`
//! is freely shareable across threads without synchronization, and
//! unrelated derived values can share substructure.
//!
//! ```
//! use vebmap::{SizeMode, VebMap};
//!
//! let m = VebMap::new(SizeMode::ByLogU(16)).unwrap();
//! let m = m.put(5, "five").unwrap().put(1, "one").unwrap().put(9, "nine").unwrap();
//!
//! assert_eq!(m.get(5, "?"), "five");
//! assert_eq!(m.pred_key(5), Some(1));
//! assert_eq!(m.succ_key(5), Some(9));
//! assert_eq!(m.to_vec(), vec![(1, "one"), (5, "five"), (9, "nine")]);
//! ```
//!
//! u is the size of the key universe. n is the number of keys in the map,
//! each in the range `[0, u)`. The vEB side of every operation runs in
//! O(lg lg u) time and the whole structure uses O(n * lg lg u) space for
//! the index, plus O(n) for the map.
//!
//! This crate fixes the key type to `u64` (see [`veb::Key`]); `log_u` is
//! capped at 64 bits, which is enough to address any practically sized
//! universe.

pub mod error;
pub mod iter;
pub mod map;
pub mod veb;

pub use error::VebError;
pub use iter::Iter;
pub use map::VebMap;
pub use veb::{Key, ListMode, SizeMode, Veb};
