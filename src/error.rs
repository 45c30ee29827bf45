//! Error kinds surfaced by fallible `VebMap`/`Veb` operations.
//!
//! Absence of a key on non-strict operations (`get`, `fetch`, `delete`,
//! `pred_key`, `succ_key`) is not an error; only the two kinds below are
//! raised, and only by the operations documented to raise them.

use thiserror::Error;

use crate::veb::Key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VebError {
    /// Raised by `put`-family operations when `key >= capacity`.
    #[error("key {key} is out of range for capacity {capacity}")]
    OutOfRange { key: Key, capacity: u128 },

    /// Raised only by `!`-suffixed strict operations (`fetch!`, `replace!`,
    /// `update!`) when the key is absent.
    #[error("missing key {0}")]
    MissingKey(Key),

    /// Raised by construction (`by_u`) when the limit is not a power of
    /// two.
    #[error("limit {limit} is not a power of two")]
    NotPowerOfTwo { limit: u64 },

    /// Raised when a resolved `log_u` would exceed the 64-bit key width
    /// this crate supports.
    #[error("log_u {0} exceeds the maximum supported key width of 64 bits")]
    LogUTooLarge(u32),

    /// Raised by `upgrade_capacity` when `new_limit` would shrink the
    /// universe below the map's current capacity.
    #[error("upgrading to limit {new_limit} would shrink capacity below the current {current}")]
    WouldShrink { new_limit: u64, current: u128 },
}
