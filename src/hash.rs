//! sdbm-style hashing shared by the string index and the gint table.
//!
//! Both hashes must stay byte-for-byte stable: string chains written by one
//! process are walked by another, so any change strands existing entries.

use crate::longstr::TypedStr;
use crate::Gint;
use core::num::NonZeroUsize;

/// One sdbm round, `c + (h << 6) + (h << 16) - h`. Bytes are folded in
/// as signed values.
#[inline]
fn sdbm_step(hash: u64, byte: u8) -> u64 {
    let c = byte as i8 as i64 as u64;
    c.wrapping_add(hash << 6)
        .wrapping_add(hash << 16)
        .wrapping_sub(hash)
}

#[inline]
pub(crate) fn sdbm(seed: u64, bytes: &[u8]) -> u64 {
    bytes.iter().fold(seed, |h, &b| sdbm_step(h, b))
}

/// Bytes of a NUL-terminated string, without the terminator. Slices that
/// contain no NUL are taken whole.
pub fn c_str(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}

/// Bucket index of a typed string in a table of `buckets` chains.
///
/// The payload is folded in full, then the secondary string up to its first
/// NUL. The type tag does not take part in the digest.
pub fn hash_typed_str(s: &TypedStr<'_>, buckets: NonZeroUsize) -> usize {
    let mut hash = sdbm(0, s.data());
    if let Some(extra) = s.extra {
        hash = sdbm(hash, c_str(extra));
    }
    (hash % buckets.get() as u64) as usize
}

/// Spread a key over the full word.
///
/// Keys are often aligned segment offsets whose low bits are always zero;
/// used as-is they would leave most of the directory empty.
#[inline]
pub fn scramble(key: Gint) -> Gint {
    sdbm(0, &key.to_le_bytes()) as Gint
}
