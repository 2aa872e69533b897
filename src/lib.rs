//! segment-hash: the hashing layer of an embedded shared-memory database.
//!
//! Internal Design:
//!
//! Summary
//! - Two unrelated tables share one hash family:
//!   - StrHash<S>: chained index of long strings living in a database
//!     segment, used to deduplicate strings and blobs by content, secondary
//!     (language) string and type.
//!   - GintHash: process-local extendible hash table mapping `Gint` keys to
//!     `Gint` values, for scratch associations such as offset remapping
//!     during dump/load.
//! - Layers:
//!   - hash: sdbm-style fold used for string buckets and key scrambling.
//!   - segment: `Segment` trait for word/byte access at segment offsets,
//!     plus `MemSegment`, a heap-backed stand-in.
//!   - longstr: long-string header layout and decoded views.
//!   - str_hash / gint_hash: the two tables.
//!
//! Constraints
//! - Single writer, no internal locking. StrHash mutates shared memory;
//!   the caller holds the segment lock across any lookup-then-link
//!   sequence. GintHash takes `&mut self` for every mutation.
//! - No operation suspends or yields; all run to completion.
//! - The string hash function must never change: chains written with one
//!   digest are unreachable with another.
//!
//! StrHash
//! - Chain heads live in the segment's hash array, `hash % len` picks the
//!   bucket. Each long string holds the reference of its successor.
//! - The bucket array is fixed at segment creation; it is never resized.
//! - `remove` recomputes the bucket from the object's own content. A miss
//!   means the segment is inconsistent and is reported as such, distinct
//!   from an ordinary lookup miss.
//!
//! GintHash
//! - Extendible hashing (Fagin et al.): directory of `2^level` arena ids,
//!   buckets of capacity 3 with one transient overflow slot, per-bucket
//!   local levels, splits cascading until no bucket is overfull.
//! - Keys are scrambled first so aligned offsets spread over the directory.
//! - Growth beyond the configured ceiling fails with `CapacityExceeded`;
//!   the pair being inserted is withdrawn so the table stays valid.
//! - No removal, no iteration, no persistence.
//!
//! Error handling
//! - Failures are returned as [`Error`]; nothing aborts the process.
//! - Lookup misses are `None`, never errors.
//! - Consistency violations are also logged through `log` where detected.

mod config;
mod error;
mod gint_hash;
mod gint_hash_proptest;
pub mod hash;
pub mod longstr;
pub mod segment;
mod str_hash;

/// Machine word stored in the segment: offsets, encoded references and
/// table keys/values alike.
pub type Gint = i64;

// Public surface
pub use config::{Config, DEFAULT_MAX_LEVEL};
pub use error::{AllocTarget, Error, Result};
pub use gint_hash::{GintHash, Stats, BUCKET_CAPACITY};
pub use hash::hash_typed_str;
pub use longstr::{LongStr, TypedStr};
pub use segment::{MemSegment, Segment, StrHashArea};
pub use str_hash::StrHash;
