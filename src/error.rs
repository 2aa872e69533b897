//! Error kinds reported by the string index and the gint table.
//!
//! "Not found" is never an error here; lookups return `Option`.

use crate::Gint;

/// Which allocation failed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AllocTarget {
    /// The bucket-reference directory of a `GintHash`.
    Directory,

    /// A bucket pool reserved during directory growth.
    BucketPool,

    /// A single bucket; the pool budget was used up. Directory growth always
    /// adds a pool with room, so this only surfaces if that accounting breaks.
    Bucket,
}

/// Represents errors that can occur in this crate
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// Memory for the given structure could not be obtained
    Alloc(AllocTarget),

    /// The table cannot take another pair: either the directory would grow
    /// to `max_level` or beyond, or more pairs share one scrambled key than
    /// a bucket holds, so no split can separate them
    CapacityExceeded {
        /// Configured level ceiling (exclusive)
        max_level: u32,
    },

    /// A long string claims hash chain membership, but its chain does not
    /// contain it
    Consistency {
        /// Byte offset of the offending object
        offset: Gint,

        /// What went wrong
        reason: &'static str,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alloc(target) => write!(f, "gint hash error: failed to allocate {target:?}"),
            Self::CapacityExceeded { max_level } => {
                write!(f, "gint hash error: maximum level {max_level} exceeded")
            }
            Self::Consistency { offset, reason } => {
                write!(f, "consistency error: {reason}, offset {offset}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Crate result
pub type Result<T> = std::result::Result<T, Error>;
