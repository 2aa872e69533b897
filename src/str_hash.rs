//! StrHash: chained hash index of long strings inside a segment.
//!
//! Each bucket of the segment's string hash array holds the reference of
//! the first long string in its chain; every long string holds the
//! reference of the next one in its chain-link header word. Chains end in 0.
//!
//! The index owns none of the objects. `remove` only unlinks, reclaiming
//! storage is up to the segment's allocator. Callers doing lookup followed
//! by `link` must hold the segment lock across both calls.

use crate::error::{Error, Result};
use crate::hash::{c_str, hash_typed_str};
use crate::longstr::{self, LongStr, TypedStr, HASHCHAIN_POS};
use crate::segment::Segment;
use crate::Gint;

pub struct StrHash<S> {
    segment: S,
}

impl<S: Segment> StrHash<S> {
    pub fn new(segment: S) -> Self {
        Self { segment }
    }

    pub fn segment(&self) -> &S {
        &self.segment
    }

    pub fn segment_mut(&mut self) -> &mut S {
        &mut self.segment
    }

    pub fn into_inner(self) -> S {
        self.segment
    }

    /// Bucket index of `s` in this segment's hash array.
    pub fn bucket_of(&self, s: &TypedStr<'_>) -> usize {
        hash_typed_str(s, self.segment.strhash_area().len)
    }

    /// Reference of the first long string in `bucket`, 0 if empty.
    pub fn chain_head(&self, bucket: usize) -> Gint {
        let area = self.segment.strhash_area();
        self.segment.fetch(area.slot(bucket))
    }

    /// Reference of the entry following `reference` in its chain.
    fn next(&self, reference: Gint) -> Gint {
        self.segment.fetch(longstr::field(reference, HASHCHAIN_POS))
    }

    /// Look `s` up in the chain it hashes to.
    pub fn find(&self, s: &TypedStr<'_>) -> Option<Gint> {
        self.find_in_chain(self.chain_head(self.bucket_of(s)), s)
    }

    /// Walk the chain starting at `head` and return the first entry equal
    /// to `s`.
    pub fn find_in_chain(&self, head: Gint, s: &TypedStr<'_>) -> Option<Gint> {
        let mut chain = head;
        while chain != 0 {
            if self.matches(chain, s) {
                return Some(chain);
            }
            chain = self.next(chain);
        }
        None
    }

    /// Whether the long string at `candidate` holds exactly `s`: same type,
    /// same payload bytes and same secondary string.
    pub fn matches(&self, candidate: Gint, s: &TypedStr<'_>) -> bool {
        if longstr::type_of(&self.segment, candidate) != s.ty & longstr::META_TYPE_MASK {
            return false;
        }
        if longstr::len_of(&self.segment, candidate) != s.len() {
            return false;
        }
        let stored = LongStr::decode(&self.segment, candidate);
        stored.data == s.data() && stored.extra == s.extra.map(c_str)
    }

    /// Prepend `reference` to the chain its content hashes to and return the
    /// bucket index.
    ///
    /// Does not check for an equal entry already being present.
    pub fn link(&mut self, reference: Gint) -> usize {
        debug_assert!(longstr::is_longstr(reference));
        let bucket = {
            let stored = LongStr::decode(&self.segment, reference);
            self.bucket_of(&stored.as_typed())
        };
        let slot = self.segment.strhash_area().slot(bucket);
        let head = self.segment.fetch(slot);
        self.segment.store(longstr::field(reference, HASHCHAIN_POS), head);
        self.segment.store(slot, reference);
        bucket
    }

    /// Unlink `reference` from its chain.
    ///
    /// The bucket is recomputed from the object's own content; the object's
    /// storage and its secondary string are left untouched. Fails with
    /// [`Error::Consistency`] if the chain does not contain the object.
    pub fn remove(&mut self, reference: Gint) -> Result<()> {
        let bucket = {
            let stored = LongStr::decode(&self.segment, reference);
            self.bucket_of(&stored.as_typed())
        };

        // `link` is the word that points at `chain`: the bucket slot first,
        // then the chain-link word of each entry walked past.
        let mut link = self.segment.strhash_area().slot(bucket);
        let mut chain = self.segment.fetch(link);
        while chain != 0 {
            let chain_link = longstr::field(chain, HASHCHAIN_POS);
            if chain == reference {
                let next = self.segment.fetch(chain_link);
                self.segment.store(link, next);
                return Ok(());
            }
            link = chain_link;
            chain = self.segment.fetch(link);
        }

        let offset = longstr::decode(reference);
        let reason = "string not found in hash during deletion";
        log::error!("consistency error: {reason}, offset {offset}");
        Err(Error::Consistency { offset, reason })
    }
}
