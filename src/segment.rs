//! Offset-addressed access to a database memory segment.
//!
//! Everything the string index touches is reached through byte offsets
//! relative to the segment base. The segment itself, its allocator and its
//! header layout belong to the embedding engine; `Segment` is the narrow
//! interface this crate needs from it.

use crate::hash::c_str;
use crate::longstr::{self, TypedStr, HEADER_BYTES, WORD};
use crate::Gint;
use byteorder::{ByteOrder, LittleEndian};
use core::num::NonZeroUsize;

/// Word and byte access at offsets within a segment.
///
/// Offsets handed to these methods come from the segment's own allocator
/// and header. Implementations may panic on offsets outside the segment.
pub trait Segment {
    /// Read the word at `offset`.
    fn fetch(&self, offset: Gint) -> Gint;

    /// Write the word at `offset`.
    fn store(&mut self, offset: Gint, value: Gint);

    /// `len` bytes starting at `offset`.
    fn bytes(&self, offset: Gint, len: usize) -> &[u8];

    /// Location of the string hash bucket array.
    fn strhash_area(&self) -> StrHashArea;
}

impl<T: Segment + ?Sized> Segment for &mut T {
    fn fetch(&self, offset: Gint) -> Gint {
        (**self).fetch(offset)
    }
    fn store(&mut self, offset: Gint, value: Gint) {
        (**self).store(offset, value)
    }
    fn bytes(&self, offset: Gint, len: usize) -> &[u8] {
        (**self).bytes(offset, len)
    }
    fn strhash_area(&self) -> StrHashArea {
        (**self).strhash_area()
    }
}

/// String hash bucket array as described by the segment header: `len`
/// words starting at byte offset `start`, each holding a chain head.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StrHashArea {
    pub start: Gint,
    pub len: NonZeroUsize,
}

impl StrHashArea {
    /// Byte offset of the chain head slot for `bucket`.
    #[inline]
    pub fn slot(&self, bucket: usize) -> Gint {
        debug_assert!(bucket < self.len.get());
        self.start + (bucket * WORD) as Gint
    }
}

// Offset 0 marks the end of a chain, so no object may live there.
const SEGMENT_HEADER_BYTES: usize = 8 * WORD;

/// Heap-backed segment with a bump allocator.
///
/// Stands in for a mapped shared segment in tests, benches and tools that
/// build string chains without a running database.
#[derive(Clone, Debug)]
pub struct MemSegment {
    mem: Vec<u8>,
    strhash: StrHashArea,
}

impl MemSegment {
    /// Creates a segment whose string hash array has `buckets` chains, all
    /// empty.
    pub fn new(buckets: NonZeroUsize) -> Self {
        let start = SEGMENT_HEADER_BYTES;
        Self {
            mem: vec![0; start + buckets.get() * WORD],
            strhash: StrHashArea {
                start: start as Gint,
                len: buckets,
            },
        }
    }

    /// Bytes in use, header included.
    pub fn used(&self) -> usize {
        self.mem.len()
    }

    /// Allocate `bytes` zeroed bytes, rounded up to whole words, and return
    /// their offset.
    pub fn alloc(&mut self, bytes: usize) -> Gint {
        let offset = self.mem.len();
        let size = bytes.div_ceil(WORD) * WORD;
        self.mem.resize(offset + size, 0);
        offset as Gint
    }

    /// Materialize a long string and return its reference.
    ///
    /// A secondary string becomes an object of its own, NUL-terminated.
    /// The new object is not linked into any hash chain.
    pub fn alloc_longstr(&mut self, s: &TypedStr<'_>) -> Gint {
        let extra = match s.extra {
            Some(extra) => {
                let mut z = c_str(extra).to_vec();
                z.push(0);
                self.write_longstr(&z, longstr::STR_TYPE, 0)
            }
            None => 0,
        };
        self.write_longstr(s.data(), s.ty, extra)
    }

    fn write_longstr(&mut self, data: &[u8], ty: Gint, extra: Gint) -> Gint {
        let offset = self.alloc(HEADER_BYTES + data.len());
        let size = self.mem.len() - offset as usize;
        let reference = longstr::encode(offset);

        self.store(longstr::field(reference, longstr::SIZE_POS), size as Gint);
        self.store(
            longstr::field(reference, longstr::META_POS),
            longstr::meta_word(ty, size, data.len()),
        );
        self.store(longstr::field(reference, longstr::REFCOUNT_POS), 1);
        self.store(longstr::field(reference, longstr::EXTRASTR_POS), extra);

        let start = offset as usize + HEADER_BYTES;
        self.mem[start..start + data.len()].copy_from_slice(data);
        reference
    }

    fn range(&self, offset: Gint, len: usize) -> core::ops::Range<usize> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        assert!(
            start <= self.mem.len() && len <= self.mem.len() - start,
            "offset {offset} (+{len}) outside segment of {} bytes",
            self.mem.len()
        );
        start..start + len
    }
}

impl Segment for MemSegment {
    fn fetch(&self, offset: Gint) -> Gint {
        LittleEndian::read_i64(&self.mem[self.range(offset, WORD)])
    }

    fn store(&mut self, offset: Gint, value: Gint) {
        let range = self.range(offset, WORD);
        LittleEndian::write_i64(&mut self.mem[range], value);
    }

    fn bytes(&self, offset: Gint, len: usize) -> &[u8] {
        &self.mem[self.range(offset, len)]
    }

    fn strhash_area(&self) -> StrHashArea {
        self.strhash
    }
}
