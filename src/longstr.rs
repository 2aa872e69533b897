//! Long-string objects: layout, tagged references and a decoded view.
//!
//! A long string occupies a run of words in the segment. Word positions
//! relative to the object base:
//!
//! | pos  | field                                                       |
//! |------|-------------------------------------------------------------|
//! | 0    | object size in bytes; the low two bits are allocator flags  |
//! | 1    | meta: type tag in bits 0..8, length difference in bits 8..16 |
//! | 2    | reference count                                             |
//! | 3    | backlinks                                                   |
//! | 4    | hash chain link: reference of the next entry, 0 at the end  |
//! | 5    | secondary string: reference, 0 when absent                  |
//! | 6..  | payload bytes                                               |
//!
//! The payload length is the object size minus the length difference.
//! Objects are word aligned, which frees the low three bits of an offset
//! to carry the long-string tag.

use crate::hash::c_str;
use crate::segment::Segment;
use crate::Gint;

/// Bytes per segment word.
pub const WORD: usize = core::mem::size_of::<Gint>();

pub const SIZE_POS: usize = 0;
pub const META_POS: usize = 1;
pub const REFCOUNT_POS: usize = 2;
pub const BACKLINKS_POS: usize = 3;
pub const HASHCHAIN_POS: usize = 4;
pub const EXTRASTR_POS: usize = 5;
pub const HEADER_GINTS: usize = 6;
pub const HEADER_BYTES: usize = HEADER_GINTS * WORD;

pub const META_TYPE_MASK: Gint = 0xff;
pub const META_LENDIF_MASK: Gint = 0xff00;
pub const META_LENDIF_SHIFT: u32 = 8;

const SIZE_FLAGS_MASK: Gint = 0b11;
const LONGSTR_BITS: Gint = 0b100;
const LONGSTR_MASK: Gint = 0b111;

// Type tags carried in the meta word.
pub const STR_TYPE: Gint = 5;
pub const XMLLITERAL_TYPE: Gint = 6;
pub const URI_TYPE: Gint = 7;
pub const BLOB_TYPE: Gint = 8;

/// Tag a word-aligned object offset as a long-string reference.
#[inline]
pub fn encode(offset: Gint) -> Gint {
    debug_assert_eq!(offset & LONGSTR_MASK, 0, "unaligned long string offset");
    offset | LONGSTR_BITS
}

/// Byte offset of the object a reference points to.
#[inline]
pub fn decode(reference: Gint) -> Gint {
    reference & !LONGSTR_MASK
}

#[inline]
pub fn is_longstr(reference: Gint) -> bool {
    reference & LONGSTR_MASK == LONGSTR_BITS
}

/// Byte offset of header word `pos` of the referenced object.
#[inline]
pub fn field(reference: Gint, pos: usize) -> Gint {
    decode(reference) + (pos * WORD) as Gint
}

/// Content that identifies a long string: payload, optional secondary
/// (language) string and type tag.
///
/// An absent payload is equivalent to an empty one. The secondary string is
/// compared and hashed up to its first NUL; absent and empty secondary
/// strings are distinct.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TypedStr<'a> {
    pub data: Option<&'a [u8]>,
    pub extra: Option<&'a [u8]>,
    pub ty: Gint,
}

impl<'a> TypedStr<'a> {
    pub fn new(data: &'a [u8], ty: Gint) -> Self {
        Self {
            data: Some(data),
            extra: None,
            ty,
        }
    }

    #[must_use]
    pub fn with_extra(mut self, extra: &'a [u8]) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Payload bytes; empty when absent.
    pub fn data(&self) -> &'a [u8] {
        self.data.unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }
}

/// Read-only view of a long string decoded from its in-place storage.
#[derive(Debug)]
pub struct LongStr<'a> {
    pub reference: Gint,
    pub ty: Gint,
    pub data: &'a [u8],
    /// Secondary string without its NUL terminator.
    pub extra: Option<&'a [u8]>,
}

impl<'a> LongStr<'a> {
    pub fn decode<S: Segment + ?Sized>(segment: &'a S, reference: Gint) -> Self {
        let extra = match segment.fetch(field(reference, EXTRASTR_POS)) {
            0 => None,
            extra_ref => Some(c_str(payload(segment, extra_ref))),
        };
        Self {
            reference,
            ty: type_of(segment, reference),
            data: payload(segment, reference),
            extra,
        }
    }

    pub fn as_typed(&self) -> TypedStr<'a> {
        TypedStr {
            data: Some(self.data),
            extra: self.extra,
            ty: self.ty,
        }
    }
}

/// Type tag of the referenced object.
pub fn type_of<S: Segment + ?Sized>(segment: &S, reference: Gint) -> Gint {
    segment.fetch(field(reference, META_POS)) & META_TYPE_MASK
}

/// Payload length of the referenced object.
pub fn len_of<S: Segment + ?Sized>(segment: &S, reference: Gint) -> usize {
    let size = segment.fetch(field(reference, SIZE_POS)) & !SIZE_FLAGS_MASK;
    let lendif =
        (segment.fetch(field(reference, META_POS)) & META_LENDIF_MASK) >> META_LENDIF_SHIFT;
    usize::try_from(size - lendif).unwrap_or(0)
}

/// Payload bytes of the referenced object.
pub fn payload<S: Segment + ?Sized>(segment: &S, reference: Gint) -> &[u8] {
    let len = len_of(segment, reference);
    segment.bytes(decode(reference) + HEADER_BYTES as Gint, len)
}

/// Meta word for an object of `size` bytes holding `len` payload bytes.
pub(crate) fn meta_word(ty: Gint, size: usize, len: usize) -> Gint {
    let lendif = (size - len) as Gint;
    debug_assert!(lendif <= META_LENDIF_MASK >> META_LENDIF_SHIFT);
    (ty & META_TYPE_MASK) | (lendif << META_LENDIF_SHIFT)
}
