//! The tagged reference encoding.
//!
//! A reference slot holds one machine word. The word may be:
//! * zero, the null reference,
//! * a strong reference, the address of a heap object,
//! * a weak reference, the address of a heap object with [`TAG_WEAK`] set in the low bits,
//! * a non-reference value (a boxed scalar) whose bit pattern may still look like a tagged
//!   pointer.
//!
//! The last case cannot be told apart by the encoding alone. Only the runtime can decide
//! whether a word is a legitimate object (see [`crate::vm::Heap::is_tagged_object`]), so the
//! helpers in this module never try to.

use crate::util::{Address, ObjectReference};

/// The bit that marks a reference as weak. Objects are at least word aligned, so the bit is
/// never part of an object address.
pub const TAG_WEAK: usize = 0x1;

const_assert!(TAG_WEAK < crate::util::constants::MIN_OBJECT_ALIGNMENT);

/// Does the word carry the weak tag?
#[inline(always)]
pub const fn is_weak(word: usize) -> bool {
    word & TAG_WEAK != 0
}

/// Clear the weak tag of a word.
///
/// Every value recorded in a SATB buffer goes through this mask, so a weak reference is
/// never mistaken for a strong SATB entry that artificially keeps its referent alive.
#[inline(always)]
pub const fn mask_weak(word: usize) -> usize {
    word & !TAG_WEAK
}

/// Set the weak tag of a word.
#[inline(always)]
pub const fn make_weak(word: usize) -> usize {
    word | TAG_WEAK
}

/// Decode the object a word refers to. The result is null for the null word.
#[inline(always)]
pub fn target_of(word: usize) -> ObjectReference {
    ObjectReference::from_raw_address(unsafe { Address::from_usize(mask_weak(word)) })
}

/// Encode an object reference as a strong reference word.
#[inline(always)]
pub fn encode(object: ObjectReference) -> usize {
    object.value()
}

/// A reference value as it is stored into a slot: an object reference that may carry the weak
/// tag. This is the type of the values the write barriers install.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, Hash, PartialEq)]
pub struct TaggedReference(usize);

impl TaggedReference {
    /// The null reference.
    pub const NULL: TaggedReference = TaggedReference(0);

    /// A strong reference to `object`.
    pub fn strong(object: ObjectReference) -> Self {
        TaggedReference(encode(object))
    }

    /// A weak reference to `object`.
    pub fn weak(object: ObjectReference) -> Self {
        TaggedReference(make_weak(encode(object)))
    }

    /// Interpret a raw slot word. The word may also be a non-reference value.
    pub const fn from_word(word: usize) -> Self {
        TaggedReference(word)
    }

    /// The raw word to store into a slot.
    pub const fn word(self) -> usize {
        self.0
    }

    /// The referenced object with the weak tag removed.
    pub fn target(self) -> ObjectReference {
        target_of(self.0)
    }

    /// Is this a weak reference?
    pub const fn is_weak(self) -> bool {
        is_weak(self.0)
    }

    /// Is this the null reference?
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl From<ObjectReference> for TaggedReference {
    fn from(object: ObjectReference) -> Self {
        TaggedReference::strong(object)
    }
}

impl std::fmt::Debug for TaggedReference {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.is_weak() {
            write!(f, "weak {:#x}", mask_weak(self.0))
        } else {
            write!(f, "{:#x}", self.0)
        }
    }
}
