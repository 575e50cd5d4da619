//! `RefField` is the unit of storage the barriers operate on: one word-sized slot inside an
//! object (a field or an array element) or inside static storage.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::util::tagged;
use crate::util::{Address, ObjectReference};

/// A word-sized reference slot.
///
/// The slot may hold null, a strong reference, a weak reference (see
/// [`crate::util::tagged::TAG_WEAK`]) or a non-reference value. A `RefField` is never owned
/// by a barrier. It is a borrowed view into object or static memory, valid as long as the
/// enclosing object is.
///
/// # Plain and atomic accessors
///
/// The runtime distinguishes *plain* fields, read and written by ordinary loads and stores,
/// from *atomic* fields that support memory-ordered operations. Both share this type.
/// Plain accesses ([`RefField::field_value`], [`RefField::set_field_value`]) are performed
/// with `Relaxed` ordering so that concurrent access from the collector is still free of
/// data races. Atomic accesses take the ordering from the caller.
#[repr(transparent)]
pub struct RefField {
    value: AtomicUsize,
}

const_assert_eq!(std::mem::size_of::<RefField>(), std::mem::size_of::<usize>());

impl RefField {
    /// Create a slot that holds `word`.
    pub const fn new(word: usize) -> Self {
        Self {
            value: AtomicUsize::new(word),
        }
    }

    /// Create a slot that holds a strong reference to `object`.
    pub fn from_object(object: ObjectReference) -> Self {
        Self::new(tagged::encode(object))
    }

    /// View the word at `address` as a reference slot.
    ///
    /// # Safety
    /// `address` must be word aligned and point to a live word of object or static storage
    /// that outlives `'a`.
    pub unsafe fn from_address<'a>(address: Address) -> &'a RefField {
        debug_assert!(crate::util::conversions::is_address_aligned(address));
        address.as_ref::<RefField>()
    }

    /// Get the address of the slot.
    pub fn address(&self) -> Address {
        Address::from_ref(self)
    }

    /// Plain load of the raw word.
    #[inline(always)]
    pub fn field_value(&self) -> usize {
        self.value.load(Ordering::Relaxed)
    }

    /// Memory-ordered load of the raw word.
    #[inline(always)]
    pub fn field_value_with(&self, order: Ordering) -> usize {
        self.value.load(order)
    }

    /// Plain store of a raw word.
    #[inline(always)]
    pub fn set_field_value(&self, word: usize) {
        self.value.store(word, Ordering::Relaxed)
    }

    /// Memory-ordered store of a raw word.
    #[inline(always)]
    pub fn set_field_value_with(&self, word: usize, order: Ordering) {
        self.value.store(word, order)
    }

    /// The object this slot refers to, with the weak tag removed. This is null if the slot
    /// holds the null word. The caller is responsible for knowing that the slot does not hold
    /// a non-reference value.
    #[inline(always)]
    pub fn target_object(&self) -> ObjectReference {
        tagged::target_of(self.field_value())
    }

    /// Same as [`RefField::target_object`], with an explicit memory order.
    #[inline(always)]
    pub fn target_object_with(&self, order: Ordering) -> ObjectReference {
        tagged::target_of(self.field_value_with(order))
    }

    /// Is the slot holding a weak reference?
    pub fn is_weak(&self) -> bool {
        tagged::is_weak(self.field_value())
    }

    /// Atomically replace the word, returning the previous one.
    #[inline(always)]
    pub fn exchange(&self, word: usize, order: Ordering) -> usize {
        self.value.swap(word, order)
    }

    /// Strong compare-and-exchange of the raw word.
    #[inline(always)]
    pub fn compare_exchange(
        &self,
        current: usize,
        new: usize,
        success: Ordering,
        failure: Ordering,
    ) -> Result<usize, usize> {
        self.value.compare_exchange(current, new, success, failure)
    }

    /// Weak compare-and-exchange of the raw word. It may fail spuriously even if the slot
    /// holds `current`, so it must be retried in a loop.
    #[inline(always)]
    pub fn compare_exchange_weak(
        &self,
        current: usize,
        new: usize,
        success: Ordering,
        failure: Ordering,
    ) -> Result<usize, usize> {
        self.value.compare_exchange_weak(current, new, success, failure)
    }
}

impl fmt::Debug for RefField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "RefField({}: {:#x})", self.address(), self.field_value())
    }
}

/// Iterate the word-aligned slots of `[start, end)`.
pub struct RefFieldRangeIterator {
    cursor: Address,
    limit: Address,
}

impl RefFieldRangeIterator {
    /// Iterate all words in `[start, end)`. Both ends must be word aligned.
    pub fn new(start: Address, end: Address) -> Self {
        debug_assert!(crate::util::conversions::is_address_aligned(start));
        debug_assert!(crate::util::conversions::is_address_aligned(end));
        Self {
            cursor: start,
            limit: end,
        }
    }
}

impl Iterator for RefFieldRangeIterator {
    type Item = Address;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.limit {
            None
        } else {
            let slot = self.cursor;
            self.cursor += crate::util::constants::BYTES_IN_ADDRESS;
            Some(slot)
        }
    }
}
