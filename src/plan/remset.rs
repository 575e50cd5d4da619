//! The remembered set for generational collection.
//!
//! A write that stores a reference to a young object into an old object creates an
//! old-to-young edge. A young-only collection does not scan old objects, so every such
//! container is remembered here and treated as a root by the next young collection.
//!
//! The remembered set is a bitmap with one bit per possible object start in the covered
//! address range. Adding is a single atomic `fetch_or`, so any number of mutators can remember
//! containers concurrently without locking, and remembering the same container twice is free.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::util::constants::*;
use crate::util::conversions::raw_align_up;
use crate::util::{Address, ObjectReference};
use crate::vm::Heap;

/// A set of old objects that may hold references to young objects.
pub struct RememberedSet {
    start: Address,
    extent: usize,
    bits: Vec<AtomicUsize>,
}

impl RememberedSet {
    /// Create an empty remembered set that covers `[start, start + extent)`.
    pub fn new(start: Address, extent: usize) -> Self {
        debug_assert!(start.is_aligned_to(MIN_OBJECT_ALIGNMENT));
        let num_bits = raw_align_up(extent, MIN_OBJECT_ALIGNMENT) >> LOG_MIN_OBJECT_ALIGNMENT;
        let num_words = raw_align_up(num_bits, BITS_IN_WORD) / BITS_IN_WORD;
        Self {
            start,
            extent,
            bits: (0..num_words).map(|_| AtomicUsize::new(0)).collect(),
        }
    }

    /// Does the set cover the address of this object?
    pub fn covers(&self, object: ObjectReference) -> bool {
        object.to_raw_address().is_in_range(self.start, self.extent)
    }

    fn bit_of(&self, object: ObjectReference) -> (usize, usize) {
        assert!(
            self.covers(object),
            "{} is outside of the remembered set range {}..{}",
            object,
            self.start,
            self.start + self.extent
        );
        let index = (object.to_raw_address() - self.start) >> LOG_MIN_OBJECT_ALIGNMENT;
        (index / BITS_IN_WORD, 1 << (index % BITS_IN_WORD))
    }

    fn object_of(&self, word: usize, bit: usize) -> ObjectReference {
        let index = word * BITS_IN_WORD + bit;
        ObjectReference::from_raw_address(self.start + (index << LOG_MIN_OBJECT_ALIGNMENT))
    }

    /// Remember an object. Returns true if the object was not remembered before.
    pub fn add(&self, object: ObjectReference) -> bool {
        let (word, mask) = self.bit_of(object);
        let old = self.bits[word].fetch_or(mask, Ordering::SeqCst);
        old & mask == 0
    }

    /// Is the object remembered?
    pub fn contains(&self, object: ObjectReference) -> bool {
        let (word, mask) = self.bit_of(object);
        self.bits[word].load(Ordering::SeqCst) & mask != 0
    }

    /// Remove an object. Returns true if the object was remembered.
    pub fn remove(&self, object: ObjectReference) -> bool {
        let (word, mask) = self.bit_of(object);
        let old = self.bits[word].fetch_and(!mask, Ordering::SeqCst);
        old & mask != 0
    }

    /// The number of remembered objects.
    pub fn len(&self) -> usize {
        self.bits
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }

    /// Is the set empty?
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|w| w.load(Ordering::Relaxed) == 0)
    }

    /// Visit every remembered object in address order.
    pub fn for_each<F: FnMut(ObjectReference)>(&self, mut f: F) {
        for (i, word) in self.bits.iter().enumerate() {
            let value = word.load(Ordering::Acquire);
            self.visit_word(i, value, &mut f);
        }
    }

    /// Visit every remembered object in address order and remove it from the set. An object
    /// remembered concurrently is either visited by this call or stays in the set.
    pub fn drain<F: FnMut(ObjectReference)>(&self, mut f: F) {
        for (i, word) in self.bits.iter().enumerate() {
            let value = word.swap(0, Ordering::AcqRel);
            self.visit_word(i, value, &mut f);
        }
    }

    /// Forget all objects.
    pub fn clear(&self) {
        for word in self.bits.iter() {
            word.store(0, Ordering::SeqCst);
        }
    }

    fn visit_word<F: FnMut(ObjectReference)>(&self, i: usize, mut value: usize, f: &mut F) {
        while value != 0 {
            let bit = value.trailing_zeros() as usize;
            f(self.object_of(i, bit));
            value &= value - 1;
        }
    }
}

impl std::fmt::Debug for RememberedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "RememberedSet({}..{}, {} objects)",
            self.start,
            self.start + self.extent,
            self.len()
        )
    }
}

/// Record a cross-generation edge from `container` to `referent`.
///
/// If the write could create an old-to-young pointer, `container` is added to the heap's
/// remembered set. Returns true if the container was newly remembered.
///
/// This is performed in addition to (and independently of) SATB recording. Skipping it
/// loses young-generation roots, which is a different bug from a missing SATB record.
pub fn update_remember_set<H: Heap + ?Sized>(
    heap: &H,
    container: ObjectReference,
    referent: ObjectReference,
) -> bool {
    assert!(
        !container.is_null(),
        "Updating the remembered set requires a container object"
    );
    if referent.is_null() || !heap.is_heap_address(referent.to_raw_address()) {
        return false;
    }
    if !heap.is_young_object(container) && heap.is_young_object(referent) {
        let added = heap.remembered_set().add(container);
        if added {
            trace!("Remember {} for its reference to {}", container, referent);
        }
        added
    } else {
        false
    }
}
