//! A mock runtime for testing the barriers.
//!
//! The mock heap is a block of real memory divided into fixed-size objects. The objects at
//! the end of the block form the young generation. Every word of an object is a reference
//! field unless the object model is told otherwise, so tests can read and write fields
//! through [`MockVM::field`] and observe what the barriers record with a
//! [`RecordingMutator`].

use std::sync::atomic::{AtomicUsize, Ordering};

use atomic::Atomic;

use crate::plan::{MutatorContext, RememberedSet};
use crate::util::constants::*;
use crate::util::ref_field::RefFieldRangeIterator;
use crate::util::tagged;
use crate::util::{Address, ObjectReference, RefField};
use crate::vm::{GCReason, Heap, ObjectModel, VMBinding};

/// The number of words in each mock object.
pub const OBJECT_WORDS: usize = 8;
/// The size of each mock object in bytes.
pub const OBJECT_BYTES: usize = OBJECT_WORDS * BYTES_IN_WORD;

pub type TaggedObjectPredicate = Box<dyn Fn(usize) -> bool + Send + Sync>;

pub struct MockHeap {
    memory: Box<[AtomicUsize]>,
    start: Address,
    extent: usize,
    young_start: Address,
    gc_reason: Atomic<GCReason>,
    remset: RememberedSet,
    // Overrides the default decision of `is_tagged_object`.
    tagged_object: Option<TaggedObjectPredicate>,
}

impl MockHeap {
    fn new(old_objects: usize, young_objects: usize) -> Self {
        let words = (old_objects + young_objects) * OBJECT_WORDS;
        let memory: Box<[AtomicUsize]> = (0..words).map(|_| AtomicUsize::new(0)).collect();
        let start = Address::from_ptr(memory.as_ptr());
        let extent = words * BYTES_IN_WORD;
        Self {
            start,
            extent,
            young_start: start + old_objects * OBJECT_BYTES,
            gc_reason: Atomic::new(GCReason::Full),
            remset: RememberedSet::new(start, extent),
            tagged_object: None,
            memory,
        }
    }

    pub fn num_objects(&self) -> usize {
        self.memory.len() / OBJECT_WORDS
    }

    /// The i-th object of the heap.
    pub fn object(&self, i: usize) -> ObjectReference {
        assert!(i < self.num_objects());
        ObjectReference::from_raw_address(self.start + i * OBJECT_BYTES)
    }

    pub fn set_gc_reason(&self, reason: GCReason) {
        self.gc_reason.store(reason, Ordering::SeqCst);
    }
}

impl Heap for MockHeap {
    fn is_heap_address(&self, addr: Address) -> bool {
        addr.is_in_range(self.start, self.extent)
    }

    fn is_tagged_object(&self, word: usize) -> bool {
        if let Some(f) = self.tagged_object.as_ref() {
            return f(word);
        }
        let object = tagged::target_of(word);
        !object.is_null()
            && self.is_heap_address(object.to_raw_address())
            && (object.to_raw_address() - self.start) % OBJECT_BYTES == 0
    }

    fn gc_reason(&self) -> GCReason {
        self.gc_reason.load(Ordering::SeqCst)
    }

    fn is_young_object(&self, object: ObjectReference) -> bool {
        let addr = object.to_raw_address();
        self.is_heap_address(addr) && addr >= self.young_start
    }

    fn remembered_set(&self) -> &RememberedSet {
        &self.remset
    }
}

#[derive(Default)]
pub struct MockObjectModel {
    // If set, `(element_bytes, ref_offsets)`: only the words at these offsets of every
    // element of a struct range are references.
    struct_layout: Option<(usize, Vec<usize>)>,
}

impl ObjectModel for MockObjectModel {
    fn type_info(&self, object: ObjectReference) -> Address {
        // Mock objects have no header. Pretend the type is identified by the object size.
        unsafe { Address::from_usize(self.object_size(object)) }
    }

    fn object_size(&self, _object: ObjectReference) -> usize {
        OBJECT_BYTES
    }

    fn for_each_ref_in_struct(
        &self,
        object: ObjectReference,
        start: Address,
        end: Address,
        visitor: &mut dyn FnMut(&RefField),
    ) {
        let object_start = object.to_raw_address();
        assert!(start >= object_start && end <= object_start + self.object_size(object));
        for slot in RefFieldRangeIterator::new(start, end) {
            let is_ref = match self.struct_layout.as_ref() {
                Some((element_bytes, offsets)) => {
                    offsets.contains(&((slot - start) % element_bytes))
                }
                None => true,
            };
            if is_ref {
                visitor(unsafe { RefField::from_address(slot) });
            }
        }
    }
}

pub struct MockVM {
    pub heap: MockHeap,
    pub object_model: MockObjectModel,
}

impl MockVM {
    /// A heap of `old_objects` old objects followed by `young_objects` young objects.
    pub fn new(old_objects: usize, young_objects: usize) -> Self {
        Self {
            heap: MockHeap::new(old_objects, young_objects),
            object_model: MockObjectModel::default(),
        }
    }

    /// Replace the default decision of [`Heap::is_tagged_object`].
    pub fn with_tagged_object<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) -> bool + Send + Sync + 'static,
    {
        self.heap.tagged_object = Some(Box::new(f));
        self
    }

    /// Only treat the words at `ref_offsets` of each `element_bytes` element of a struct
    /// range as references.
    pub fn with_struct_layout(mut self, element_bytes: usize, ref_offsets: Vec<usize>) -> Self {
        self.object_model.struct_layout = Some((element_bytes, ref_offsets));
        self
    }

    pub fn object(&self, i: usize) -> ObjectReference {
        self.heap.object(i)
    }

    /// The `n`-th word of an object as a reference field.
    pub fn field(&self, object: ObjectReference, n: usize) -> &RefField {
        assert!(n < OBJECT_WORDS);
        assert!(self.heap.is_heap_address(object.to_raw_address()));
        unsafe { RefField::from_address(object.to_raw_address() + n * BYTES_IN_WORD) }
    }

    /// Clear every word of the heap and the remembered set.
    pub fn reset(&self) {
        for word in self.heap.memory.iter() {
            word.store(0, Ordering::SeqCst);
        }
        self.heap.remset.clear();
    }
}

impl Default for MockVM {
    fn default() -> Self {
        Self::new(16, 16)
    }
}

impl VMBinding for MockVM {
    type VMHeap = MockHeap;
    type VMObjectModel = MockObjectModel;

    fn heap(&self) -> &MockHeap {
        &self.heap
    }

    fn object_model(&self) -> &MockObjectModel {
        &self.object_model
    }
}

/// A mutator context that keeps every recorded object.
#[derive(Default, Debug)]
pub struct RecordingMutator {
    pub recorded: Vec<ObjectReference>,
}

impl RecordingMutator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, object: ObjectReference) -> usize {
        self.recorded.iter().filter(|o| **o == object).count()
    }

    pub fn clear(&mut self) {
        self.recorded.clear();
    }
}

impl MutatorContext for RecordingMutator {
    fn remember_object_in_satb_buffer(&mut self, object: ObjectReference) {
        assert!(!object.is_null(), "null object recorded");
        assert!(
            !tagged::is_weak(object.value()),
            "weak tagged word {} recorded",
            object
        );
        self.recorded.push(object);
    }
}
