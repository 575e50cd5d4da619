// A minimal runtime written against the public API only.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use satb_barriers::plan::{GCPhase, PhaseState, RememberedSet, SatbQueue};
use satb_barriers::util::tagged::{self, TaggedReference};
use satb_barriers::util::{Address, ObjectReference, RefField};
use satb_barriers::vm::{GCReason, Heap, ObjectModel, VMBinding};
use satb_barriers::{Barrier, Mutator, SatbPolicy};

const OBJECT_WORDS: usize = 4;
const WORD: usize = std::mem::size_of::<usize>();

struct TinyHeap {
    words: Box<[AtomicUsize]>,
    remset: RememberedSet,
}

impl TinyHeap {
    fn new(objects: usize) -> Self {
        let words: Box<[AtomicUsize]> = (0..objects * OBJECT_WORDS)
            .map(|_| AtomicUsize::new(0))
            .collect();
        let remset = RememberedSet::new(Address::from_ptr(words.as_ptr()), words.len() * WORD);
        Self { words, remset }
    }

    fn start(&self) -> Address {
        Address::from_ptr(self.words.as_ptr())
    }

    fn object(&self, i: usize) -> ObjectReference {
        ObjectReference::from_raw_address(self.start() + i * OBJECT_WORDS * WORD)
    }

    fn field(&self, object: ObjectReference, i: usize) -> &RefField {
        unsafe { RefField::from_address(object.to_raw_address() + i * WORD) }
    }
}

impl Heap for TinyHeap {
    fn is_heap_address(&self, addr: Address) -> bool {
        addr.is_in_range(self.start(), self.words.len() * WORD)
    }

    fn is_tagged_object(&self, word: usize) -> bool {
        let object = tagged::target_of(word);
        !object.is_null() && self.is_heap_address(object.to_raw_address())
    }

    fn gc_reason(&self) -> GCReason {
        GCReason::Young
    }

    // The second half of the heap is young.
    fn is_young_object(&self, object: ObjectReference) -> bool {
        object.to_raw_address() - self.start() >= self.words.len() * WORD / 2
    }

    fn remembered_set(&self) -> &RememberedSet {
        &self.remset
    }
}

struct TinyObjectModel;

impl ObjectModel for TinyObjectModel {
    fn type_info(&self, _object: ObjectReference) -> Address {
        Address::ZERO
    }

    fn object_size(&self, _object: ObjectReference) -> usize {
        OBJECT_WORDS * WORD
    }

    fn for_each_ref_in_struct(
        &self,
        _object: ObjectReference,
        start: Address,
        end: Address,
        visitor: &mut dyn FnMut(&RefField),
    ) {
        let mut slot = start;
        while slot < end {
            visitor(unsafe { RefField::from_address(slot) });
            slot += WORD;
        }
    }
}

struct TinyVM {
    heap: TinyHeap,
    object_model: TinyObjectModel,
}

impl VMBinding for TinyVM {
    type VMHeap = TinyHeap;
    type VMObjectModel = TinyObjectModel;

    fn heap(&self) -> &TinyHeap {
        &self.heap
    }

    fn object_model(&self) -> &TinyObjectModel {
        &self.object_model
    }
}

#[test]
fn concurrent_cycle() {
    let _ = satb_barriers::util::logger::try_init();
    let vm = TinyVM {
        heap: TinyHeap::new(8),
        object_model: TinyObjectModel,
    };
    let queue = Arc::new(SatbQueue::new());
    let mut mutator = Mutator::with_capacity(queue.clone(), 16);
    let phase = PhaseState::new();
    let heap = &vm.heap;
    let (old, young) = (heap.object(0), heap.object(6));
    heap.field(old, 0).set_field_value(heap.object(1).value());

    phase.set(GCPhase::Marking);
    let barrier = phase
        .active_barrier(&vm, SatbPolicy::SnapshotAtBeginning)
        .unwrap();
    barrier.write_ref_field(&mut mutator, old, heap.field(old, 0), young.into());
    barrier.write_root(&mut mutator, heap.object(2));
    let swapped = barrier.atomic_swap_ref_field(
        &mut mutator,
        old,
        heap.field(old, 1),
        TaggedReference::weak(heap.object(3)),
        Ordering::SeqCst,
    );
    assert!(swapped.is_null());
    phase.set(GCPhase::Idle);
    mutator.flush();

    let mut recorded = vec![];
    queue.drain_into(&mut recorded);
    assert_eq!(recorded, vec![heap.object(1), heap.object(2)]);
    assert!(heap.remset.contains(old));
    assert_eq!(heap.field(old, 0).target_object(), young);
    assert!(heap.field(old, 1).is_weak());
}

#[test]
fn idle_phase_has_no_barrier() {
    let vm = TinyVM {
        heap: TinyHeap::new(2),
        object_model: TinyObjectModel,
    };
    assert!(PhaseState::new()
        .active_barrier(&vm, SatbPolicy::IncrementalUpdate)
        .is_none());
}
