use bytemuck::NoUninit;

use crate::plan::RememberedSet;
use crate::util::{Address, ObjectReference};

/// Why the current collection cycle was triggered.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, NoUninit)]
pub enum GCReason {
    /// A young-generation collection.
    Young = 1,
    /// A full-heap collection.
    Full,
    /// Requested by the program.
    User,
    /// Triggered by the heap sizing heuristics.
    Heuristic,
    /// The heap is out of memory.
    OutOfMemory,
}

/// The process-wide heap oracle.
///
/// The barriers treat the heap as read-only external state whose lifetime is independent of
/// any single collection. All methods may be called concurrently from any mutator or
/// collector thread, and they are called on every barrier slow path, so they need to be cheap.
pub trait Heap: Send + Sync {
    /// Is `addr` inside the managed heap?
    fn is_heap_address(&self, addr: Address) -> bool;

    /// Is the raw word a legitimate tagged object, i.e. a (strong or weak) reference to a
    /// heap object rather than null or a boxed scalar that looks like a tagged pointer?
    fn is_tagged_object(&self, word: usize) -> bool;

    /// The reason that triggered the current collection cycle.
    fn gc_reason(&self) -> GCReason;

    /// Is the object in the young generation?
    fn is_young_object(&self, object: ObjectReference) -> bool;

    /// The remembered set that records old objects holding references to young objects.
    fn remembered_set(&self) -> &RememberedSet;
}
