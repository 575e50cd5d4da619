use super::{Heap, ObjectModel};

/// The `VMBinding` trait bundles the runtime-specific collaborators of the barriers.
///
/// A barrier engine holds a reference to a binding and reaches the heap oracle and the
/// object model through it. A test can bind the barriers to fakes by implementing this trait.
pub trait VMBinding: Send + Sync {
    /// The heap oracle of this runtime.
    type VMHeap: Heap;
    /// The object model of this runtime.
    type VMObjectModel: ObjectModel;

    /// Get the heap oracle.
    fn heap(&self) -> &Self::VMHeap;

    /// Get the object model.
    fn object_model(&self) -> &Self::VMObjectModel;
}
