use crate::util::{Address, ObjectReference, RefField};

/// The capabilities of a heap object (a *base object*) the barriers rely on.
///
/// The barriers never allocate, free or move objects. They only ask for the layout
/// information below.
pub trait ObjectModel: Send + Sync {
    /// The type info of an object.
    fn type_info(&self, object: ObjectReference) -> Address;

    /// The size of an object in bytes.
    fn object_size(&self, object: ObjectReference) -> usize;

    /// Visit every reference-typed sub-field of `object` whose slot lies in `[start, end)`.
    ///
    /// This is used for struct and array copies, where `[start, end)` is a byte range inside
    /// the object that may hold reference and non-reference data. Non-reference slots must be
    /// skipped. Each reference slot is visited once.
    fn for_each_ref_in_struct(
        &self,
        object: ObjectReference,
        start: Address,
        end: Address,
        visitor: &mut dyn FnMut(&RefField),
    );
}
