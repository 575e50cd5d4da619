//! The interfaces of the runtime that embeds the barriers.
//!
//! The barriers do not own the heap, the objects or the mutator threads. They consult a
//! [`Heap`] oracle, enumerate reference fields through an [`ObjectModel`], and receive the
//! mutator context explicitly in every recording call. A runtime implements these traits and
//! bundles them in a [`VMBinding`].

mod heap;
mod object_model;
mod vmbinding;

#[cfg(test)]
mod tests;

pub use self::heap::GCReason;
pub use self::heap::Heap;
pub use self::object_model::ObjectModel;
pub use self::vmbinding::VMBinding;
