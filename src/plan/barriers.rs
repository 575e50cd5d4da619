//! Read/write barrier implementations.
//!
//! There is one barrier engine, [`BarrierEngine`], parameterized by a zero-sized variant tag
//! ([`MarkingPhase`], [`EnumPhase`] or [`TracePhase`]). The three barriers of a concurrent
//! collection, [`MarkingBarrier`], [`EnumBarrier`] and [`TraceBarrier`], are aliases of the
//! engine with a fixed tag, so the phase-specific recording policy is resolved at compile
//! time. [`ActiveBarrier`] is a tagged union of the three for callers that bind to the
//! variant selected by the collector's phase at run time.
//!
//! # The recording contract
//!
//! While a concurrent trace is in flight, every write that replaces a strong reference must
//! push either the overwritten value or the newly installed value (depending on the
//! [`SatbPolicy`]) into the mutator's SATB buffer *before* the new value becomes visible to
//! other threads. Plain writes guarantee the order with a sequentially consistent fence
//! between recording and storing. Omitting a record is a lost-object bug: the collector may
//! free an object that is still reachable.
//!
//! Independently of SATB recording, writes with a container object update the remembered
//! set (see [`crate::plan::remset::update_remember_set`]).

use std::marker::PhantomData;
use std::sync::atomic::{fence, Ordering};

use enum_map::Enum;
use strum_macros::{Display, EnumString};

use crate::plan::remset;
use crate::plan::{MutatorContext, SatbPolicy};
use crate::util::constants::BYTES_IN_ADDRESS;
use crate::util::options::Options;
use crate::util::statistics::{self, BarrierEvent};
use crate::util::tagged::{self, TaggedReference};
use crate::util::tsan;
use crate::util::{Address, ObjectReference, RefField};
use crate::vm::{GCReason, Heap, ObjectModel, VMBinding};

/// The barrier variants of a concurrent collection cycle.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Enum, EnumString, Display)]
pub enum BarrierVariant {
    /// Active during concurrent marking.
    Marking,
    /// Active during root enumeration. Every write is assumed to be reachable from roots,
    /// so this variant records both sides of atomic writes and struct copies.
    Enum,
    /// Active while the tracer finishes the transitive closure after marking.
    Trace,
}

/// A zero-sized tag that selects the variant of a [`BarrierEngine`] at compile time.
pub trait VariantTag: 'static + Send + Sync {
    const VARIANT: BarrierVariant;
}

/// Tag of [`MarkingBarrier`].
pub struct MarkingPhase;
/// Tag of [`EnumBarrier`].
pub struct EnumPhase;
/// Tag of [`TraceBarrier`].
pub struct TracePhase;

impl VariantTag for MarkingPhase {
    const VARIANT: BarrierVariant = BarrierVariant::Marking;
}
impl VariantTag for EnumPhase {
    const VARIANT: BarrierVariant = BarrierVariant::Enum;
}
impl VariantTag for TracePhase {
    const VARIANT: BarrierVariant = BarrierVariant::Trace;
}

/// The barrier used during concurrent marking.
pub type MarkingBarrier<'a, VM> = BarrierEngine<'a, VM, MarkingPhase>;
/// The barrier used during root enumeration.
pub type EnumBarrier<'a, VM> = BarrierEngine<'a, VM, EnumPhase>;
/// The barrier used during tracing.
pub type TraceBarrier<'a, VM> = BarrierEngine<'a, VM, TracePhase>;

/// The barrier capability. Compiled code, the interpreter and the collector's tracer are
/// written against this trait, and bound to the variant that is active.
///
/// Operations that may record objects take the mutator context of the calling thread.
/// Read operations are observation-only: they never relocate, poison or record the referent.
pub trait Barrier {
    /// The variant of this barrier.
    fn variant(&self) -> BarrierVariant;

    /// Read the object referenced by a field of `container`.
    fn read_ref_field(&self, container: ObjectReference, field: &RefField) -> ObjectReference;

    /// Read the object referenced by a field in static storage (a field without an owning
    /// object).
    fn read_static_ref(&self, field: &RefField) -> ObjectReference;

    /// Copy `size` bytes from `src` inside `container` to `dst`, without any barrier side
    /// effect.
    ///
    /// # Safety
    /// `src` must be readable and `dst` writable for `size` bytes, and the ranges must not
    /// overlap.
    unsafe fn read_struct(
        &self,
        dst: Address,
        container: ObjectReference,
        src: Address,
        size: usize,
    );

    /// Record a newly established root (stack or register) reference.
    fn write_root<M: MutatorContext + ?Sized>(&self, mutator: &mut M, object: ObjectReference);

    /// The always-safe plain write: update the remembered set, record the value the field
    /// held, fence, then store `new_ref`. `container` may be null for fields without an owning
    /// object.
    fn write_ref_field<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        container: ObjectReference,
        field: &RefField,
        new_ref: TaggedReference,
    );

    /// The fast-path write barrier used by compiled and interpreted code. It performs the
    /// bookkeeping for storing `new_ref` into `field` according to the SATB policy; the caller
    /// performs the store itself afterwards.
    fn write_barrier<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        container: ObjectReference,
        field: &RefField,
        new_ref: TaggedReference,
    );

    /// Write to a field in static storage.
    fn write_static_ref<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        field: &RefField,
        new_ref: TaggedReference,
    );

    /// Copy `src_len` bytes from `src` to `dst`, where `[dst, dst + dst_len)` is a range
    /// inside `container` that may hold reference fields. Every reference field in the
    /// destination range is recorded before the bytes are copied.
    ///
    /// # Safety
    /// `[dst, dst + dst_len)` must lie inside `container`, `src` must be readable for
    /// `src_len` bytes, and the ranges must not overlap.
    unsafe fn write_struct<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        container: ObjectReference,
        dst: Address,
        dst_len: usize,
        src: Address,
        src_len: usize,
    );

    /// Atomically read the object referenced by a field with the given memory order.
    fn atomic_read_ref_field(
        &self,
        container: ObjectReference,
        field: &RefField,
        order: Ordering,
    ) -> ObjectReference;

    /// Atomically store `new_ref` into a field with the given memory order, recording the
    /// value it replaces.
    fn atomic_write_ref_field<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        container: ObjectReference,
        field: &RefField,
        new_ref: TaggedReference,
        order: Ordering,
    );

    /// Atomically exchange the value of a field with `new_ref` with the given memory order.
    /// Returns the object previously referenced, and records it.
    fn atomic_swap_ref_field<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        container: ObjectReference,
        field: &RefField,
        new_ref: TaggedReference,
        order: Ordering,
    ) -> ObjectReference;

    /// Replace the value of a field with `new_ref` if it references `expected_old`. Returns
    /// true if this call transitioned the field, in which case `expected_old` is recorded
    /// exactly once. `failure` must not be `Release` or `AcqRel`.
    #[allow(clippy::too_many_arguments)]
    fn compare_and_swap_ref_field<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        container: ObjectReference,
        field: &RefField,
        expected_old: ObjectReference,
        new_ref: TaggedReference,
        success: Ordering,
        failure: Ordering,
    ) -> bool;

    /// Copy an array of structs: `src_size` bytes from `src_field` in `src_obj` to
    /// `dst_field` in `dst_obj`. The reference fields of the destination elements are
    /// recorded as in [`Barrier::write_struct`]. The ranges may overlap.
    ///
    /// # Safety
    /// `[dst_field, dst_field + dst_size)` must lie inside `dst_obj` and
    /// `[src_field, src_field + src_size)` inside `src_obj`.
    #[allow(clippy::too_many_arguments)]
    unsafe fn copy_struct_array<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        dst_obj: ObjectReference,
        dst_field: Address,
        dst_size: usize,
        src_obj: ObjectReference,
        src_field: Address,
        src_size: usize,
    );
}

/// The barrier engine. See the module documentation.
///
/// The engine holds no per-instance data besides the binding it consults and the SATB policy,
/// so it is cheap to copy and can be shared by all mutators.
pub struct BarrierEngine<'a, VM: VMBinding, V: VariantTag> {
    vm: &'a VM,
    policy: SatbPolicy,
    _variant: PhantomData<V>,
}

impl<VM: VMBinding, V: VariantTag> Clone for BarrierEngine<'_, VM, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<VM: VMBinding, V: VariantTag> Copy for BarrierEngine<'_, VM, V> {}

impl<VM: VMBinding, V: VariantTag> std::fmt::Debug for BarrierEngine<'_, VM, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}Barrier({})", V::VARIANT, self.policy)
    }
}

impl<'a, VM: VMBinding, V: VariantTag> BarrierEngine<'a, VM, V> {
    pub fn new(vm: &'a VM, policy: SatbPolicy) -> Self {
        Self {
            vm,
            policy,
            _variant: PhantomData,
        }
    }

    /// Create a barrier with the SATB policy from the options.
    pub fn from_options(vm: &'a VM, options: &Options) -> Self {
        Self::new(vm, options.satb_policy)
    }

    /// The SATB policy of this barrier.
    pub fn policy(&self) -> SatbPolicy {
        self.policy
    }

    fn heap(&self) -> &'a VM::VMHeap {
        self.vm.heap()
    }

    const fn is_enum() -> bool {
        matches!(V::VARIANT, BarrierVariant::Enum)
    }

    #[inline(always)]
    fn remember<M: MutatorContext + ?Sized>(&self, mutator: &mut M, object: ObjectReference) {
        debug_assert!(!object.is_null());
        statistics::count(V::VARIANT, BarrierEvent::SatbRecord);
        mutator.remember_object_in_satb_buffer(object);
    }

    /// Record the object a raw slot word refers to, if the word is a legitimate tagged
    /// object. The weak tag is cleared before recording.
    #[inline(always)]
    fn remember_word<M: MutatorContext + ?Sized>(&self, mutator: &mut M, word: usize) {
        if self.heap().is_tagged_object(word) {
            let object = tagged::target_of(word);
            if !object.is_null() {
                self.remember(mutator, object);
            }
        }
    }

    #[inline(always)]
    fn update_remember_set(&self, container: ObjectReference, new_ref: TaggedReference) {
        if container.is_null() || !self.heap().is_tagged_object(new_ref.word()) {
            return;
        }
        if remset::update_remember_set(self.heap(), container, new_ref.target()) {
            statistics::count(V::VARIANT, BarrierEvent::RememberedSetInsert);
        }
    }

    /// Under incremental update, the marking and trace barriers are scoped to the generation
    /// of the current collection, so they only maintain the remembered set for young
    /// collections. The enumeration barrier always does.
    fn incremental_update_maintains_remset(&self) -> bool {
        Self::is_enum() || self.heap().gc_reason() == GCReason::Young
    }

    /// Record every reference field in `[dst, dst + dst_len)` of `container`, and for the
    /// enumeration barrier also the source field at the mirrored offset.
    unsafe fn record_struct_fields<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        container: ObjectReference,
        dst: Address,
        dst_len: usize,
        src: Address,
        src_len: usize,
    ) {
        self.vm.object_model().for_each_ref_in_struct(
            container,
            dst,
            dst + dst_len,
            &mut |field: &RefField| {
                self.remember_word(mutator, field.field_value());
                if Self::is_enum() {
                    let offset = field.address() - dst;
                    if offset + BYTES_IN_ADDRESS <= src_len {
                        let src_field = RefField::from_address(src + offset);
                        self.remember_word(mutator, src_field.field_value());
                    }
                }
            },
        );
    }
}

impl<VM: VMBinding, V: VariantTag> Barrier for BarrierEngine<'_, VM, V> {
    fn variant(&self) -> BarrierVariant {
        V::VARIANT
    }

    #[inline(always)]
    fn read_ref_field(&self, _container: ObjectReference, field: &RefField) -> ObjectReference {
        field.target_object()
    }

    #[inline(always)]
    fn read_static_ref(&self, field: &RefField) -> ObjectReference {
        self.read_ref_field(ObjectReference::NULL, field)
    }

    unsafe fn read_struct(
        &self,
        dst: Address,
        container: ObjectReference,
        src: Address,
        size: usize,
    ) {
        debug_assert!(!container.is_null(), "read_struct requires a container object");
        std::ptr::copy_nonoverlapping(src.to_ptr::<u8>(), dst.to_mut_ptr::<u8>(), size);
        tsan::tsan_read_memory_range(src, size);
        tsan::tsan_write_memory_range(dst, size);
    }

    #[inline(always)]
    fn write_root<M: MutatorContext + ?Sized>(&self, mutator: &mut M, object: ObjectReference) {
        if !object.is_null() {
            self.remember(mutator, object);
        }
    }

    fn write_ref_field<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        container: ObjectReference,
        field: &RefField,
        new_ref: TaggedReference,
    ) {
        self.update_remember_set(container, new_ref);
        self.remember_word(mutator, field.field_value());
        fence(Ordering::SeqCst);
        field.set_field_value(new_ref.word());
    }

    #[inline(always)]
    fn write_barrier<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        container: ObjectReference,
        field: &RefField,
        new_ref: TaggedReference,
    ) {
        match self.policy {
            SatbPolicy::SnapshotAtBeginning => {
                self.update_remember_set(container, new_ref);
                let old = field.field_value();
                if !self.heap().is_tagged_object(old) {
                    statistics::count(V::VARIANT, BarrierEvent::FastPathExit);
                    return;
                }
                self.remember_word(mutator, old);
            }
            SatbPolicy::IncrementalUpdate => {
                if !self.heap().is_tagged_object(new_ref.word()) {
                    statistics::count(V::VARIANT, BarrierEvent::FastPathExit);
                    return;
                }
                if self.incremental_update_maintains_remset() {
                    self.update_remember_set(container, new_ref);
                }
                self.remember_word(mutator, new_ref.word());
            }
        }
    }

    fn write_static_ref<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        field: &RefField,
        new_ref: TaggedReference,
    ) {
        if Self::is_enum() {
            // Static roots are exactly what root enumeration discovers.
            self.write_ref_field(mutator, ObjectReference::NULL, field, new_ref);
        } else {
            // Static storage is always scanned as a root.
            fence(Ordering::SeqCst);
            field.set_field_value(new_ref.word());
        }
    }

    unsafe fn write_struct<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        container: ObjectReference,
        dst: Address,
        dst_len: usize,
        src: Address,
        src_len: usize,
    ) {
        assert!(
            !container.is_null(),
            "write_struct to {} requires a container object",
            dst
        );
        assert!(
            src_len <= dst_len,
            "write_struct of {} bytes into {} bytes at {}",
            src_len,
            dst_len,
            dst
        );
        trace!(
            "{:?}: write_struct {} <- {} ({} bytes) in {}",
            self,
            dst,
            src,
            src_len,
            container
        );
        self.record_struct_fields(mutator, container, dst, dst_len, src, src_len);
        fence(Ordering::SeqCst);
        std::ptr::copy_nonoverlapping(src.to_ptr::<u8>(), dst.to_mut_ptr::<u8>(), src_len);
        tsan::tsan_read_memory_range(src, src_len);
        tsan::tsan_write_memory_range(dst, src_len);
    }

    #[inline(always)]
    fn atomic_read_ref_field(
        &self,
        _container: ObjectReference,
        field: &RefField,
        order: Ordering,
    ) -> ObjectReference {
        field.target_object_with(order)
    }

    fn atomic_write_ref_field<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        container: ObjectReference,
        field: &RefField,
        new_ref: TaggedReference,
        order: Ordering,
    ) {
        let old = field.exchange(new_ref.word(), order);
        self.remember_word(mutator, old);
        if Self::is_enum() {
            self.remember_word(mutator, new_ref.word());
        }
        self.update_remember_set(container, new_ref);
    }

    fn atomic_swap_ref_field<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        container: ObjectReference,
        field: &RefField,
        new_ref: TaggedReference,
        order: Ordering,
    ) -> ObjectReference {
        let old = field.exchange(new_ref.word(), order);
        self.remember_word(mutator, old);
        if Self::is_enum() {
            self.remember_word(mutator, new_ref.word());
        }
        self.update_remember_set(container, new_ref);
        tagged::target_of(old)
    }

    fn compare_and_swap_ref_field<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        container: ObjectReference,
        field: &RefField,
        expected_old: ObjectReference,
        new_ref: TaggedReference,
        success: Ordering,
        failure: Ordering,
    ) -> bool {
        let mut current = field.field_value_with(Ordering::SeqCst);
        while tagged::target_of(current) == expected_old {
            // A weak CAS may fail spuriously. Only a changed value ends the loop.
            if field
                .compare_exchange_weak(current, new_ref.word(), success, failure)
                .is_ok()
            {
                self.update_remember_set(container, new_ref);
                self.remember_word(mutator, current);
                if Self::is_enum() {
                    self.remember_word(mutator, new_ref.word());
                }
                return true;
            }
            statistics::count(V::VARIANT, BarrierEvent::CasRetry);
            current = field.field_value_with(Ordering::SeqCst);
        }
        false
    }

    unsafe fn copy_struct_array<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        dst_obj: ObjectReference,
        dst_field: Address,
        dst_size: usize,
        src_obj: ObjectReference,
        src_field: Address,
        src_size: usize,
    ) {
        assert!(
            !dst_obj.is_null() && !src_obj.is_null(),
            "copy_struct_array requires both the source and the destination objects"
        );
        assert!(
            src_size <= dst_size,
            "copy_struct_array of {} bytes into {} bytes at {}",
            src_size,
            dst_size,
            dst_field
        );
        trace!(
            "{:?}: copy_struct_array {} in {} <- {} in {} ({} bytes)",
            self,
            dst_field,
            dst_obj,
            src_field,
            src_obj,
            src_size
        );
        self.record_struct_fields(mutator, dst_obj, dst_field, dst_size, src_field, src_size);
        fence(Ordering::SeqCst);
        // Array copies may move elements within the same array.
        std::ptr::copy(
            src_field.to_ptr::<u8>(),
            dst_field.to_mut_ptr::<u8>(),
            src_size,
        );
        tsan::tsan_read_memory_range(src_field, src_size);
        tsan::tsan_write_memory_range(dst_field, src_size);
    }
}

/// The barrier of the current phase, chosen at run time.
pub enum ActiveBarrier<'a, VM: VMBinding> {
    Marking(MarkingBarrier<'a, VM>),
    Enum(EnumBarrier<'a, VM>),
    Trace(TraceBarrier<'a, VM>),
}

impl<VM: VMBinding> Clone for ActiveBarrier<'_, VM> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<VM: VMBinding> Copy for ActiveBarrier<'_, VM> {}

impl<'a, VM: VMBinding> ActiveBarrier<'a, VM> {
    /// Create the barrier of a variant.
    pub fn new(variant: BarrierVariant, vm: &'a VM, policy: SatbPolicy) -> Self {
        match variant {
            BarrierVariant::Marking => ActiveBarrier::Marking(BarrierEngine::new(vm, policy)),
            BarrierVariant::Enum => ActiveBarrier::Enum(BarrierEngine::new(vm, policy)),
            BarrierVariant::Trace => ActiveBarrier::Trace(BarrierEngine::new(vm, policy)),
        }
    }
}

macro_rules! dispatch {
    ($self: ident, $barrier: ident => $e: expr) => {
        match $self {
            ActiveBarrier::Marking($barrier) => $e,
            ActiveBarrier::Enum($barrier) => $e,
            ActiveBarrier::Trace($barrier) => $e,
        }
    };
}

impl<VM: VMBinding> Barrier for ActiveBarrier<'_, VM> {
    fn variant(&self) -> BarrierVariant {
        dispatch!(self, b => b.variant())
    }

    fn read_ref_field(&self, container: ObjectReference, field: &RefField) -> ObjectReference {
        dispatch!(self, b => b.read_ref_field(container, field))
    }

    fn read_static_ref(&self, field: &RefField) -> ObjectReference {
        dispatch!(self, b => b.read_static_ref(field))
    }

    unsafe fn read_struct(
        &self,
        dst: Address,
        container: ObjectReference,
        src: Address,
        size: usize,
    ) {
        dispatch!(self, b => b.read_struct(dst, container, src, size))
    }

    fn write_root<M: MutatorContext + ?Sized>(&self, mutator: &mut M, object: ObjectReference) {
        dispatch!(self, b => b.write_root(mutator, object))
    }

    fn write_ref_field<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        container: ObjectReference,
        field: &RefField,
        new_ref: TaggedReference,
    ) {
        dispatch!(self, b => b.write_ref_field(mutator, container, field, new_ref))
    }

    fn write_barrier<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        container: ObjectReference,
        field: &RefField,
        new_ref: TaggedReference,
    ) {
        dispatch!(self, b => b.write_barrier(mutator, container, field, new_ref))
    }

    fn write_static_ref<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        field: &RefField,
        new_ref: TaggedReference,
    ) {
        dispatch!(self, b => b.write_static_ref(mutator, field, new_ref))
    }

    unsafe fn write_struct<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        container: ObjectReference,
        dst: Address,
        dst_len: usize,
        src: Address,
        src_len: usize,
    ) {
        dispatch!(self, b => b.write_struct(mutator, container, dst, dst_len, src, src_len))
    }

    fn atomic_read_ref_field(
        &self,
        container: ObjectReference,
        field: &RefField,
        order: Ordering,
    ) -> ObjectReference {
        dispatch!(self, b => b.atomic_read_ref_field(container, field, order))
    }

    fn atomic_write_ref_field<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        container: ObjectReference,
        field: &RefField,
        new_ref: TaggedReference,
        order: Ordering,
    ) {
        dispatch!(self, b => b.atomic_write_ref_field(mutator, container, field, new_ref, order))
    }

    fn atomic_swap_ref_field<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        container: ObjectReference,
        field: &RefField,
        new_ref: TaggedReference,
        order: Ordering,
    ) -> ObjectReference {
        dispatch!(self, b => b.atomic_swap_ref_field(mutator, container, field, new_ref, order))
    }

    fn compare_and_swap_ref_field<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        container: ObjectReference,
        field: &RefField,
        expected_old: ObjectReference,
        new_ref: TaggedReference,
        success: Ordering,
        failure: Ordering,
    ) -> bool {
        dispatch!(self, b => b.compare_and_swap_ref_field(
            mutator,
            container,
            field,
            expected_old,
            new_ref,
            success,
            failure
        ))
    }

    unsafe fn copy_struct_array<M: MutatorContext + ?Sized>(
        &self,
        mutator: &mut M,
        dst_obj: ObjectReference,
        dst_field: Address,
        dst_size: usize,
        src_obj: ObjectReference,
        src_field: Address,
        src_size: usize,
    ) {
        dispatch!(self, b => b.copy_struct_array(
            mutator,
            dst_obj,
            dst_field,
            dst_size,
            src_obj,
            src_field,
            src_size
        ))
    }
}
