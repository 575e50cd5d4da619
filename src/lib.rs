//! Read and write barriers for a concurrent tracing garbage collector.
//!
//! Mutator threads (and the collector's own tracer) call into a barrier every time they
//! read or write a reference-typed field. While a concurrent trace is in flight, the barrier
//! records objects into the mutator's snapshot-at-the-beginning (SATB) buffer so that no
//! object live at the snapshot is ever lost, and it records old-to-young edges into the
//! remembered set so that a young-only collection can find them without scanning the old
//! generation.
//!
//! The crate is organised the following way:
//! * [`util`]: addresses, the tagged reference encoding, the [`util::RefField`] slot type,
//!   options, logging and the optional sanitizer hooks.
//! * [`vm`]: the interfaces of the runtime that embeds the barriers: the [`vm::Heap`] oracle,
//!   the [`vm::ObjectModel`] and the [`vm::VMBinding`] that bundles them.
//! * [`plan`]: the barrier engine and its three phase variants ([`plan::MarkingBarrier`],
//!   [`plan::EnumBarrier`], [`plan::TraceBarrier`]), the SATB buffers, the remembered set
//!   and the collector phase model that selects the active variant.
//!
//! Barriers are selected externally by the collector's phase scheduler. A caller is written
//! against the [`plan::Barrier`] trait and is bound to whichever variant is active, either
//! statically through one of the variant types or dynamically through
//! [`plan::ActiveBarrier`].

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
#[macro_use]
extern crate static_assertions;

pub mod util;
pub mod plan;
pub mod vm;

pub use crate::plan::{
    ActiveBarrier, Barrier, BarrierEngine, BarrierVariant, EnumBarrier, MarkingBarrier,
    Mutator, MutatorContext, SatbPolicy, TraceBarrier,
};
