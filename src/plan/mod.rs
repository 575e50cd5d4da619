//! The barriers of a concurrent collection cycle and the state they maintain.
//!
//! * [`barriers`]: the [`Barrier`] capability, the [`BarrierEngine`] and its three variants.
//! * [`policy`]: the SATB recording policy.
//! * [`satb`]: the per-mutator SATB buffers and the shared queue of completed buffers.
//! * [`remset`]: the remembered set of old-to-young edges.
//! * [`phase`]: the collector phases and the barrier variant each phase requires.

pub mod barriers;
pub mod phase;
pub mod policy;
pub mod remset;
pub mod satb;

pub use self::barriers::ActiveBarrier;
pub use self::barriers::Barrier;
pub use self::barriers::BarrierEngine;
pub use self::barriers::BarrierVariant;
pub use self::barriers::EnumBarrier;
pub use self::barriers::MarkingBarrier;
pub use self::barriers::TraceBarrier;
pub use self::barriers::VariantTag;
pub use self::barriers::{EnumPhase, MarkingPhase, TracePhase};
pub use self::phase::GCPhase;
pub use self::phase::PhaseState;
pub use self::policy::SatbPolicy;
pub use self::remset::update_remember_set;
pub use self::remset::RememberedSet;
pub use self::satb::Mutator;
pub use self::satb::MutatorContext;
pub use self::satb::SatbBuffer;
pub use self::satb::SatbQueue;
