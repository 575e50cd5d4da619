//! The collector phases and the barrier variant each phase requires.

use std::sync::atomic::Ordering;

use atomic::Atomic;
use bytemuck::NoUninit;
use strum_macros::{Display, EnumString};

use crate::plan::{ActiveBarrier, BarrierVariant, SatbPolicy};
use crate::vm::VMBinding;

/// The phases of a concurrent collection cycle.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default, NoUninit, EnumString, Display)]
pub enum GCPhase {
    /// No collection is in progress.
    #[default]
    Idle = 1,
    /// Roots are being enumerated.
    Enum,
    /// Objects are being marked concurrently.
    Marking,
    /// Mutator stacks are rescanned.
    RemarkStack,
    /// Marking is done and the tracer finishes the transitive closure.
    PostMarking,
    /// Live objects are being selected for evacuation.
    Precopy,
    /// Live objects are being evacuated.
    Copy,
    /// References to evacuated objects are being fixed.
    Fix,
}

unsafe impl bytemuck::ZeroableInOption for GCPhase {}

unsafe impl bytemuck::PodInOption for GCPhase {}

impl GCPhase {
    /// The barrier variant the mutators must use in this phase, or `None` if no SATB
    /// recording is needed.
    pub const fn barrier_variant(self) -> Option<BarrierVariant> {
        match self {
            GCPhase::Enum => Some(BarrierVariant::Enum),
            GCPhase::Marking | GCPhase::RemarkStack => Some(BarrierVariant::Marking),
            GCPhase::PostMarking => Some(BarrierVariant::Trace),
            GCPhase::Idle | GCPhase::Precopy | GCPhase::Copy | GCPhase::Fix => None,
        }
    }

    /// Is the concurrent trace in flight in this phase?
    pub const fn is_tracing(self) -> bool {
        self.barrier_variant().is_some()
    }
}

/// The current phase of the collector, shared by the collector and all mutators.
///
/// The collector sets the phase at safepoints. Mutators read it to bind to the barrier of
/// the phase.
pub struct PhaseState {
    phase: Atomic<GCPhase>,
}

impl Default for PhaseState {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseState {
    pub fn new() -> Self {
        Self {
            phase: Atomic::new(GCPhase::Idle),
        }
    }

    /// The current phase.
    pub fn current(&self) -> GCPhase {
        self.phase.load(Ordering::SeqCst)
    }

    /// Enter a new phase. Returns the previous phase.
    pub fn set(&self, phase: GCPhase) -> GCPhase {
        let old = self.phase.swap(phase, Ordering::SeqCst);
        debug!("GC phase {} -> {}", old, phase);
        old
    }

    /// The barrier of the current phase, or `None` if no SATB recording is needed.
    pub fn active_barrier<'a, VM: VMBinding>(
        &self,
        vm: &'a VM,
        policy: SatbPolicy,
    ) -> Option<ActiveBarrier<'a, VM>> {
        self.current()
            .barrier_variant()
            .map(|variant| ActiveBarrier::new(variant, vm, policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn phase_to_variant() {
        assert_eq!(GCPhase::Enum.barrier_variant(), Some(BarrierVariant::Enum));
        assert_eq!(
            GCPhase::Marking.barrier_variant(),
            Some(BarrierVariant::Marking)
        );
        assert_eq!(
            GCPhase::RemarkStack.barrier_variant(),
            Some(BarrierVariant::Marking)
        );
        assert_eq!(
            GCPhase::PostMarking.barrier_variant(),
            Some(BarrierVariant::Trace)
        );
        for phase in [GCPhase::Idle, GCPhase::Precopy, GCPhase::Copy, GCPhase::Fix] {
            assert_eq!(phase.barrier_variant(), None);
            assert!(!phase.is_tracing());
        }
    }

    #[test]
    fn phase_transitions() {
        let state = PhaseState::default();
        assert_eq!(state.current(), GCPhase::Idle);
        assert_eq!(state.set(GCPhase::Enum), GCPhase::Idle);
        assert_eq!(state.set(GCPhase::Marking), GCPhase::Enum);
        assert_eq!(state.current(), GCPhase::Marking);
    }

    #[test]
    fn parse_phase() {
        assert_eq!(GCPhase::from_str("PostMarking").unwrap(), GCPhase::PostMarking);
        assert_eq!(GCPhase::RemarkStack.to_string(), "RemarkStack");
    }
}
