use super::mock_test_prelude::*;

use std::sync::Arc;

#[test]
fn barrier_follows_phase() {
    let vm = MockVM::default();
    let state = PhaseState::new();
    assert!(state
        .active_barrier(&vm, SatbPolicy::SnapshotAtBeginning)
        .is_none());

    for (phase, variant) in [
        (GCPhase::Enum, BarrierVariant::Enum),
        (GCPhase::Marking, BarrierVariant::Marking),
        (GCPhase::RemarkStack, BarrierVariant::Marking),
        (GCPhase::PostMarking, BarrierVariant::Trace),
    ] {
        state.set(phase);
        let barrier = state
            .active_barrier(&vm, SatbPolicy::SnapshotAtBeginning)
            .unwrap();
        assert_eq!(barrier.variant(), variant);
    }

    state.set(GCPhase::Copy);
    assert!(state
        .active_barrier(&vm, SatbPolicy::IncrementalUpdate)
        .is_none());
}

// A concurrent cycle with real mutators: writes go through the barrier of each phase, and the
// collector finds every overwritten object in the shared queue.
#[test]
fn mutator_buffers_reach_the_collector() {
    let _ = crate::util::logger::try_init();
    let vm = MockVM::default();
    let options = {
        let mut options = crate::util::options::Options::builtin_defaults();
        options.set_from_str("satb_buffer_capacity", "2");
        options
    };
    let queue = Arc::new(SatbQueue::new());
    let mut mutator = Mutator::new(queue.clone(), &options);
    let state = PhaseState::new();
    let container = vm.object(0);
    for i in 0..OBJECT_WORDS {
        vm.field(container, i).set_field_value(vm.object(1 + i).value());
    }

    for (i, phase) in [GCPhase::Enum, GCPhase::Marking, GCPhase::PostMarking]
        .into_iter()
        .enumerate()
    {
        state.set(phase);
        let barrier = state
            .active_barrier(&vm, options.satb_policy)
            .unwrap();
        barrier.write_ref_field(
            &mut mutator,
            container,
            vm.field(container, i),
            TaggedReference::NULL,
        );
    }
    state.set(GCPhase::Idle);
    assert_eq!(queue.num_buffers(), 1);
    mutator.flush();

    let mut recorded = vec![];
    assert_eq!(queue.drain_into(&mut recorded), 3);
    assert_eq!(recorded, vec![vm.object(1), vm.object(2), vm.object(3)]);
}

#[test]
fn barrier_from_options() {
    let vm = MockVM::default();
    let mut options = crate::util::options::Options::builtin_defaults();
    assert!(options.set_from_str("satb_policy", "IncrementalUpdate"));
    let barrier = TraceBarrier::from_options(&vm, &options);
    assert_eq!(barrier.policy(), SatbPolicy::IncrementalUpdate);
    assert_eq!(format!("{:?}", barrier), "TraceBarrier(IncrementalUpdate)");
}
