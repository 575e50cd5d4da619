use std::sync::atomic::Ordering;

use criterion::black_box;
use criterion::Criterion;

use satb_barriers::util::test_util::mock_vm::*;
use satb_barriers::{Barrier, MarkingBarrier, SatbPolicy};

pub fn bench(c: &mut Criterion) {
    let vm = MockVM::default();
    let container = vm.object(0);
    let field = vm.field(container, 0);
    let (a, b) = (vm.object(1), vm.object(2));
    let barrier = MarkingBarrier::new(&vm, SatbPolicy::SnapshotAtBeginning);
    let mut mutator = RecordingMutator::new();
    field.set_field_value(a.value());

    c.bench_function("compare and swap", |bencher| {
        bencher.iter(|| {
            let current = field.target_object();
            let new = if current == a { b } else { a };
            black_box(barrier.compare_and_swap_ref_field(
                &mut mutator,
                container,
                field,
                current,
                new.into(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            ));
            mutator.clear();
        })
    });

    c.bench_function("atomic swap", |bencher| {
        bencher.iter(|| {
            black_box(barrier.atomic_swap_ref_field(
                &mut mutator,
                container,
                field,
                a.into(),
                Ordering::SeqCst,
            ));
            mutator.clear();
        })
    });
}
