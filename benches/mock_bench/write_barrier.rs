use criterion::black_box;
use criterion::Criterion;

use satb_barriers::util::test_util::mock_vm::*;
use satb_barriers::util::tagged::TaggedReference;
use satb_barriers::{Barrier, EnumBarrier, MarkingBarrier, SatbPolicy};

pub fn bench(c: &mut Criterion) {
    let vm = MockVM::default();
    let container = vm.object(0);
    let field = vm.field(container, 0);
    let (a, b) = (vm.object(1), vm.object(2));
    let mut mutator = RecordingMutator::new();

    let marking = MarkingBarrier::new(&vm, SatbPolicy::SnapshotAtBeginning);
    c.bench_function("write barrier fast path", |bencher| {
        field.set_field_value(0);
        bencher.iter(|| {
            marking.write_barrier(&mut mutator, container, field, black_box(a.into()));
        })
    });

    c.bench_function("write_ref_field satb", |bencher| {
        bencher.iter(|| {
            marking.write_ref_field(&mut mutator, container, field, black_box(a.into()));
            marking.write_ref_field(&mut mutator, container, field, black_box(b.into()));
            mutator.clear();
        })
    });

    let incremental = EnumBarrier::new(&vm, SatbPolicy::IncrementalUpdate);
    c.bench_function("write barrier incremental update", |bencher| {
        bencher.iter(|| {
            incremental.write_barrier(
                &mut mutator,
                container,
                field,
                black_box(TaggedReference::weak(b)),
            );
            mutator.clear();
        })
    });
}
