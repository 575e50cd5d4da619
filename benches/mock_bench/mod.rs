use criterion::Criterion;

pub mod atomic;
pub mod write_barrier;

pub fn bench(c: &mut Criterion) {
    write_barrier::bench(c);
    atomic::bench(c);
}
