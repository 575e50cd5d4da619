// All the tests with prefix 'mock_test_' run against the mock runtime in
// `crate::util::test_util::mock_vm`, which is only compiled with the feature 'mock_test'.
// Each test creates its own `MockVM`, so the tests can run in parallel. Tests that observe
// process-wide state (the barrier counters) use `serial_test`.

#[cfg(feature = "mock_test")]
mod mock_test_prelude {
    pub use crate::plan::*;
    pub use crate::util::tagged::TaggedReference;
    pub use crate::util::test_util::mock_vm::*;
    pub use crate::util::test_util::*;
    pub use crate::util::{Address, ObjectReference, RefField};
    pub use crate::vm::*;
    pub use std::sync::atomic::Ordering;

    /// Stamp a test body out once per barrier variant. The body sees the variant's barrier
    /// type as `B`.
    macro_rules! for_each_variant {
        ($name: ident, |$b: ident| $body: block) => {
            paste::paste! {
                #[test]
                fn [<$name _marking>]() {
                    type $b<'a> = MarkingBarrier<'a, MockVM>;
                    $body
                }
                #[test]
                fn [<$name _enum>]() {
                    type $b<'a> = EnumBarrier<'a, MockVM>;
                    $body
                }
                #[test]
                fn [<$name _trace>]() {
                    type $b<'a> = TraceBarrier<'a, MockVM>;
                    $body
                }
            }
        };
    }
    pub(crate) use for_each_variant;
}

#[cfg(feature = "mock_test")]
mod mock_test_phase_dispatch;
