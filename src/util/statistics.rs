//! Counters of barrier events, kept per barrier variant.
//!
//! Counting is only performed with the `barrier_stats` feature. Without it, [`count`] is a
//! no-op and all the counters stay zero.

use std::sync::atomic::{AtomicUsize, Ordering};

use enum_map::{Enum, EnumMap};

use crate::plan::BarrierVariant;

/// The kinds of barrier events we count.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Enum)]
pub enum BarrierEvent {
    /// An object was pushed into a SATB buffer.
    SatbRecord,
    /// A write barrier call that returned early without side effects.
    FastPathExit,
    /// A container was newly added to the remembered set.
    RememberedSetInsert,
    /// A failed hardware compare-and-swap attempt that was retried.
    CasRetry,
}

/// A table of counters indexed by variant and event.
pub struct BarrierCounters {
    counts: EnumMap<BarrierVariant, EnumMap<BarrierEvent, AtomicUsize>>,
}

impl BarrierCounters {
    fn new() -> Self {
        Self {
            counts: EnumMap::default(),
        }
    }

    /// The current value of a counter.
    pub fn get(&self, variant: BarrierVariant, event: BarrierEvent) -> usize {
        self.counts[variant][event].load(Ordering::Relaxed)
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for (_, events) in self.counts.iter() {
            for (_, counter) in events.iter() {
                counter.store(0, Ordering::Relaxed);
            }
        }
    }

    /// Log all the non-zero counters.
    pub fn print(&self) {
        for (variant, events) in self.counts.iter() {
            for (event, counter) in events.iter() {
                let value = counter.load(Ordering::Relaxed);
                if value != 0 {
                    info!("{:?}.{:?} = {}", variant, event, value);
                }
            }
        }
    }

    fn inc(&self, variant: BarrierVariant, event: BarrierEvent) {
        self.counts[variant][event].fetch_add(1, Ordering::Relaxed);
    }
}

lazy_static! {
    /// The process-wide barrier counters.
    pub static ref BARRIER_COUNTERS: BarrierCounters = BarrierCounters::new();
}

/// Count one event for a variant.
#[inline(always)]
pub fn count(variant: BarrierVariant, event: BarrierEvent) {
    if cfg!(feature = "barrier_stats") {
        BARRIER_COUNTERS.inc(variant, event);
    }
}
