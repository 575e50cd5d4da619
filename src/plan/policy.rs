use strum_macros::{Display, EnumString};

/// The SATB recording policy of the write barriers.
///
/// The two policies are mutually exclusive strategies for deciding which value of a plain
/// write is pushed into the mutator's SATB buffer. The policy is chosen at run time (see
/// [`crate::util::options::Options::satb_policy`]), so both can be exercised by the same
/// binary.
///
/// Atomic writes, swaps and compare-and-swaps are not affected by the policy. They always
/// record the value they overwrite.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, EnumString, Display)]
pub enum SatbPolicy {
    /// Snapshot-at-the-beginning. A plain write records the *old* referent of the slot, if the
    /// slot holds a legitimate tagged object. The new value is not recorded by the write
    /// barrier: its liveness is established by root enumeration. Root writes record the newly
    /// rooted object.
    #[default]
    SnapshotAtBeginning,
    /// Incremental update. A plain write records the *new* value (with the weak tag
    /// cleared) instead of the old one. Marking and trace barriers only update the
    /// remembered set for young collections, while the enumeration barrier updates it
    /// unconditionally.
    IncrementalUpdate,
}

impl SatbPolicy {
    /// Does a plain write record the value it overwrites?
    pub const fn records_old_value(self) -> bool {
        matches!(self, SatbPolicy::SnapshotAtBeginning)
    }

    /// Does a plain write record the value it installs?
    pub const fn records_new_value(self) -> bool {
        matches!(self, SatbPolicy::IncrementalUpdate)
    }
}
