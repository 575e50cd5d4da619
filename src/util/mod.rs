//! Utilities shared by the barrier engine: addresses and object references, the tagged
//! reference encoding, reference slots, options, logging and optional tooling hooks.

/// Address and object reference types.
pub mod address;
/// Constants for sizes of machine words and bytes.
pub mod constants;
/// Alignment helpers.
pub mod conversions;
/// Logger initialization.
pub mod logger;
/// Options that configure the barriers.
pub mod options;
/// Word-sized reference slots.
pub mod ref_field;
/// Counters of barrier events.
pub mod statistics;
/// Tagged reference encoding.
pub mod tagged;
/// ThreadSanitizer annotations for raw memory copies.
pub mod tsan;

#[cfg(any(test, feature = "test_private"))]
pub mod test_util;

pub use self::address::Address;
pub use self::address::ObjectReference;
pub use self::ref_field::RefField;
