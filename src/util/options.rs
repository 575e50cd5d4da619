//! Options for the barriers.
//!
//! Each option has a default value, and the default can be overridden by an environment
//! variable named after the option with the prefix `BARRIER_` in upper case (for example,
//! `BARRIER_SATB_POLICY=IncrementalUpdate`), or programmatically by
//! [`Options::set_from_str`]. Invalid values are ignored with a warning, and the previous
//! value is kept.

use crate::plan::SatbPolicy;
use crate::util::constants::DEFAULT_SATB_BUFFER_CAPACITY;

fn always_valid<T>(_: &T) -> bool {
    true
}

macro_rules! options {
    ($($(#[$outer:meta])* $name:ident: $type:ty[$validator:expr] = $default:expr),*,) => [
        options!($($(#[$outer])* $name: $type[$validator] = $default),*);
    ];
    ($($(#[$outer:meta])* $name:ident: $type:ty[$validator:expr] = $default:expr),*) => [
        /// The set of options of the barriers.
        #[derive(Clone, Debug)]
        pub struct Options {
            $($(#[$outer])* pub $name: $type),*
        }
        impl Options {
            /// Set an option by its name (in snake case) from a string. Return true if the
            /// value is parsed and valid and the option is updated.
            pub fn set_from_str(&mut self, s: &str, val: &str) -> bool {
                match s {
                    // Parse the given value from str (by env vars or by calling set_from_str()) to the right type
                    $(stringify!($name) => if let Ok(ref val) = val.parse::<$type>() {
                        // Validate
                        let validate_fn = $validator;
                        let is_valid = validate_fn(val);
                        if is_valid {
                            // Only set value if valid.
                            self.$name = val.clone();
                        } else {
                            warn!("Unable to set {}={:?}. Invalid value. Default value will be used.", s, val);
                        }
                        is_valid
                    } else {
                        warn!("Unable to set {}={:?}. Cant parse value. Default value will be used.", s, val);
                        false
                    })*
                    _ => {
                        warn!("Unknown option {}", s);
                        false
                    }
                }
            }

            /// Options with the built-in default values only, ignoring environment variables.
            pub fn builtin_defaults() -> Self {
                Options {
                    $($name: $default),*
                }
            }
        }
        impl Default for Options {
            fn default() -> Self {
                let mut options = Self::builtin_defaults();

                // If we have env vars that start with BARRIER_ and match any option (such as BARRIER_SATB_POLICY),
                // we set the option to its value (if it is a valid value). Otherwise, use the default value.
                const PREFIX: &str = "BARRIER_";
                for (key, val) in std::env::vars() {
                    // strip the prefix, and get the lower case string
                    if let Some(rest_of_key) = key.strip_prefix(PREFIX) {
                        let lowercase: &str = &rest_of_key.to_lowercase();
                        match lowercase {
                            $(stringify!($name) => { options.set_from_str(lowercase, &val); },)*
                            _ => {}
                        }
                    }
                }
                options
            }
        }
    ]
}

options! {
    /// Which of the two SATB recording policies the write barriers follow.
    satb_policy:            SatbPolicy  [always_valid] = SatbPolicy::SnapshotAtBeginning,
    /// The number of entries a mutator's SATB buffer holds before it is published to the collector.
    satb_buffer_capacity:   usize       [|v: &usize| *v > 0] = DEFAULT_SATB_BUFFER_CAPACITY,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_util::{serial_test, with_cleanup};

    #[test]
    fn no_env_var() {
        serial_test(|| {
            let options = Options::default();
            assert_eq!(options.satb_policy, SatbPolicy::SnapshotAtBeginning);
            assert_eq!(options.satb_buffer_capacity, DEFAULT_SATB_BUFFER_CAPACITY);
        })
    }

    #[test]
    fn with_valid_env_var() {
        serial_test(|| {
            with_cleanup(
                || {
                    std::env::set_var("BARRIER_SATB_POLICY", "IncrementalUpdate");

                    let options = Options::default();
                    assert_eq!(options.satb_policy, SatbPolicy::IncrementalUpdate);
                },
                || {
                    std::env::remove_var("BARRIER_SATB_POLICY");
                },
            )
        })
    }

    #[test]
    fn with_multiple_valid_env_vars() {
        serial_test(|| {
            with_cleanup(
                || {
                    std::env::set_var("BARRIER_SATB_POLICY", "IncrementalUpdate");
                    std::env::set_var("BARRIER_SATB_BUFFER_CAPACITY", "16");

                    let options = Options::default();
                    assert_eq!(options.satb_policy, SatbPolicy::IncrementalUpdate);
                    assert_eq!(options.satb_buffer_capacity, 16);
                },
                || {
                    std::env::remove_var("BARRIER_SATB_POLICY");
                    std::env::remove_var("BARRIER_SATB_BUFFER_CAPACITY");
                },
            )
        })
    }

    #[test]
    fn with_invalid_env_var_value() {
        serial_test(|| {
            with_cleanup(
                || {
                    // zero is rejected by the validator, so use the default value
                    std::env::set_var("BARRIER_SATB_BUFFER_CAPACITY", "0");

                    let options = Options::default();
                    assert_eq!(options.satb_buffer_capacity, DEFAULT_SATB_BUFFER_CAPACITY);
                },
                || {
                    std::env::remove_var("BARRIER_SATB_BUFFER_CAPACITY");
                },
            )
        })
    }

    #[test]
    fn with_unparsable_env_var_value() {
        serial_test(|| {
            with_cleanup(
                || {
                    std::env::set_var("BARRIER_SATB_POLICY", "Snapshot");

                    let options = Options::default();
                    assert_eq!(options.satb_policy, SatbPolicy::SnapshotAtBeginning);
                },
                || {
                    std::env::remove_var("BARRIER_SATB_POLICY");
                },
            )
        })
    }

    #[test]
    fn set_from_str() {
        let mut options = Options::builtin_defaults();
        assert!(options.set_from_str("satb_buffer_capacity", "128"));
        assert_eq!(options.satb_buffer_capacity, 128);
        assert!(!options.set_from_str("satb_buffer_capacity", "-1"));
        assert_eq!(options.satb_buffer_capacity, 128);
        assert!(!options.set_from_str("no_such_option", "1"));
    }
}
