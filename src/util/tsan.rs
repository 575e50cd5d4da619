//! Annotations for ThreadSanitizer.
//!
//! Struct copies move bytes with a raw `memcpy`, which ThreadSanitizer cannot attribute to the
//! reference fields it overwrites. With the `tsan` feature the copied ranges are reported to the
//! sanitizer runtime as reads (source) and writes (destination). Without the feature the hooks
//! compile to nothing.

use crate::util::Address;

cfg_if::cfg_if! {
    if #[cfg(feature = "tsan")] {
        use std::ffi::c_void;

        extern "C" {
            fn __tsan_read_range(addr: *const c_void, size: usize);
            fn __tsan_write_range(addr: *const c_void, size: usize);
        }

        /// Report `[start, start + len)` as read by the current thread.
        pub fn tsan_read_memory_range(start: Address, len: usize) {
            unsafe { __tsan_read_range(start.to_ptr::<c_void>(), len) }
        }

        /// Report `[start, start + len)` as written by the current thread.
        pub fn tsan_write_memory_range(start: Address, len: usize) {
            unsafe { __tsan_write_range(start.to_ptr::<c_void>(), len) }
        }
    } else {
        /// Report `[start, start + len)` as read by the current thread. No-op without the `tsan` feature.
        #[inline(always)]
        pub fn tsan_read_memory_range(_start: Address, _len: usize) {}

        /// Report `[start, start + len)` as written by the current thread. No-op without the `tsan` feature.
        #[inline(always)]
        pub fn tsan_write_memory_range(_start: Address, _len: usize) {}
    }
}
