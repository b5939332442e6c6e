//! Synchronization primitives, switchable to loom for model checking.
//!
//! Everything in the crate that locks, waits or spawns goes through these
//! re-exports so that `--features check-loom` swaps the whole core onto
//! loom's permutation-exploring replacements.

cfg_if::cfg_if! {
    if #[cfg(feature = "check-loom")] {
        pub(crate) use loom::sync::{Arc, Condvar, Mutex};
        pub(crate) use loom::thread;
    } else {
        pub(crate) use std::sync::{Arc, Condvar, Mutex};
        pub(crate) use std::thread;
    }
}
