//! Atomic primitives used by the control block.
//!
//! Built with `RUSTFLAGS="--cfg loom"` these resolve to `loom`'s model-checked
//! atomics so the counting protocol can be explored exhaustively.

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{fence, AtomicUsize, Ordering};

#[cfg(not(loom))]
pub(crate) use core::sync::atomic::{fence, AtomicUsize, Ordering};
