//! # `custody` - Ownership Handles
//!
//! Exclusive, shared and weak handles around a raw resource pointer, each
//! released through a pluggable deleter.
//!
//! ## Handles
//!
//! 1. **`Unique<T, D>`**:
//!    - Single owner, move-only (no `Clone`)
//!    - Stores the resource pointer and the deleter directly, no control block
//!    - `release` hands the resource back without running the deleter
//!
//! 2. **`Shared<T>`**:
//!    - Joint ownership through a heap control block with atomic counts
//!    - Deleter type erased inside the block, so one `Shared<T>` type fits all
//!    - Aliasing: a handle may point into a sub-object of the owned resource
//!
//! 3. **`Weak<T>`**:
//!    - Keeps the control block alive but not the resource
//!    - `lock` upgrades atomically, or yields an empty `Shared` once expired
//!
//! ## Counting Invariants
//!
//! - The deleter runs exactly once, on the strong count's 1 -> 0 transition.
//! - The control block is freed exactly once, when no `Shared` and no `Weak`
//!   refers to it anymore.
//! - An upgrade from `Weak` never succeeds after the strong count hit zero.
//!
//! ## Example
//!
//! ```rust
//! use custody::{Shared, Unique};
//!
//! let unique = Unique::new(String::from("resource"));
//! let shared = Shared::from(unique);
//! let copy = shared.clone();
//! assert_eq!(shared.use_count(), 2);
//!
//! let weak = copy.downgrade();
//! drop(shared);
//! drop(copy);
//! assert!(weak.expired());
//! assert!(weak.lock().is_empty());
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

macro_rules! trace_event {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::trace!($($arg)*);
    };
}

pub mod error;
pub mod ptr;
mod sync;

pub use error::{AllocError, Expired, FromUniqueError};
pub use ptr::{ByOwner, DefaultDelete, Deleter, Handle, OwnerBased, OwnerId, Shared, Unique, Weak};

// Compile-time layout checks.
const _: () = {
    use core::mem;

    // Empty is the null niche and the default deleter is a ZST.
    assert!(mem::size_of::<Unique<u64>>() == mem::size_of::<*const u64>());
    assert!(mem::size_of::<Unique<[u64]>>() == mem::size_of::<*const [u64]>());

    // Resource pointer plus control block pointer.
    assert!(mem::size_of::<Shared<u64>>() == 2 * mem::size_of::<usize>());
    assert!(mem::size_of::<Weak<u64>>() == mem::size_of::<Shared<u64>>());
};
