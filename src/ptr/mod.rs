//! Ownership handles.
//!
//! - [`Unique`]: exclusive owner, move-only, no control block.
//! - [`Shared`]: joint owner, atomically counted through a control block.
//! - [`Weak`]: observer of a `Shared` resource that can try to become an owner.
//!
//! A `Unique` converts one way into a `Shared`; a `Shared` hands out `Weak`s;
//! a `Weak` locks back into a `Shared` while the resource is still alive.
//!
//! Shared ownership graphs can form cycles that never release. Breaking a
//! cycle is up to the caller, usually by making one edge a [`Weak`].

mod control;
pub mod deleter;
pub mod owner;
pub mod shared;
pub mod unique;
pub mod weak;

pub use deleter::{DefaultDelete, Deleter};
pub use owner::{ByOwner, OwnerBased, OwnerId};
pub use shared::Shared;
pub use unique::Unique;
pub use weak::Weak;

/// Operations common to every handle type.
pub trait Handle {
    /// Returns `true` if the handle gives access to no resource.
    fn is_empty(&self) -> bool;

    /// Gives up whatever the handle holds and leaves it empty.
    fn reset(&mut self);

    /// Exchanges the contents of two handles without touching any counts.
    fn swap(&mut self, other: &mut Self)
    where
        Self: Sized,
    {
        core::mem::swap(self, other);
    }
}

#[cold]
#[track_caller]
fn empty_deref(kind: &str) -> ! {
    panic!("dereferenced an empty {kind}");
}
