//! Owner-based comparison and hashing.
//!
//! Two handles are the same owner when they share a control block, whatever
//! pointer each one stores. This is the identity that matters for aliasing
//! handles and for keying maps by weak references.

use super::control::ControlRef;
use core::cmp::Ordering;
use core::hash::{Hash, Hasher};
use std::collections::hash_map::DefaultHasher;

/// Identity of a control block. Empty handles share `OwnerId::NONE`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OwnerId(usize);

impl OwnerId {
    /// The owner of every handle without a control block.
    pub const NONE: Self = Self(0);

    pub(crate) fn of(ctrl: Option<ControlRef>) -> Self {
        ctrl.map_or(Self::NONE, |ctrl| Self(ctrl.addr()))
    }

    /// Returns `true` for handles without a control block.
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

/// Handles that participate in a shared ownership group.
pub trait OwnerBased {
    /// The control block this handle refers to.
    fn owner_id(&self) -> OwnerId;

    /// Strict weak ordering by owner, consistent with [`OwnerBased::owner_eq`].
    fn owner_before<O: OwnerBased + ?Sized>(&self, other: &O) -> bool {
        self.owner_id() < other.owner_id()
    }

    /// Returns `true` if both handles share a control block (or both have none).
    fn owner_eq<O: OwnerBased + ?Sized>(&self, other: &O) -> bool {
        self.owner_id() == other.owner_id()
    }

    /// A hash of the owner, equal for all handles that are `owner_eq`.
    fn owner_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.owner_id().hash(&mut hasher);
        hasher.finish()
    }
}

/// Wraps a handle so that `Eq`, `Ord` and `Hash` go by owner.
///
/// Lets `Shared` or `Weak` handles key a `HashMap`/`BTreeMap`; a `Weak` key
/// stays usable after its resource has been released.
#[derive(Debug, Clone, Default)]
pub struct ByOwner<P>(pub P);

impl<P: OwnerBased> PartialEq for ByOwner<P> {
    fn eq(&self, other: &Self) -> bool {
        self.0.owner_eq(&other.0)
    }
}

impl<P: OwnerBased> Eq for ByOwner<P> {}

impl<P: OwnerBased> PartialOrd for ByOwner<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P: OwnerBased> Ord for ByOwner<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.owner_id().cmp(&other.0.owner_id())
    }
}

impl<P: OwnerBased> Hash for ByOwner<P> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.owner_id().hash(state);
    }
}
