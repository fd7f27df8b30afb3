//! Error types returned by the fallible constructors.

use crate::ptr::{Deleter, Unique};
use core::alloc::Layout;
use core::fmt;

/// The control block for a shared ownership group could not be allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocError {
    layout: Layout,
}

impl AllocError {
    pub(crate) const fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// The layout of the allocation that failed.
    pub const fn layout(&self) -> Layout {
        self.layout
    }
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "memory allocation of {} bytes failed",
            self.layout.size()
        )
    }
}

impl std::error::Error for AllocError {}

/// Converting a [`Unique`] into a [`Shared`](crate::Shared) failed.
///
/// The exclusive handle is handed back untouched, still owning its resource.
pub struct FromUniqueError<T: ?Sized, D: Deleter<T>> {
    error: AllocError,
    unique: Unique<T, D>,
}

impl<T: ?Sized, D: Deleter<T>> FromUniqueError<T, D> {
    pub(crate) fn new(error: AllocError, unique: Unique<T, D>) -> Self {
        Self { error, unique }
    }

    /// The underlying allocation failure.
    pub fn alloc_error(&self) -> AllocError {
        self.error
    }

    /// Recovers the exclusive handle that could not be converted.
    pub fn into_unique(self) -> Unique<T, D> {
        self.unique
    }
}

impl<T: ?Sized, D: Deleter<T>> fmt::Debug for FromUniqueError<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FromUniqueError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<T: ?Sized, D: Deleter<T>> fmt::Display for FromUniqueError<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot move exclusive handle into shared ownership: {}", self.error)
    }
}

impl<T: ?Sized, D: Deleter<T>> std::error::Error for FromUniqueError<T, D> {}

/// A weak handle was upgraded after its resource had already been released.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Expired;

impl fmt::Display for Expired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("weak handle expired: the resource has already been released")
    }
}

impl std::error::Error for Expired {}
