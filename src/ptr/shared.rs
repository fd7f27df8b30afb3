//! `Shared` is the shared-ownership handle.
//!
//! A `Shared<T>` is a (resource pointer, control block) pair. Cloning bumps
//! the block's strong count, dropping lowers it, and the owner that takes it
//! from 1 to 0 runs the deleter. The deleter type is erased inside the block,
//! so every `Shared<T>` has the same type regardless of how it was built.
//!
//! The stored pointer may differ from the resource the block releases (see
//! [`Shared::project`] and [`Shared::alias`]); lifetime and owner identity
//! always follow the block.

use super::control::ControlRef;
use super::deleter::{DefaultDelete, Deleter};
use super::owner::{OwnerBased, OwnerId};
use super::unique::Unique;
use super::weak::Weak;
use super::Handle;
use crate::error::{AllocError, Expired, FromUniqueError};
use core::fmt;
use core::marker::PhantomData;
use core::ops::Deref;
use core::ptr::NonNull;
use std::alloc::handle_alloc_error;

/// A resource owned jointly by every clone of this handle.
///
/// Counter updates are atomic, so clones may be moved to and dropped on any
/// thread. The handle object itself is an ordinary value: mutating one
/// instance from two threads at once still requires external synchronisation.
pub struct Shared<T: ?Sized> {
    ptr: Option<NonNull<T>>,
    ctrl: Option<ControlRef>,
    _owns: PhantomData<T>,
}

impl<T> Shared<T> {
    /// Moves `value` into a freshly allocated control block.
    ///
    /// The value is embedded in the block, so this performs one allocation.
    pub fn new(value: T) -> Self {
        match Self::try_new(value) {
            Ok(shared) => shared,
            Err(err) => handle_alloc_error(err.layout()),
        }
    }

    /// Like [`Shared::new`], but reports allocation failure instead of aborting.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the control block cannot be allocated; `value`
    /// is dropped in that case.
    pub fn try_new(value: T) -> Result<Self, AllocError> {
        let (ctrl, ptr) = ControlRef::try_inline(value)?;
        Ok(Self::from_parts(Some(ptr), Some(ctrl)))
    }
}

impl<T: ?Sized> Shared<T> {
    /// An empty handle: no resource, no control block, `use_count() == 0`.
    pub const fn empty() -> Self {
        Self {
            ptr: None,
            ctrl: None,
            _owns: PhantomData,
        }
    }

    pub(super) const fn from_parts(ptr: Option<NonNull<T>>, ctrl: Option<ControlRef>) -> Self {
        Self {
            ptr,
            ctrl,
            _owns: PhantomData,
        }
    }

    pub(super) fn parts(&self) -> (Option<NonNull<T>>, Option<ControlRef>) {
        (self.ptr, self.ctrl)
    }

    /// Takes shared ownership of a pointer produced by `Box::into_raw`.
    ///
    /// # Safety
    ///
    /// See [`Shared::from_raw_with`]; the deleter is [`DefaultDelete`].
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        // SAFETY: forwarded to the caller.
        unsafe { Self::from_raw_with(ptr, DefaultDelete) }
    }

    /// Takes shared ownership of `ptr`, to be released by `deleter`.
    ///
    /// A control block is allocated even for a null `ptr`; the resulting
    /// handle is empty but counts as one owner of that block.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must be valid for shared reads until `deleter` runs,
    /// must not be owned by anything else, and must be releasable by `deleter`.
    pub unsafe fn from_raw_with<D>(ptr: *mut T, deleter: D) -> Self
    where
        D: Deleter<T> + Send + Sync + 'static,
    {
        // SAFETY: forwarded to the caller.
        match unsafe { Self::try_from_raw_with(ptr, deleter) } {
            Ok(shared) => shared,
            Err(err) => handle_alloc_error(err.layout()),
        }
    }

    /// Fallible form of [`Shared::from_raw_with`].
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the control block cannot be allocated. The
    /// resource is left untouched and still belongs to the caller.
    ///
    /// # Safety
    ///
    /// Same contract as [`Shared::from_raw_with`].
    pub unsafe fn try_from_raw_with<D>(ptr: *mut T, deleter: D) -> Result<Self, AllocError>
    where
        D: Deleter<T> + Send + Sync + 'static,
    {
        let ptr = NonNull::new(ptr);
        let ctrl = ControlRef::try_pointer(ptr, deleter).map_err(|(err, _)| err)?;
        Ok(Self::from_parts(ptr, Some(ctrl)))
    }

    /// Moves an exclusively owned resource into shared ownership.
    ///
    /// An empty `Unique` yields an empty `Shared` without allocating.
    pub fn from_unique<D>(unique: Unique<T, D>) -> Self
    where
        D: Deleter<T> + Send + Sync + 'static,
    {
        match Self::try_from_unique(unique) {
            Ok(shared) => shared,
            Err(err) => handle_alloc_error(err.alloc_error().layout()),
        }
    }

    /// Fallible form of [`Shared::from_unique`].
    ///
    /// # Errors
    ///
    /// Returns [`FromUniqueError`] if the control block cannot be allocated;
    /// the original `Unique` can be recovered from it unchanged.
    pub fn try_from_unique<D>(unique: Unique<T, D>) -> Result<Self, FromUniqueError<T, D>>
    where
        D: Deleter<T> + Send + Sync + 'static,
    {
        if unique.is_empty() {
            return Ok(Self::empty());
        }
        let (ptr, deleter) = unique.into_raw_parts();
        match ControlRef::try_pointer(ptr, deleter) {
            Ok(ctrl) => Ok(Self::from_parts(ptr, Some(ctrl))),
            Err((err, deleter)) => {
                // SAFETY: rebuilds the handle we just took apart.
                let unique = unsafe { Unique::from_raw_parts(ptr, deleter) };
                Err(FromUniqueError::new(err, unique))
            }
        }
    }

    /// Upgrades `weak`; returns an empty handle if the resource is gone.
    pub fn lock_from(weak: &Weak<T>) -> Self {
        weak.lock()
    }

    /// A handle that shares `owner`'s control block but points at `ptr`.
    ///
    /// The new handle keeps `owner`'s resource alive and compares equal to it
    /// under [`OwnerBased::owner_eq`]. If `owner` is empty the result is empty.
    ///
    /// # Safety
    ///
    /// `ptr` must stay valid for shared reads for as long as `owner`'s
    /// resource is alive, typically by pointing into it.
    pub unsafe fn alias<U: ?Sized>(owner: &Shared<U>, ptr: NonNull<T>) -> Self {
        match owner.ctrl {
            Some(ctrl) => {
                ctrl.inc_strong();
                Self::from_parts(Some(ptr), Some(ctrl))
            }
            None => Self::empty(),
        }
    }

    /// A handle to a part of this resource that shares its ownership.
    ///
    /// ```
    /// use custody::{OwnerBased, Shared};
    ///
    /// let pair = Shared::new((1_u8, String::from("two")));
    /// let second = pair.project(|(_, s)| s.as_str());
    /// assert_eq!(&*second, "two");
    /// assert!(second.owner_eq(&pair));
    /// assert_eq!(pair.use_count(), 2);
    /// ```
    pub fn project<U, F>(&self, f: F) -> Shared<U>
    where
        T: Send + Sync,
        U: ?Sized,
        F: FnOnce(&T) -> &U,
    {
        match self.get() {
            // SAFETY: `f` can only hand back data borrowed from the resource
            // (or `'static` data), which the new owner keeps alive.
            Some(value) => unsafe { Shared::alias(self, NonNull::from(f(value))) },
            None => Shared::empty(),
        }
    }

    /// Returns `true` if the stored pointer is null.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }

    /// Borrows the resource.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        // SAFETY: our strong count keeps the resource alive.
        self.ptr.map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    /// The stored pointer, without affecting ownership.
    #[inline]
    pub fn as_ptr(&self) -> Option<NonNull<T>> {
        self.ptr
    }

    /// Number of `Shared` handles owning this resource; 0 if empty.
    ///
    /// Advisory only: other threads may change it right after it is read.
    pub fn use_count(&self) -> usize {
        self.ctrl.map_or(0, ControlRef::strong_count)
    }

    /// Number of [`Weak`] handles observing this resource.
    pub fn weak_count(&self) -> usize {
        self.ctrl.map_or(0, ControlRef::weak_count)
    }

    /// Creates a non-owning observer of this resource.
    pub fn downgrade(&self) -> Weak<T> {
        Weak::from(self)
    }

    /// The deleter stored in the control block, if it is a `D`.
    ///
    /// Handles created by [`Shared::new`] have no deleter and always answer `None`.
    pub fn deleter<D: 'static>(&self) -> Option<&D> {
        let ctrl = self.ctrl?;
        // SAFETY: the block outlives `&self` because we hold a strong count.
        unsafe { ctrl.deleter::<D>().map(|ptr| &*ptr.as_ptr()) }
    }

    /// Gives up this handle's share of ownership, leaving it empty.
    pub fn reset(&mut self) {
        *self = Self::empty();
    }

    /// Returns `true` if both handles store the same pointer.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self.ptr, other.ptr) {
            (Some(a), Some(b)) => core::ptr::addr_eq(a.as_ptr(), b.as_ptr()),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: ?Sized> Clone for Shared<T> {
    fn clone(&self) -> Self {
        if let Some(ctrl) = self.ctrl {
            ctrl.inc_strong();
        }
        Self::from_parts(self.ptr, self.ctrl)
    }
}

impl<T: ?Sized> Drop for Shared<T> {
    fn drop(&mut self) {
        if let Some(ctrl) = self.ctrl.take() {
            // SAFETY: this handle owned one strong count.
            unsafe { ctrl.dec_strong() };
        }
    }
}

impl<T: ?Sized> Handle for Shared<T> {
    fn is_empty(&self) -> bool {
        Shared::is_empty(self)
    }

    fn reset(&mut self) {
        Shared::reset(self);
    }
}

impl<T: ?Sized> OwnerBased for Shared<T> {
    fn owner_id(&self) -> OwnerId {
        OwnerId::of(self.ctrl)
    }
}

impl<T: ?Sized> Deref for Shared<T> {
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => super::empty_deref("Shared"),
        }
    }
}

impl<T: ?Sized> Default for Shared<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized, D> From<Unique<T, D>> for Shared<T>
where
    D: Deleter<T> + Send + Sync + 'static,
{
    fn from(unique: Unique<T, D>) -> Self {
        Self::from_unique(unique)
    }
}

impl<T: ?Sized> From<Box<T>> for Shared<T> {
    fn from(boxed: Box<T>) -> Self {
        Self::from_unique(Unique::from(boxed))
    }
}

impl<T: ?Sized> TryFrom<&Weak<T>> for Shared<T> {
    type Error = Expired;

    fn try_from(weak: &Weak<T>) -> Result<Self, Expired> {
        let shared = weak.lock();
        if shared.ctrl.is_some() {
            Ok(shared)
        } else {
            Err(Expired)
        }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("value", &self.get())
            .field("use_count", &self.use_count())
            .finish()
    }
}

// SAFETY: same rules as `Arc<T>`: the resource is reachable from several
// threads and may be released on any of them.
unsafe impl<T: ?Sized + Send + Sync> Send for Shared<T> {}
unsafe impl<T: ?Sized + Send + Sync> Sync for Shared<T> {}
