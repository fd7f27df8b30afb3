//! `Unique` is the exclusive-ownership handle.
//!
//! A `Unique` owns at most one resource and the deleter that releases it,
//! with no control block and no counters. It is move-only: there is no
//! `Clone` impl, so a second owner cannot be created.
//!
//! ```compile_fail
//! use custody::Unique;
//!
//! let a = Unique::new(1);
//! let b: Unique<i32> = a.clone();
//! ```

use super::deleter::{DefaultDelete, Deleter};
use super::Handle;
use core::fmt;
use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};

/// An exclusively owned resource released by `D` when the handle goes away.
pub struct Unique<T: ?Sized, D: Deleter<T> = DefaultDelete> {
    ptr: Option<NonNull<T>>,
    deleter: D,
    _owns: PhantomData<T>,
}

impl<T> Unique<T> {
    /// Moves `value` to the heap and takes ownership of it.
    pub fn new(value: T) -> Self {
        Self::from(Box::new(value))
    }
}

impl<T: ?Sized> Unique<T> {
    /// Takes ownership of a pointer produced by `Box::into_raw`.
    ///
    /// A null `ptr` yields an empty handle.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must come from `Box::into_raw` and must not be owned
    /// by anything else.
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        // SAFETY: forwarded to the caller.
        unsafe { Self::from_raw_with(ptr, DefaultDelete) }
    }

    /// Gives the resource back as a `Box`, or `None` if the handle is empty.
    pub fn into_box(self) -> Option<Box<T>> {
        let (ptr, _) = self.into_raw_parts();
        // SAFETY: resources released by `DefaultDelete` are boxed.
        ptr.map(|ptr| unsafe { Box::from_raw(ptr.as_ptr()) })
    }
}

impl<T: ?Sized, D: Deleter<T>> Unique<T, D> {
    /// Takes ownership of `ptr`, to be released later by `deleter`.
    ///
    /// A null `ptr` yields an empty handle that still carries the deleter.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must be valid for reads and writes, must not be owned
    /// by anything else, and must be releasable by `deleter`.
    pub unsafe fn from_raw_with(ptr: *mut T, deleter: D) -> Self {
        Self {
            ptr: NonNull::new(ptr),
            deleter,
            _owns: PhantomData,
        }
    }

    /// Reassembles a handle split by [`Unique::into_raw_parts`].
    ///
    /// # Safety
    ///
    /// Same contract as [`Unique::from_raw_with`].
    pub unsafe fn from_raw_parts(ptr: Option<NonNull<T>>, deleter: D) -> Self {
        Self {
            ptr,
            deleter,
            _owns: PhantomData,
        }
    }

    /// An empty handle carrying `deleter` for a resource installed later.
    pub fn empty_with(deleter: D) -> Self {
        Self {
            ptr: None,
            deleter,
            _owns: PhantomData,
        }
    }

    /// Returns `true` if no resource is owned.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }

    /// Borrows the resource without affecting ownership.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        // SAFETY: the handle owns the resource exclusively while it holds it.
        self.ptr.map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    /// Mutably borrows the resource.
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        // SAFETY: `&mut self` makes this the only access path.
        self.ptr.map(|ptr| unsafe { &mut *ptr.as_ptr() })
    }

    /// The raw resource pointer, without giving up ownership.
    #[inline]
    pub fn as_ptr(&self) -> Option<NonNull<T>> {
        self.ptr
    }

    /// The deleter that will release the resource.
    #[inline]
    pub fn deleter(&self) -> &D {
        &self.deleter
    }

    /// Mutable access to the deleter.
    #[inline]
    pub fn deleter_mut(&mut self) -> &mut D {
        &mut self.deleter
    }

    /// Gives up ownership without running the deleter.
    ///
    /// The handle is empty afterwards and the caller is responsible for the
    /// returned resource.
    #[must_use = "the released resource leaks unless the caller frees it"]
    pub fn release(&mut self) -> Option<NonNull<T>> {
        self.ptr.take()
    }

    /// Releases the current resource, leaving the handle empty.
    pub fn reset(&mut self) {
        if let Some(old) = self.ptr.take() {
            // SAFETY: we owned `old` and have just forgotten it.
            unsafe { self.deleter.delete(old) };
        }
    }

    /// Releases the current resource and takes ownership of `ptr` instead.
    ///
    /// The new pointer is installed before the old resource is released, so a
    /// deleter that inspects this handle sees the new state. Passing the
    /// pointer this handle already owns is a no-op.
    ///
    /// # Safety
    ///
    /// Same contract as [`Unique::from_raw_with`] for `ptr`.
    pub unsafe fn reset_to(&mut self, ptr: *mut T) {
        let new = NonNull::new(ptr);
        if new.is_some() && new == self.ptr {
            return;
        }
        let old = core::mem::replace(&mut self.ptr, new);
        if let Some(old) = old {
            // SAFETY: `old` is no longer reachable through this handle.
            unsafe { self.deleter.delete(old) };
        }
    }

    /// Splits the handle into its resource and deleter without releasing.
    pub fn into_raw_parts(self) -> (Option<NonNull<T>>, D) {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the deleter is moved out once.
        let deleter = unsafe { ptr::read(&this.deleter) };
        (this.ptr, deleter)
    }
}

impl<T: ?Sized, D: Deleter<T>> Drop for Unique<T, D> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: ?Sized, D: Deleter<T>> Handle for Unique<T, D> {
    fn is_empty(&self) -> bool {
        Unique::is_empty(self)
    }

    fn reset(&mut self) {
        Unique::reset(self);
    }
}

impl<T: ?Sized, D: Deleter<T>> Deref for Unique<T, D> {
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => super::empty_deref("Unique"),
        }
    }
}

impl<T: ?Sized, D: Deleter<T>> DerefMut for Unique<T, D> {
    #[track_caller]
    fn deref_mut(&mut self) -> &mut T {
        match self.get_mut() {
            Some(value) => value,
            None => super::empty_deref("Unique"),
        }
    }
}

impl<T: ?Sized> From<Box<T>> for Unique<T> {
    fn from(boxed: Box<T>) -> Self {
        // SAFETY: the pointer comes straight from `Box::into_raw`.
        unsafe { Self::from_raw(Box::into_raw(boxed)) }
    }
}

impl<T: ?Sized, D: Deleter<T> + Default> Default for Unique<T, D> {
    fn default() -> Self {
        Self::empty_with(D::default())
    }
}

impl<T: ?Sized + fmt::Debug, D: Deleter<T>> fmt::Debug for Unique<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Unique").field(&self.get()).finish()
    }
}

// SAFETY: `Unique` owns its resource exactly like `Box<T>` does.
unsafe impl<T: ?Sized + Send, D: Deleter<T> + Send> Send for Unique<T, D> {}
unsafe impl<T: ?Sized + Sync, D: Deleter<T> + Sync> Sync for Unique<T, D> {}
