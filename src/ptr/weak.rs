//! `Weak` is the non-owning observer of a shared resource.

use super::control::ControlRef;
use super::owner::{OwnerBased, OwnerId};
use super::shared::Shared;
use super::Handle;
use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

/// Observes a resource owned by [`Shared`] handles without keeping it alive.
///
/// A `Weak` keeps only the control block alive, so it can safely outlive the
/// resource. The stored pointer is never dereferenced directly: access goes
/// through [`Weak::lock`], which succeeds only while some `Shared` still owns
/// the resource.
pub struct Weak<T: ?Sized> {
    ptr: Option<NonNull<T>>,
    ctrl: Option<ControlRef>,
    _marker: PhantomData<T>,
}

impl<T: ?Sized> Weak<T> {
    /// A weak handle that observes nothing and is always expired.
    pub const fn new() -> Self {
        Self {
            ptr: None,
            ctrl: None,
            _marker: PhantomData,
        }
    }

    /// Returns `true` if the resource has been released or never existed.
    pub fn expired(&self) -> bool {
        self.ctrl.map_or(true, |ctrl| ctrl.strong_count() == 0)
    }

    /// Tries to become an owner of the resource.
    ///
    /// Returns an empty `Shared` if the resource is already gone. The check
    /// and the increment are one atomic step, so a resource whose last owner
    /// is concurrently dropping is never revived.
    pub fn lock(&self) -> Shared<T> {
        match self.ctrl {
            Some(ctrl) if ctrl.try_inc_strong() => Shared::from_parts(self.ptr, Some(ctrl)),
            _ => Shared::empty(),
        }
    }

    /// Number of `Shared` handles currently owning the resource.
    pub fn use_count(&self) -> usize {
        self.ctrl.map_or(0, ControlRef::strong_count)
    }

    /// Number of `Weak` handles observing the resource, this one included.
    pub fn weak_count(&self) -> usize {
        self.ctrl.map_or(0, ControlRef::weak_count)
    }

    /// Stops observing, leaving this handle empty.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl<T: ?Sized> From<&Shared<T>> for Weak<T> {
    fn from(shared: &Shared<T>) -> Self {
        let (ptr, ctrl) = shared.parts();
        if let Some(ctrl) = ctrl {
            ctrl.inc_weak();
        }
        Self {
            ptr,
            ctrl,
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> Clone for Weak<T> {
    fn clone(&self) -> Self {
        if let Some(ctrl) = self.ctrl {
            ctrl.inc_weak();
        }
        Self {
            ptr: self.ptr,
            ctrl: self.ctrl,
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> Drop for Weak<T> {
    fn drop(&mut self) {
        if let Some(ctrl) = self.ctrl.take() {
            // SAFETY: this handle owned one weak count.
            unsafe { ctrl.dec_weak() };
        }
    }
}

impl<T: ?Sized> Handle for Weak<T> {
    fn is_empty(&self) -> bool {
        self.ctrl.is_none()
    }

    fn reset(&mut self) {
        Weak::reset(self);
    }
}

impl<T: ?Sized> OwnerBased for Weak<T> {
    fn owner_id(&self) -> OwnerId {
        OwnerId::of(self.ctrl)
    }
}

impl<T: ?Sized> Default for Weak<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Weak<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(Weak)")
    }
}

// SAFETY: a `Weak` can turn into a `Shared`, so it needs the same bounds.
unsafe impl<T: ?Sized + Send + Sync> Send for Weak<T> {}
unsafe impl<T: ?Sized + Send + Sync> Sync for Weak<T> {}
