//! Deleter capabilities: how an owning handle gives its resource back.

use core::ptr::NonNull;

/// Releases a resource once its last owner lets go of it.
///
/// [`DefaultDelete`] reconstructs the `Box` the resource came from. Any
/// `FnMut(NonNull<T>)` closure is also a deleter, which covers custom pools,
/// foreign allocators and non-owning no-op release.
pub trait Deleter<T: ?Sized> {
    /// Releases the resource behind `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live resource that this deleter knows how to
    /// release, and the caller must never touch it again afterwards.
    unsafe fn delete(&mut self, ptr: NonNull<T>);
}

/// Releases a resource that was allocated as a `Box<T>`.
///
/// Works for unsized resources too: a `Box<[T]>` or `Box<dyn Trait>` turned
/// into a raw pointer keeps its metadata, so slices are released as arrays.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefaultDelete;

impl<T: ?Sized> Deleter<T> for DefaultDelete {
    #[inline]
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        // SAFETY: the caller guarantees `ptr` came from `Box::into_raw`.
        drop(unsafe { Box::from_raw(ptr.as_ptr()) });
    }
}

impl<T: ?Sized, F> Deleter<T> for F
where
    F: FnMut(NonNull<T>),
{
    #[inline]
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        (self)(ptr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_default_delete_runs_destructor() {
        let dropped = Rc::new(Cell::new(false));

        struct Flag(Rc<Cell<bool>>);
        impl Drop for Flag {
            fn drop(&mut self) {
                self.0.set(true);
            }
        }

        let raw = NonNull::from(Box::leak(Box::new(Flag(dropped.clone()))));
        unsafe { DefaultDelete.delete(raw) };
        assert!(dropped.get());
    }

    #[test]
    fn test_default_delete_slice() {
        let boxed: Box<[String]> = vec!["a".to_owned(), "b".to_owned()].into_boxed_slice();
        let raw = NonNull::from(Box::leak(boxed));
        unsafe { DefaultDelete.delete(raw) };
    }

    #[test]
    fn test_closure_deleter() {
        let mut seen = Vec::new();
        let mut value = 9_i32;
        {
            let mut deleter = |ptr: NonNull<i32>| seen.push(unsafe { *ptr.as_ptr() });
            unsafe { deleter.delete(NonNull::from(&mut value)) };
        }
        assert_eq!(seen, [9]);
    }
}
