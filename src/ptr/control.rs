//! The heap-resident control block behind every `Shared`/`Weak` group.
//!
//! A block is a `#[repr(C)]` struct whose first field is a [`Header`]. The
//! header carries both counters and a static vtable, so handles only ever see
//! a `NonNull<Header>` and never the concrete resource or deleter type.
//!
//! Counting follows the split-count scheme: the weak counter holds one extra
//! reference on behalf of all strong owners together. The thread that moves the
//! strong count from 1 to 0 runs the deleter and then drops that implicit weak
//! reference; whoever moves the weak counter to 0 frees the block. Exactly one
//! thread observes each transition, so release and deallocation each happen
//! once.

use super::deleter::Deleter;
use crate::error::AllocError;
use crate::sync::{fence, AtomicUsize, Ordering};
use core::alloc::Layout;
use core::any::TypeId;
use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::ptr::{self, NonNull};
use crossbeam_utils::Backoff;
use std::alloc::{alloc, dealloc};

/// Counts above this abort the process instead of wrapping.
const MAX_REFCOUNT: usize = isize::MAX as usize;

/// Type-specific operations of a block, reachable through its header.
pub(crate) struct BlockVTable {
    /// Releases the resource. Runs once, on the strong 1 -> 0 transition.
    release: unsafe fn(NonNull<Header>),
    /// Drops the block's remaining fields and frees its memory.
    destroy: unsafe fn(NonNull<Header>),
    /// Returns the stored deleter if its type matches.
    deleter: unsafe fn(NonNull<Header>, TypeId) -> Option<NonNull<()>>,
}

#[repr(C)]
pub(crate) struct Header {
    strong: AtomicUsize,
    weak: AtomicUsize,
    vtable: &'static BlockVTable,
}

impl Header {
    fn new(vtable: &'static BlockVTable) -> Self {
        Self {
            strong: AtomicUsize::new(1),
            weak: AtomicUsize::new(1),
            vtable,
        }
    }
}

/// Block for a resource that lives elsewhere and is released by a deleter.
#[repr(C)]
struct PointerBlock<T: ?Sized, D> {
    header: Header,
    resource: UnsafeCell<Option<NonNull<T>>>,
    deleter: UnsafeCell<D>,
}

impl<T: ?Sized, D: Deleter<T> + 'static> PointerBlock<T, D> {
    const VTABLE: &'static BlockVTable = &BlockVTable {
        release: Self::release,
        destroy: Self::destroy,
        deleter: Self::deleter,
    };

    unsafe fn release(header: NonNull<Header>) {
        let block = header.cast::<Self>().as_ptr();
        // SAFETY: only the thread that observed strong 1 -> 0 gets here, so
        // nothing else reads or writes the resource slot or the deleter.
        unsafe {
            if let Some(resource) = (*(*block).resource.get()).take() {
                (*(*block).deleter.get()).delete(resource);
            }
        }
    }

    unsafe fn destroy(header: NonNull<Header>) {
        let block = header.cast::<Self>().as_ptr();
        // SAFETY: the weak counter reached zero; this is the last reference.
        unsafe {
            ptr::drop_in_place(block);
            dealloc(block.cast(), Layout::new::<Self>());
        }
    }

    unsafe fn deleter(header: NonNull<Header>, id: TypeId) -> Option<NonNull<()>> {
        if id != TypeId::of::<D>() {
            return None;
        }
        let block = header.cast::<Self>().as_ptr();
        // SAFETY: the block is alive for as long as the caller holds a handle.
        NonNull::new(unsafe { (*block).deleter.get() }.cast())
    }
}

/// Block with the resource embedded right after the counters.
#[repr(C)]
struct InlineBlock<T> {
    header: Header,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> InlineBlock<T> {
    const VTABLE: &'static BlockVTable = &BlockVTable {
        release: Self::release,
        destroy: Self::destroy,
        deleter: Self::deleter,
    };

    unsafe fn release(header: NonNull<Header>) {
        let block = header.cast::<Self>().as_ptr();
        // SAFETY: the value was initialised at construction and is dropped
        // exactly once, by the thread that observed strong 1 -> 0.
        unsafe { ptr::drop_in_place((*block).value.get().cast::<T>()) };
    }

    unsafe fn destroy(header: NonNull<Header>) {
        let block = header.cast::<Self>().as_ptr();
        // SAFETY: `MaybeUninit` keeps the already released value from being
        // dropped a second time.
        unsafe {
            ptr::drop_in_place(block);
            dealloc(block.cast(), Layout::new::<Self>());
        }
    }

    unsafe fn deleter(_: NonNull<Header>, _: TypeId) -> Option<NonNull<()>> {
        None
    }
}

fn allocate<B>() -> Result<NonNull<B>, AllocError> {
    let layout = Layout::new::<B>();
    // SAFETY: every block starts with a `Header`, so the layout is never zero-sized.
    let raw = unsafe { alloc(layout) }.cast::<B>();
    NonNull::new(raw).ok_or(AllocError::new(layout))
}

/// A counted reference to a control block.
///
/// Copying a `ControlRef` does not touch the counters; the owning handle is
/// responsible for pairing every `inc_*` with the matching `dec_*`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct ControlRef(NonNull<Header>);

impl ControlRef {
    /// Allocates a block for an externally allocated resource.
    ///
    /// On failure the deleter is handed back and the resource is untouched.
    pub(crate) fn try_pointer<T, D>(
        resource: Option<NonNull<T>>,
        deleter: D,
    ) -> Result<Self, (AllocError, D)>
    where
        T: ?Sized,
        D: Deleter<T> + 'static,
    {
        let block = match allocate::<PointerBlock<T, D>>() {
            Ok(block) => block,
            Err(err) => return Err((err, deleter)),
        };
        // SAFETY: freshly allocated with the layout of `PointerBlock<T, D>`.
        unsafe {
            block.as_ptr().write(PointerBlock {
                header: Header::new(PointerBlock::<T, D>::VTABLE),
                resource: UnsafeCell::new(resource),
                deleter: UnsafeCell::new(deleter),
            });
        }
        let this = Self(block.cast());
        trace_event!(block = this.addr(), "control block created");
        Ok(this)
    }

    /// Allocates a block with `value` stored inline.
    ///
    /// Returns the block together with a pointer to the embedded value.
    pub(crate) fn try_inline<T>(value: T) -> Result<(Self, NonNull<T>), AllocError> {
        let block = allocate::<InlineBlock<T>>()?;
        // SAFETY: freshly allocated with the layout of `InlineBlock<T>`.
        let resource = unsafe {
            block.as_ptr().write(InlineBlock {
                header: Header::new(InlineBlock::<T>::VTABLE),
                value: UnsafeCell::new(MaybeUninit::new(value)),
            });
            NonNull::new_unchecked((*block.as_ptr()).value.get().cast::<T>())
        };
        let this = Self(block.cast());
        trace_event!(block = this.addr(), "control block created with inline resource");
        Ok((this, resource))
    }

    #[inline]
    fn header(&self) -> &Header {
        // SAFETY: a `ControlRef` is only held by a handle that owns a count.
        unsafe { self.0.as_ref() }
    }

    /// Address of the block; the identity used for owner comparisons.
    #[inline]
    pub(crate) fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }

    /// Current number of strong owners. Advisory under concurrency.
    #[inline]
    pub(crate) fn strong_count(self) -> usize {
        self.header().strong.load(Ordering::Acquire)
    }

    /// Current number of weak observers, excluding the implicit reference.
    pub(crate) fn weak_count(self) -> usize {
        let header = self.header();
        let weak = header.weak.load(Ordering::Acquire);
        let strong = header.strong.load(Ordering::Acquire);
        if strong == 0 {
            weak
        } else {
            weak.saturating_sub(1)
        }
    }

    #[inline]
    pub(crate) fn inc_strong(self) {
        let old = self.header().strong.fetch_add(1, Ordering::Relaxed);
        if old > MAX_REFCOUNT {
            std::process::abort();
        }
    }

    #[inline]
    pub(crate) fn inc_weak(self) {
        let old = self.header().weak.fetch_add(1, Ordering::Relaxed);
        if old > MAX_REFCOUNT {
            std::process::abort();
        }
    }

    /// Increments the strong count unless it is already zero.
    ///
    /// A single compare-and-swap decides the outcome, so a released resource
    /// can never be brought back by a racing upgrade.
    pub(crate) fn try_inc_strong(self) -> bool {
        let strong = &self.header().strong;
        let backoff = Backoff::new();
        let mut current = strong.load(Ordering::Relaxed);
        loop {
            if current == 0 {
                return false;
            }
            if current > MAX_REFCOUNT {
                std::process::abort();
            }
            match strong.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => {
                    current = actual;
                    backoff.spin();
                }
            }
        }
    }

    /// Drops one strong reference, releasing the resource on the last one.
    ///
    /// # Safety
    ///
    /// The caller must own one strong count and give it up with this call.
    pub(crate) unsafe fn dec_strong(self) {
        if self.header().strong.fetch_sub(1, Ordering::Release) != 1 {
            return;
        }
        fence(Ordering::Acquire);

        let release = self.header().vtable.release;
        // SAFETY: we observed the 1 -> 0 transition; nobody else will.
        unsafe { release(self.0) };
        trace_event!(block = self.addr(), "resource released");

        // SAFETY: the implicit weak reference belonged to the strong owners.
        unsafe { self.dec_weak() };
    }

    /// Drops one weak reference, freeing the block on the last one.
    ///
    /// # Safety
    ///
    /// The caller must own one weak count and give it up with this call.
    pub(crate) unsafe fn dec_weak(self) {
        if self.header().weak.fetch_sub(1, Ordering::Release) != 1 {
            return;
        }
        fence(Ordering::Acquire);

        trace_event!(block = self.addr(), "control block freed");
        let destroy = self.header().vtable.destroy;
        // SAFETY: both counters are zero; no handle refers to the block anymore.
        unsafe { destroy(self.0) };
    }

    /// Returns the deleter stored in the block if it is a `D`.
    ///
    /// # Safety
    ///
    /// The returned pointer is valid only while the caller holds a strong count.
    pub(crate) unsafe fn deleter<D: 'static>(self) -> Option<NonNull<D>> {
        let lookup = self.header().vtable.deleter;
        // SAFETY: the block is alive for the duration of the call.
        unsafe { lookup(self.0, TypeId::of::<D>()) }.map(|ptr| ptr.cast::<D>())
    }
}

// SAFETY: all shared state in the header is atomic; the block's other fields
// are only touched by the single thread that wins a zero transition.
unsafe impl Send for ControlRef {}
unsafe impl Sync for ControlRef {}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::ptr::DefaultDelete;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_pointer_block_counts() {
        let raw = NonNull::from(Box::leak(Box::new(3_u8)));
        let ctrl = ControlRef::try_pointer(Some(raw), DefaultDelete)
            .map_err(|(err, _)| err)
            .unwrap();
        assert_eq!(ctrl.strong_count(), 1);
        assert_eq!(ctrl.weak_count(), 0);

        ctrl.inc_weak();
        assert_eq!(ctrl.weak_count(), 1);

        unsafe { ctrl.dec_strong() };
        assert_eq!(ctrl.strong_count(), 0);
        assert_eq!(ctrl.weak_count(), 1);
        assert!(!ctrl.try_inc_strong());

        unsafe { ctrl.dec_weak() };
    }

    #[test]
    fn test_release_runs_once() {
        let calls = Arc::new(StdAtomicUsize::new(0));
        let counter = calls.clone();
        let mut value = 11_u32;
        let ctrl = ControlRef::try_pointer(Some(NonNull::from(&mut value)), move |_: NonNull<u32>| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        })
        .map_err(|(err, _)| err)
        .unwrap();

        ctrl.inc_strong();
        unsafe { ctrl.dec_strong() };
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        unsafe { ctrl.dec_strong() };
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_deleter_lookup_by_type() {
        let ctrl = ControlRef::try_pointer::<u8, _>(None, DefaultDelete)
            .map_err(|(err, _)| err)
            .unwrap();
        unsafe {
            assert!(ctrl.deleter::<DefaultDelete>().is_some());
            assert!(ctrl.deleter::<fn(NonNull<u8>)>().is_none());
            ctrl.dec_strong();
        }
    }

    #[test]
    fn test_inline_block_value() {
        let (ctrl, value) = ControlRef::try_inline(String::from("inline")).unwrap();
        assert_eq!(unsafe { value.as_ref() }, "inline");
        unsafe {
            assert!(ctrl.deleter::<DefaultDelete>().is_none());
            ctrl.dec_strong();
        }
    }
}
