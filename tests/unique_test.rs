use custody::{Handle, Shared, Unique};
use std::cell::RefCell;
use std::ptr::NonNull;
use std::rc::Rc;

fn logging_deleter(log: &Rc<RefCell<Vec<i32>>>) -> impl FnMut(NonNull<i32>) {
    let log = log.clone();
    move |ptr: NonNull<i32>| {
        let value = unsafe { Box::from_raw(ptr.as_ptr()) };
        log.borrow_mut().push(*value);
    }
}

#[test]
fn test_release_returns_resource_without_deleting() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut e = unsafe { Unique::from_raw_with(Box::into_raw(Box::new(7)), logging_deleter(&log)) };

    let raw = e.release().expect("resource");
    assert_eq!(unsafe { *raw.as_ptr() }, 7);
    assert!(e.get().is_none());
    assert!(e.as_ptr().is_none());
    drop(e);
    assert!(log.borrow().is_empty());

    // The caller owns it now.
    drop(unsafe { Box::from_raw(raw.as_ptr()) });
}

#[test]
fn test_drop_runs_deleter_once() {
    let log = Rc::new(RefCell::new(Vec::new()));
    {
        let _e = unsafe { Unique::from_raw_with(Box::into_raw(Box::new(3)), logging_deleter(&log)) };
    }
    assert_eq!(*log.borrow(), [3]);
}

#[test]
fn test_move_transfers_ownership() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let a = unsafe { Unique::from_raw_with(Box::into_raw(Box::new(1)), logging_deleter(&log)) };
    let b = a;
    assert_eq!(*b, 1);
    assert!(log.borrow().is_empty());
    drop(b);
    assert_eq!(*log.borrow(), [1]);
}

#[test]
fn test_self_move_assignment_is_noop() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut a = unsafe { Unique::from_raw_with(Box::into_raw(Box::new(5)), logging_deleter(&log)) };
    a = std::convert::identity(a);
    assert_eq!(*a, 5);
    assert!(log.borrow().is_empty());
    drop(a);
    assert_eq!(*log.borrow(), [5]);
}

#[test]
fn test_reset_then_reuse() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut a = unsafe { Unique::from_raw_with(Box::into_raw(Box::new(1)), logging_deleter(&log)) };
    a.reset();
    assert!(a.is_empty());
    unsafe { a.reset_to(Box::into_raw(Box::new(2))) };
    unsafe { a.reset_to(Box::into_raw(Box::new(3))) };
    drop(a);
    assert_eq!(*log.borrow(), [1, 2, 3]);
}

#[test]
fn test_reset_to_owned_pointer_keeps_resource() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut a = unsafe { Unique::from_raw_with(Box::into_raw(Box::new(5)), logging_deleter(&log)) };
    let owned = a.as_ptr().expect("resource");

    unsafe { a.reset_to(owned.as_ptr()) };
    assert!(log.borrow().is_empty());
    assert_eq!(*a, 5);

    drop(a);
    assert_eq!(*log.borrow(), [5]);
}

#[test]
fn test_swap_exchanges_resources() {
    let mut a = Unique::new(String::from("a"));
    let mut b = Unique::new(String::from("b"));
    a.swap(&mut b);
    assert_eq!(a.as_str(), "b");
    assert_eq!(b.as_str(), "a");
}

#[test]
fn test_slice_indexing() {
    let mut values: Unique<[u32]> = Unique::from(vec![10, 20, 30].into_boxed_slice());
    assert_eq!(values.len(), 3);
    assert_eq!(values[1], 20);
    values[2] += 1;
    assert_eq!(values[2], 31);
}

#[test]
fn test_trait_object() {
    let unique: Unique<dyn Fn(i32) -> i32> = Unique::from(Box::new(|x: i32| x * 2) as Box<dyn Fn(i32) -> i32>);
    assert_eq!((*unique)(21), 42);
}

#[test]
fn test_deleter_accessors() {
    let mut unique = unsafe { Unique::from_raw_with(Box::into_raw(Box::new(0_u8)), CountingFree(0)) };
    assert_eq!(unique.deleter().0, 0);
    unique.deleter_mut().0 = 10;
    unique.reset();
    assert_eq!(unique.deleter().0, 11);
}

struct CountingFree(u32);

impl custody::Deleter<u8> for CountingFree {
    unsafe fn delete(&mut self, ptr: NonNull<u8>) {
        self.0 += 1;
        drop(unsafe { Box::from_raw(ptr.as_ptr()) });
    }
}

#[test]
fn test_into_shared_empties_unique() {
    let unique = Unique::new(vec![1, 2]);
    let raw = unique.as_ptr();
    let shared = Shared::from(unique);
    assert_eq!(shared.use_count(), 1);
    assert_eq!(shared.as_ptr(), raw);
    assert_eq!(*shared, [1, 2]);
}

#[test]
fn test_into_raw_parts_roundtrip() {
    let unique = Unique::new(9_u16);
    let (ptr, deleter) = unique.into_raw_parts();
    let unique = unsafe { Unique::from_raw_parts(ptr, deleter) };
    assert_eq!(unique.into_box().as_deref(), Some(&9));
}
