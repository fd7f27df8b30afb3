//! Model-checked interleavings of the counting protocol.
//!
//! Run with `cargo xtask loom` (or `RUSTFLAGS="--cfg loom" cargo test --test loom_test --release`).

#![cfg(loom)]

use custody::Shared;
use loom::sync::atomic::{AtomicUsize, Ordering};
use loom::sync::Arc;
use loom::thread;
use std::ptr::NonNull;

fn counted(value: usize) -> (Shared<usize>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let shared = unsafe {
        Shared::from_raw_with(Box::into_raw(Box::new(value)), move |ptr: NonNull<usize>| {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(Box::from_raw(ptr.as_ptr()));
        })
    };
    (shared, calls)
}

#[test]
fn loom_concurrent_last_drop_releases_once() {
    loom::model(|| {
        let (a, calls) = counted(1);
        let b = a.clone();

        let t = thread::spawn(move || drop(b));
        drop(a);
        t.join().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    });
}

#[test]
fn loom_lock_never_revives() {
    loom::model(|| {
        let (shared, calls) = counted(7);
        let weak = shared.downgrade();

        let t = thread::spawn(move || {
            let locked = weak.lock();
            match locked.get() {
                Some(value) => {
                    assert_eq!(*value, 7);
                    assert_eq!(calls.load(Ordering::SeqCst), 0);
                }
                None => assert!(weak.expired()),
            }
            drop(locked);
            calls
        });

        drop(shared);
        let calls = t.join().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    });
}

#[test]
fn loom_weak_and_strong_drop_free_block_once() {
    loom::model(|| {
        let (shared, calls) = counted(3);
        let weak = shared.downgrade();

        let t = thread::spawn(move || drop(weak));
        drop(shared);
        t.join().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    });
}
