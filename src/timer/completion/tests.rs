//! Unit tests for the completion broadcast.
use super::*;
use alloc::{sync::Arc, task::Wake, vec::Vec};
use core::{
    pin::pin,
    sync::atomic::{AtomicUsize, Ordering},
    task::Waker,
};
use futures_util::FutureExt;

/// Waker counting how many times it was woken.
struct CountingWaker(AtomicUsize);

impl Wake for CountingWaker {
    fn wake(self: Arc<Self>) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn counting_waker() -> (Arc<CountingWaker>, Waker) {
    let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));
    let waker = Waker::from(Arc::clone(&counter));
    (counter, waker)
}

#[test]
/// A pending completion stays pending until resolved.
fn test_pending_until_resolved() {
    let completion = Completion::pending();
    assert!(!completion.is_resolved());
    assert!(!completion.is_terminated());
    assert_eq!(completion.clone().now_or_never(), None);

    completion.resolve();
    assert!(completion.is_resolved());
    assert!(completion.is_terminated());
    assert_eq!(completion.clone().now_or_never(), Some(()));
}

#[test]
/// A resolved completion is immediately ready.
fn test_resolved_is_ready() {
    let completion = Completion::resolved();
    assert_eq!(completion.now_or_never(), Some(()));
}

#[test]
/// Clones share identity and resolution; separate completions do not.
fn test_clone_shares_identity() {
    let completion = Completion::pending();
    let observer = completion.clone();
    let other = Completion::pending();

    assert!(completion.ptr_eq(&observer));
    assert!(!completion.ptr_eq(&other));

    completion.resolve();
    assert!(observer.is_resolved());
    assert!(!other.is_resolved());
}

#[test]
/// Resolution wakes every registered waiter exactly once.
fn test_resolve_wakes_all_waiters() {
    let completion = Completion::pending();
    let waiters: Vec<_> = (0..3).map(|_| counting_waker()).collect();

    for (_, waker) in &waiters {
        let mut future = pin!(completion.clone());
        let mut cx = Context::from_waker(waker);
        assert_eq!(future.as_mut().poll(&mut cx), Poll::Pending);
    }

    completion.resolve();
    completion.resolve();

    for (counter, _) in &waiters {
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}

#[test]
/// Any number of waiters stay parked until resolution, then wake once each.
fn test_many_waiters_are_not_woken_early() {
    let completion = Completion::pending();
    let waiters: Vec<_> = (0..16).map(|_| counting_waker()).collect();

    for (_, waker) in &waiters {
        let mut future = pin!(completion.clone());
        let mut cx = Context::from_waker(waker);
        assert_eq!(future.as_mut().poll(&mut cx), Poll::Pending);
    }

    let woken_early: usize = waiters
        .iter()
        .map(|(counter, _)| counter.0.load(Ordering::SeqCst))
        .sum();
    assert_eq!(woken_early, 0);

    completion.resolve();
    for (counter, _) in &waiters {
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}

#[test]
/// Re-polling with the same waker registers it only once.
fn test_repoll_does_not_duplicate_waker() {
    let completion = Completion::pending();
    let (counter, waker) = counting_waker();
    let mut cx = Context::from_waker(&waker);

    let mut future = pin!(completion.clone());
    for _ in 0..5 {
        assert_eq!(future.as_mut().poll(&mut cx), Poll::Pending);
    }
    assert_eq!(completion.state.borrow().wakers.len(), 1);

    completion.resolve();
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    assert!(completion.state.borrow().wakers.is_empty());
}
