//! One-time broadcast future behind [`Timer::when`](crate::timer::Timer::when).
//!
//! A [`Completion`] is resolved at most once and never reset. Clones are the
//! same completion: every clone observes the single resolution, and
//! [`Completion::ptr_eq`] tells whether two values are the same instance.
use alloc::{rc::Rc, vec::Vec};
use core::{
    cell::RefCell,
    future::Future,
    pin::Pin,
    task::{Context, Poll, Waker},
};

use futures_util::future::FusedFuture;

struct CompletionState {
    resolved: bool,
    /// One entry per distinct waiting task.
    wakers: Vec<Waker>,
}

/// Awaitable resolved by the next firing of a timer.
#[derive(Clone)]
pub struct Completion {
    state: Rc<RefCell<CompletionState>>,
}

impl Completion {
    pub(crate) fn pending() -> Self {
        Self {
            state: Rc::new(RefCell::new(CompletionState {
                resolved: false,
                wakers: Vec::new(),
            })),
        }
    }

    pub(crate) fn resolved() -> Self {
        let completion = Self::pending();
        completion.state.borrow_mut().resolved = true;
        completion
    }

    /// Mark the completion resolved and wake every waiter.
    pub(crate) fn resolve(&self) {
        let wakers = {
            let mut state = self.state.borrow_mut();
            if state.resolved {
                return;
            }
            state.resolved = true;
            core::mem::take(&mut state.wakers)
        };
        // Woken outside the borrow: a waker may poll inline.
        for waker in wakers {
            waker.wake();
        }
    }

    /// Whether the completion has been resolved.
    pub fn is_resolved(&self) -> bool {
        self.state.borrow().resolved
    }

    /// Whether both values are the same completion instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl Future for Completion {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.state.borrow_mut();
        if state.resolved {
            return Poll::Ready(());
        }
        let waker = cx.waker();
        if !state.wakers.iter().any(|known| known.will_wake(waker)) {
            state.wakers.push(waker.clone());
        }
        Poll::Pending
    }
}

impl FusedFuture for Completion {
    fn is_terminated(&self) -> bool {
        self.is_resolved()
    }
}

impl core::fmt::Debug for Completion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Completion")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

#[cfg(test)]
mod tests;
