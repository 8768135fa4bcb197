//! Data types shared by the timer state machine and the scheduler backends.
//!
//! The timer stores its callback as a [`TimerCallback`] and hands the
//! scheduler a [`FireHandler`]; [`MAX_DELAY_MS`] bounds what a configuration
//! may request.
use alloc::{boxed::Box, rc::Rc};
use core::cell::RefCell;

use embassy_time::TICK_HZ;

/// Largest accepted delay in milliseconds.
///
/// `embassy_time::Duration::from_millis` multiplies by the tick rate, so the
/// bound keeps that product inside a `u64` whatever `tick-hz-*` feature the
/// final binary selects.
pub const MAX_DELAY_MS: u64 = u64::MAX / TICK_HZ;

/// One-shot handler given to a [`DeadlineScheduler`](crate::scheduler::traits::deadline_scheduler::DeadlineScheduler).
/// Invoked at most once, when the deadline expires.
pub type FireHandler = Box<dyn FnOnce()>;

/// Unit of work invoked each time a timer fires.
///
/// Cloning shares the same closure, so the callback read back from a timer
/// can be compared with the configured one using [`TimerCallback::ptr_eq`].
#[derive(Clone)]
pub struct TimerCallback(Rc<RefCell<dyn FnMut()>>);

impl TimerCallback {
    /// Wrap a closure.
    pub fn new<F>(callback: F) -> Self
    where
        F: FnMut() + 'static,
    {
        Self(Rc::new(RefCell::new(callback)))
    }

    /// Run the closure.
    ///
    /// A callback that is already running is not re-entered: the nested call
    /// returns without invoking it and reports `false`.
    pub fn call(&self) -> bool {
        match self.0.try_borrow_mut() {
            Ok(mut callback) => {
                (&mut *callback)();
                true
            }
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Timer callback is already running, nested call skipped");
                false
            }
        }
    }

    /// Whether both values wrap the same closure.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl core::fmt::Debug for TimerCallback {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("TimerCallback")
    }
}
