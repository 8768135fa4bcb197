//! Host-driven [`DeadlineScheduler`] backed by a virtual clock.
//!
//! Nothing fires on its own: the owner moves the clock forward with
//! [`ManualScheduler::advance`] / [`ManualScheduler::advance_to`] and every
//! deadline reached on the way runs, in order, on the caller's stack. This
//! suits main loops that already track time and deterministic tests.
use alloc::{collections::BTreeMap, rc::Rc};
use core::cell::RefCell;

use embassy_time::{Duration, Instant};

use crate::{core::FireHandler, scheduler::traits::deadline_scheduler::DeadlineScheduler};

/// Shortest delay a deadline is scheduled with.
///
/// A zero delay is clamped to one tick so that a zero-delay repeating timer
/// cannot keep `advance_to` busy forever.
const MIN_DELAY: Duration = Duration::from_ticks(1);

/// Handle to a deadline pending in a [`ManualScheduler`].
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ManualHandle(u64);

struct PendingDeadline {
    deadline: Instant,
    handler: FireHandler,
}

struct ManualClock {
    now: Instant,
    next_id: u64,
    pending: BTreeMap<u64, PendingDeadline>,
}

/// Virtual-clock scheduler. Clones share the same clock and queue.
#[derive(Clone)]
pub struct ManualScheduler {
    clock: Rc<RefCell<ManualClock>>,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    /// Scheduler whose clock starts at tick zero.
    pub fn new() -> Self {
        Self::starting_at(Instant::from_ticks(0))
    }

    /// Scheduler whose clock starts at `now`.
    pub fn starting_at(now: Instant) -> Self {
        Self {
            clock: Rc::new(RefCell::new(ManualClock {
                now,
                next_id: 0,
                pending: BTreeMap::new(),
            })),
        }
    }

    /// Number of deadlines waiting to fire.
    pub fn pending(&self) -> usize {
        self.clock.borrow().pending.len()
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.clock
            .borrow()
            .pending
            .values()
            .map(|pending| pending.deadline)
            .min()
    }

    /// Move the clock forward by `by`, saturating at [`Instant::MAX`]. See
    /// [`advance_to`](Self::advance_to), including its caveat on remote targets.
    pub fn advance(&self, by: Duration) -> usize {
        let target = {
            let clock = self.clock.borrow();
            clock.now.checked_add(by).unwrap_or(Instant::MAX)
        };
        self.advance_to(target)
    }

    /// Move the clock forward to `target`, running every deadline reached on
    /// the way. Returns how many handlers ran.
    ///
    /// Deadlines run in deadline order, ties in scheduling order, and the
    /// clock reads the deadline being served while its handler runs.
    /// Deadlines scheduled by a handler are served in the same call when they
    /// fall before `target`. A `target` in the past leaves the clock as is.
    ///
    /// A repeating timer re-arms from its own handler, so every one of its
    /// periods up to `target` runs in this call. Advancing to a remote target
    /// such as [`Instant::MAX`] with a repeating timer armed does not return
    /// in practice: step the clock in bounded increments instead.
    pub fn advance_to(&self, target: Instant) -> usize {
        let mut fired = 0;

        loop {
            let handler = {
                let mut clock = self.clock.borrow_mut();
                let due = clock
                    .pending
                    .iter()
                    .filter(|(_, pending)| pending.deadline <= target)
                    .min_by_key(|(id, pending)| (pending.deadline, **id))
                    .map(|(id, _)| *id);

                match due.and_then(|id| clock.pending.remove(&id)) {
                    Some(pending) => {
                        if pending.deadline > clock.now {
                            clock.now = pending.deadline;
                        }
                        pending.handler
                    }
                    None => {
                        if target > clock.now {
                            clock.now = target;
                        }
                        break;
                    }
                }
            };

            // The clock borrow is released: the handler may schedule, cancel
            // or reset deadlines on this scheduler.
            handler();
            fired += 1;
        }

        #[cfg(feature = "defmt")]
        defmt::trace!(
            "ManualScheduler advanced to {}ms, {} handler(s) ran",
            target.as_millis(),
            fired
        );

        fired
    }
}

impl DeadlineScheduler for ManualScheduler {
    type Handle = ManualHandle;

    fn now(&self) -> Instant {
        self.clock.borrow().now
    }

    fn schedule_once(&self, delay: Duration, handler: FireHandler) -> ManualHandle {
        let mut clock = self.clock.borrow_mut();
        let id = clock.next_id;
        clock.next_id += 1;

        let deadline = clock
            .now
            .checked_add(delay.max(MIN_DELAY))
            .unwrap_or(Instant::MAX);
        clock.pending.insert(id, PendingDeadline { deadline, handler });

        ManualHandle(id)
    }

    fn cancel(&self, handle: ManualHandle) {
        self.clock.borrow_mut().pending.remove(&handle.0);
    }

    fn reset_duration(&self, handle: &mut ManualHandle, delay: Duration) {
        let mut clock = self.clock.borrow_mut();
        let deadline = clock
            .now
            .checked_add(delay.max(MIN_DELAY))
            .unwrap_or(Instant::MAX);
        if let Some(pending) = clock.pending.get_mut(&handle.0) {
            pending.deadline = deadline;
        }
    }
}
