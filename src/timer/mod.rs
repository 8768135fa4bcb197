//! Single-shot and repeating deferred-callback timer.
//!
//! A [`Timer`] owns at most one deadline on a [`DeadlineScheduler`]. When the
//! deadline expires the timer updates its own state first (resolve the
//! pending [`Completion`], re-arm or disarm) and only then runs the
//! callback. Whatever the callback does to its own timer (cancel, refresh,
//! reconfigure) is therefore the final word.
//!
//! Timers are `!Send`: configuration, cancellation and firing all happen on
//! the thread that drives the scheduler.
use alloc::{
    boxed::Box,
    rc::{Rc, Weak},
};
use core::cell::RefCell;

use embassy_time::{Duration, Instant};

use crate::{
    core::TimerCallback,
    error::TimerError,
    scheduler::traits::deadline_scheduler::DeadlineScheduler,
};

pub mod completion;
pub mod options;

use completion::Completion;
use options::{TimerConfig, TimerOptions};

/// Mutable state of one timer.
struct TimerState<H> {
    /// Validated configuration; `None` until the first successful configure.
    config: Option<TimerConfig>,
    /// Live scheduler handle. Present iff the timer is active.
    handle: Option<H>,
    /// Instant of the most recent arm or re-arm.
    armed_at: Option<Instant>,
    /// Completion handed out by `when` for the next firing.
    completion: Option<Completion>,
    /// Bumped each time a new handle is requested, so that a handler from a
    /// superseded arm recognises itself.
    epoch: u64,
}

struct Shared<S: DeadlineScheduler> {
    scheduler: S,
    state: RefCell<TimerState<S::Handle>>,
}

/// Deferred callback that fires once or repeatedly after a delay.
///
/// Cloning yields another handle to the same timer. A callback that needs to
/// reach its own timer should capture a [`WeakTimer`]: capturing a `Timer`
/// creates a reference cycle and the timer is never freed.
///
/// ```rust,ignore
/// let scheduler = ManualScheduler::new();
/// let timer = Timer::new(scheduler.clone());
/// let this = timer.downgrade();
/// timer.configure(TimerOptions::new().every(100).callback(move || {
///     if let Some(timer) = this.upgrade() {
///         timer.cancel();
///     }
/// }))?;
/// scheduler.advance(Duration::from_millis(100));
/// assert!(!timer.is_active());
/// ```
pub struct Timer<S: DeadlineScheduler> {
    shared: Rc<Shared<S>>,
}

/// Non-owning handle to a [`Timer`].
pub struct WeakTimer<S: DeadlineScheduler> {
    shared: Weak<Shared<S>>,
}

impl<S> Timer<S>
where
    S: DeadlineScheduler + 'static,
{
    /// Unconfigured, inactive timer. Arms nothing until
    /// [`configure`](Self::configure) succeeds.
    pub fn new(scheduler: S) -> Self {
        Self {
            shared: Rc::new(Shared {
                scheduler,
                state: RefCell::new(TimerState {
                    config: None,
                    handle: None,
                    armed_at: None,
                    completion: None,
                    epoch: 0,
                }),
            }),
        }
    }

    /// Configured timer, armed immediately unless the options say
    /// `start_inactive`.
    pub fn with_options(scheduler: S, options: TimerOptions) -> Result<Self, TimerError> {
        let timer = Self::new(scheduler);
        timer.configure(options)?;
        Ok(timer)
    }

    /// Replace the whole configuration and arm, unless `start_inactive`.
    ///
    /// Options are validated before anything changes: on error the timer
    /// keeps its previous configuration and armed state. On success any
    /// current arm is cancelled first, exactly like [`cancel`](Self::cancel).
    pub fn configure(&self, options: TimerOptions) -> Result<&Self, TimerError> {
        let normalized = match options.normalize(self.shared.scheduler.now()) {
            Ok(normalized) => normalized,
            Err(err) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Timer configuration rejected: {}", err);
                return Err(err);
            }
        };

        self.cancel();
        self.shared.state.borrow_mut().config = Some(normalized.config);

        if !normalized.start_inactive {
            Shared::arm(&self.shared);
        }
        Ok(self)
    }

    /// Disarm. Idempotent.
    ///
    /// A completion handed out by [`when`](Self::when) is not resolved: it
    /// stays pending forever.
    pub fn cancel(&self) -> &Self {
        let handle = {
            let mut state = self.shared.state.borrow_mut();
            state.armed_at = None;
            state.completion = None;
            state.handle.take()
        };

        if let Some(handle) = handle {
            self.shared.scheduler.cancel(handle);
            #[cfg(feature = "defmt")]
            defmt::debug!("Timer cancelled");
        }
        self
    }

    /// Re-arm with the stored configuration: `due` becomes `now + delay`.
    ///
    /// Starts an inactive timer; on an active one the live deadline is reset
    /// in place. Behaves like `cancel` followed by an arm, so an outstanding
    /// completion is dropped unresolved. Does nothing on a timer that was
    /// never configured.
    pub fn refresh(&self) -> &Self {
        Shared::arm(&self.shared);
        self
    }

    /// Whether a deadline is pending.
    pub fn is_active(&self) -> bool {
        self.shared.state.borrow().handle.is_some()
    }

    /// Instant of the most recent arm, while active.
    pub fn started(&self) -> Option<Instant> {
        let state = self.shared.state.borrow();
        state.handle.as_ref().and(state.armed_at)
    }

    /// `started + delay`, while active.
    ///
    /// This is the requested deadline. A scheduler may serve it later than
    /// asked: [`ManualScheduler`](crate::ManualScheduler) runs a zero delay on
    /// the next tick, so a zero-delay timer fires one tick after `due`.
    pub fn due(&self) -> Option<Instant> {
        let started = self.started()?;
        started.checked_add(self.delay())
    }

    /// Time left until `due`, zero once overdue. `None` while inactive.
    pub fn remaining(&self) -> Option<Duration> {
        let due = self.due()?;
        Some(due.saturating_duration_since(self.shared.scheduler.now()))
    }

    /// Configured delay; zero before the first configuration.
    pub fn delay(&self) -> Duration {
        self.shared
            .state
            .borrow()
            .config
            .as_ref()
            .map_or(Duration::from_ticks(0), |config| config.delay)
    }

    /// Configured delay in whole milliseconds.
    pub fn delay_ms(&self) -> u64 {
        self.delay().as_millis()
    }

    /// Whether the timer re-arms itself after firing.
    pub fn repeat(&self) -> bool {
        self.shared
            .state
            .borrow()
            .config
            .as_ref()
            .is_some_and(|config| config.repeat)
    }

    /// Configured callback.
    pub fn callback(&self) -> Option<TimerCallback> {
        self.shared
            .state
            .borrow()
            .config
            .as_ref()
            .map(|config| config.callback.clone())
    }

    /// Future resolved by the next firing.
    ///
    /// Reads return the same [`Completion`] until the timer fires, and a new
    /// one afterwards. While inactive there is nothing to wait for: an
    /// already resolved completion is returned.
    pub fn when(&self) -> Completion {
        let mut state = self.shared.state.borrow_mut();
        if let Some(completion) = &state.completion {
            return completion.clone();
        }
        if state.handle.is_none() {
            return Completion::resolved();
        }

        let completion = Completion::pending();
        state.completion = Some(completion.clone());
        completion
    }

    /// Non-owning handle, for callbacks that act on their own timer.
    pub fn downgrade(&self) -> WeakTimer<S> {
        WeakTimer {
            shared: Rc::downgrade(&self.shared),
        }
    }
}

impl<S> Shared<S>
where
    S: DeadlineScheduler + 'static,
{
    /// Capture `armed_at` and make sure exactly one deadline is pending,
    /// `delay` from now.
    fn arm(shared: &Rc<Self>) {
        let mut guard = shared.state.borrow_mut();
        let state = &mut *guard;
        let Some(delay) = state.config.as_ref().map(|config| config.delay) else {
            #[cfg(feature = "defmt")]
            defmt::warn!("Refresh on an unconfigured timer ignored");
            return;
        };

        state.armed_at = Some(shared.scheduler.now());
        state.completion = None;

        match state.handle.as_mut() {
            Some(handle) => {
                shared.scheduler.reset_duration(handle, delay);
                #[cfg(feature = "defmt")]
                defmt::debug!("Timer reset in place: {}ms", delay.as_millis());
            }
            None => {
                state.epoch = state.epoch.wrapping_add(1);
                let epoch = state.epoch;
                let timer = Rc::downgrade(shared);
                let handle = shared.scheduler.schedule_once(
                    delay,
                    Box::new(move || {
                        if let Some(shared) = timer.upgrade() {
                            Shared::fire(&shared, epoch);
                        }
                    }),
                );
                state.handle = Some(handle);
                #[cfg(feature = "defmt")]
                defmt::debug!("Timer armed: {}ms", delay.as_millis());
            }
        }
    }

    /// Scheduler entry point. State is settled before the callback runs.
    fn fire(shared: &Rc<Self>, epoch: u64) {
        let completion = {
            let mut state = shared.state.borrow_mut();
            if state.epoch != epoch || state.handle.is_none() {
                // Superseded arm.
                return;
            }
            // The deadline that just expired is spent.
            state.handle = None;
            state.completion.take()
        };

        if let Some(completion) = completion {
            completion.resolve();
        }

        let Some((repeat, callback)) = shared
            .state
            .borrow()
            .config
            .as_ref()
            .map(|config| (config.repeat, config.callback.clone()))
        else {
            return;
        };

        if repeat {
            Shared::arm(shared);
        } else {
            shared.state.borrow_mut().armed_at = None;
        }

        #[cfg(feature = "defmt")]
        defmt::trace!("Timer fired, repeat: {}", repeat);

        callback.call();
    }
}

impl<S: DeadlineScheduler> Clone for Timer<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<S> core::fmt::Debug for Timer<S>
where
    S: DeadlineScheduler + 'static,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Timer")
            .field("delay_ms", &self.delay_ms())
            .field("repeat", &self.repeat())
            .field("active", &self.is_active())
            .finish()
    }
}

impl<S: DeadlineScheduler> WeakTimer<S> {
    /// The timer, if it is still alive.
    pub fn upgrade(&self) -> Option<Timer<S>> {
        self.shared.upgrade().map(|shared| Timer { shared })
    }
}

impl<S: DeadlineScheduler> Clone for WeakTimer<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}
