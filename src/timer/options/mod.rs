//! Timer configuration: the [`TimerOptions`] builder and its normalization
//! into a validated configuration.
//!
//! The legacy synonyms `after`, `every` and `at` are pure input sugar. They
//! are folded into the canonical `{delay, repeat}` pair before anything is
//! validated, so the state machine only ever sees one shape.
use embassy_time::{Duration, Instant};

use crate::{
    core::{TimerCallback, MAX_DELAY_MS},
    error::TimerError,
};

/// Millisecond count taken by the delay options.
///
/// Built from any primitive number, or from a [`Duration`] (kept to the
/// microsecond, then floored like any fractional delay).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Millis(f64);

macro_rules! millis_from_primitive {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Millis {
                fn from(millis: $ty) -> Self {
                    Self(millis as f64)
                }
            }
        )*
    };
}

millis_from_primitive!(f64, f32, u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl From<Duration> for Millis {
    fn from(duration: Duration) -> Self {
        Self(duration.as_micros() as f64 / 1_000.0)
    }
}

/// Options accepted by [`Timer::configure`](crate::timer::Timer::configure).
///
/// Delays are milliseconds. They may be fractional (floored) but must be
/// finite and not negative.
///
/// Precedence when several delay options are set: `delay`, then `after`,
/// then `every`, then `at`. The synonyms force the recurring flag; `repeat`
/// only applies to `delay`.
#[derive(Clone, Default)]
pub struct TimerOptions {
    delay: Option<f64>,
    after: Option<f64>,
    every: Option<f64>,
    at: Option<Instant>,
    callback: Option<TimerCallback>,
    repeat: Option<bool>,
    start_inactive: bool,
}

/// Validated configuration stored by a timer.
#[derive(Clone, Debug)]
pub(crate) struct TimerConfig {
    pub(crate) delay: Duration,
    pub(crate) repeat: bool,
    pub(crate) callback: TimerCallback,
}

/// Result of normalizing [`TimerOptions`].
#[derive(Debug)]
pub(crate) struct NormalizedOptions {
    pub(crate) config: TimerConfig,
    pub(crate) start_inactive: bool,
}

impl TimerOptions {
    /// Empty options; a delay and a callback must still be supplied.
    pub fn new() -> Self {
        Self::default()
    }

    /// Primary delay/interval in milliseconds.
    pub fn delay(mut self, millis: impl Into<Millis>) -> Self {
        self.delay = Some(millis.into().0);
        self
    }

    /// One-shot delay in milliseconds. Forces `repeat = false`.
    pub fn after(mut self, millis: impl Into<Millis>) -> Self {
        self.after = Some(millis.into().0);
        self
    }

    /// Recurring interval in milliseconds. Forces `repeat = true`.
    pub fn every(mut self, millis: impl Into<Millis>) -> Self {
        self.every = Some(millis.into().0);
        self
    }

    /// Fire once at `target`, or as soon as possible if it has passed.
    /// The delay is rounded up to whole milliseconds, never down.
    /// Forces `repeat = false`.
    pub fn at(mut self, target: Instant) -> Self {
        self.at = Some(target);
        self
    }

    /// Closure invoked on every firing.
    pub fn callback<F>(self, callback: F) -> Self
    where
        F: FnMut() + 'static,
    {
        self.shared_callback(TimerCallback::new(callback))
    }

    /// Already wrapped callback, possibly shared with other timers.
    ///
    /// A shared callback never runs twice at once. If another timer holding
    /// the same callback fires while it is running (its body drives the
    /// scheduler, say), that firing does not invoke it: the timer's state
    /// still advances but the callback call is skipped.
    pub fn shared_callback(mut self, callback: TimerCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Recurring flag applied to [`delay`](Self::delay). Defaults to `false`.
    pub fn repeat(mut self, repeat: bool) -> Self {
        self.repeat = Some(repeat);
        self
    }

    /// Configure without arming.
    pub fn start_inactive(mut self, start_inactive: bool) -> Self {
        self.start_inactive = start_inactive;
        self
    }

    /// Fold the synonyms into `{delay, repeat}` and validate.
    ///
    /// `now` is only read to convert an `at` target into a delay.
    pub(crate) fn normalize(self, now: Instant) -> Result<NormalizedOptions, TimerError> {
        let (raw_delay, repeat) = match (self.delay, self.after, self.every, self.at) {
            (Some(millis), ..) => (Some(millis), self.repeat.unwrap_or(false)),
            (None, Some(millis), ..) => (Some(millis), false),
            (None, None, Some(millis), _) => (Some(millis), true),
            (None, None, None, Some(target)) => (Some(millis_until(now, target)), false),
            (None, None, None, None) => (None, self.repeat.unwrap_or(false)),
        };

        let callback = self.callback.ok_or(TimerError::MissingCallback)?;
        let delay = validate_delay(raw_delay.ok_or(TimerError::InvalidDelay)?)?;

        Ok(NormalizedOptions {
            config: TimerConfig {
                delay,
                repeat,
                callback,
            },
            start_inactive: self.start_inactive,
        })
    }
}

impl core::fmt::Debug for TimerOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TimerOptions")
            .field("delay", &self.delay)
            .field("after", &self.after)
            .field("every", &self.every)
            .field("at", &self.at)
            .field("callback", &self.callback.is_some())
            .field("repeat", &self.repeat)
            .field("start_inactive", &self.start_inactive)
            .finish()
    }
}

/// Whole milliseconds from `now` to `target`, rounded up so the timer never
/// fires before `target`. Zero once `target` has passed, and capped at
/// [`MAX_DELAY_MS`] for targets near [`Instant::MAX`].
fn millis_until(now: Instant, target: Instant) -> f64 {
    let remaining = target.saturating_duration_since(now);
    let mut millis = remaining.as_millis();
    if Duration::from_millis(millis) < remaining {
        millis += 1;
    }
    millis.min(MAX_DELAY_MS) as f64
}

/// Floor a millisecond count and check it is a usable delay.
fn validate_delay(millis: f64) -> Result<Duration, TimerError> {
    // `-0.0 < 0.0` is false: negative zero floors to zero and is accepted.
    if !millis.is_finite() || millis < 0.0 || millis >= (MAX_DELAY_MS as f64) + 1.0 {
        return Err(TimerError::InvalidDelay);
    }

    // Truncation is flooring for non-negative values.
    let floored = (millis as u64).min(MAX_DELAY_MS);
    Ok(Duration::from_millis(floored))
}
